// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload do JWT emitido pelo serviço de login (externo).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // ID do cliente
    pub exp: usize, // Expiração
    pub iat: usize, // Emissão
}
