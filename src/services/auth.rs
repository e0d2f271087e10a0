// src/services/auth.rs
//
// A emissão de tokens fica no serviço de login; aqui só validamos o JWT
// e carregamos o cliente correspondente.

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    db::CustomerRepository,
    models::{auth::Claims, customer::Customer},
};

pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

#[derive(Clone)]
pub struct AuthService {
    customer_repo: CustomerRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(customer_repo: CustomerRepository, jwt_secret: String) -> Self {
        Self { customer_repo, jwt_secret }
    }

    /// Token válido mas de cliente inexistente também é `InvalidToken`.
    pub async fn validate_token(&self, token: &str) -> Result<Customer, AppError> {
        let claims = decode_claims(&self.jwt_secret, token)?;

        self.customer_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }
}
