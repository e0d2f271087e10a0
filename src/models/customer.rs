// src/models/customer.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{loyalty::Tier, order::CartLine};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    // Saldo em cache; a fonte da verdade é o livro-razão (loyalty_transactions)
    pub points: i64,
    pub tier: Tier,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "address_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    Home,
    Office,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[schema(example = "Rumah")]
    pub label: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub full_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressPayload {
    #[validate(length(min = 1, message = "Label wajib diisi."))]
    pub label: String,
    #[validate(length(min = 1, message = "Nama penerima wajib diisi."))]
    pub recipient_name: String,
    #[validate(length(min = 8, message = "Nomor telepon tidak valid."))]
    pub recipient_phone: String,
    #[validate(length(min = 5, message = "Alamat wajib diisi."))]
    pub full_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "type", default = "default_address_type")]
    pub address_type: AddressType,
    #[serde(default)]
    pub is_default: bool,
}

fn default_address_type() -> AddressType {
    AddressType::Home
}

/// Carrinho persistido do cliente (uma linha por cliente).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub updated_at: Option<DateTime<Utc>>,
}
