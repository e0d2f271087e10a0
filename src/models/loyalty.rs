// src/models/loyalty.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::promotion::{Voucher, VoucherType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "loyalty_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "loyalty_transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Earned,
    Spent,
    Adjusted,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    #[schema(example = "1000000")]
    pub min_spent_silver: Decimal,
    #[schema(example = "5000000")]
    pub min_spent_gold: Decimal,
    #[schema(example = "10000")]
    pub points_per_amount: Decimal,
    pub bronze_multiplier: Decimal,
    pub silver_multiplier: Decimal,
    pub gold_multiplier: Decimal,
    pub voucher_validity_days: i32,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            min_spent_silver: Decimal::from(1_000_000),
            min_spent_gold: Decimal::from(5_000_000),
            points_per_amount: Decimal::from(10_000),
            bronze_multiplier: Decimal::ONE,
            silver_multiplier: Decimal::new(15, 1),
            gold_multiplier: Decimal::from(2),
            voucher_validity_days: 30,
        }
    }
}

impl LoyaltyConfig {
    pub fn multiplier_for(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::Bronze => self.bronze_multiplier,
            Tier::Silver => self.silver_multiplier,
            Tier::Gold => self.gold_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTransaction {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    // Positivo = crédito, negativo = débito
    pub amount: i64,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    #[schema(example = "Voucher Ongkir 15rb")]
    pub name: String,
    pub description: Option<String>,
    pub points_cost: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub reward_type: VoucherType,
    pub value: Decimal,
    pub product_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProfile {
    pub points: i64,
    pub tier: Tier,
    pub total_spent: Decimal,
    pub transactions: Vec<LoyaltyTransaction>,
    pub vouchers: Vec<Voucher>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResult {
    pub message: String,
    pub voucher: Voucher,
    pub points: i64,
}
