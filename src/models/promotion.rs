// src/models/promotion.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "voucher_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherType {
    Product,
    Shipping,
    Discount,
}

/// Voucher de uso único, sempre ligado a um cliente (normalmente gerado por troca de pontos).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: Uuid,
    #[schema(example = "RWD-5KQ2X9AB")]
    pub code: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub voucher_type: VoucherType,
    pub value: Decimal,
    pub is_used: bool,
    pub customer_id: Uuid,
    pub reward_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "coupon_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponType {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    #[schema(example = "HEMAT20")]
    pub code: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_purchase: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| start <= now) && self.ends_at.is_none_or(|end| now <= end)
    }

    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.is_none_or(|limit| self.usage_count < limit)
    }
}
