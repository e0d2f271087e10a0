// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Finite,      // Estoque contado, decrementado a cada pedido
    AlwaysReady, // Produzido sob demanda, nunca falta
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Dada Ayam Fillet")]
    pub name: String,
    #[schema(example = "500g")]
    pub unit: String,
    #[schema(example = "50000")]
    pub price: Decimal,
    pub cost_price: Decimal,
    #[schema(example = 12)]
    pub stock: i32,
    pub stock_status: StockStatus,
    pub image_url: Option<String>,

    // Promoção (resolvida no servidor pela janela de datas)
    pub original_price: Option<Decimal>,
    pub promo_price: Option<Decimal>,
    pub promo_starts_at: Option<DateTime<Utc>>,
    pub promo_ends_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A promoção vale quando há preço promocional e `now` está dentro da janela (limites abertos se ausentes).
    pub fn active_promo_price(&self, now: DateTime<Utc>) -> Option<Decimal> {
        let promo = self.promo_price?;
        let started = self.promo_starts_at.is_none_or(|start| start <= now);
        let not_ended = self.promo_ends_at.is_none_or(|end| now <= end);
        (started && not_ended).then_some(promo)
    }

    pub fn tracks_stock(&self) -> bool {
        self.stock_status == StockStatus::Finite
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "1kg")]
    pub unit: String,
    #[schema(example = "95000")]
    pub price: Decimal,
    pub cost_price: Decimal,
    pub is_default: bool,
}
