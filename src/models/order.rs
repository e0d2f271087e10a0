// src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Shipping,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const PROCESSING: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "CONFIRMED" => Some(OrderStatus::Confirmed),
            "PREPARING" => Some(OrderStatus::Preparing),
            "SHIPPING" => Some(OrderStatus::Shipping),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::Shipping => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Avança só para frente na cadeia; qualquer estado não terminal pode ser cancelado.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == OrderStatus::Cancelled {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_source", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSource {
    Online,
    Pos,
}

// --- Structs persistidas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "ORD-20261015-7F3A9C")]
    pub order_number: String,
    pub customer_id: Option<Uuid>,

    // Snapshot do destinatário, independente de edições futuras do endereço
    pub address_label: String,
    pub address_name: String,
    pub address_phone: String,
    pub address_full: String,

    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub service_fee: Decimal,
    pub voucher_discount: Decimal,
    pub coupon_discount: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,

    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_method: Option<String>,
    pub source: OrderSource,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub variant: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub original_price: Decimal,
    pub cost_price: Decimal,
    pub line_total: Decimal,
    pub is_promo: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub items: Vec<OrderItem>,
}

/// Linha resumida para a listagem "Pesanan Saya".
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    #[schema(example = "15 Okt 2026, 14:30")]
    pub date: String,
    #[schema(example = "pending")]
    pub status: String,
    pub thumbnails: Vec<String>,
    pub total: Decimal,
}

// --- Entrada do checkout ---

/// Item do carrinho como o cliente envia. Nome e preço são apenas eco: o servidor recalcula.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[schema(example = "500g")]
    #[serde(default)]
    pub variant: Option<String>,
    #[validate(range(min = 1, message = "Jumlah minimal 1."))]
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct OrderLimits {
    pub max_lines: usize,
    pub max_quantity_per_line: i32,
    pub min_subtotal: Decimal,
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self {
            max_lines: 50,
            max_quantity_per_line: 100,
            min_subtotal: Decimal::ZERO,
        }
    }
}

/// Filtro da listagem de pedidos (`?status=`).
#[derive(Debug, Clone, PartialEq)]
pub enum OrderFilter {
    All,
    Processing,
    Exact(OrderStatus),
}

impl OrderFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("all") => OrderFilter::All,
            Some("processing") => OrderFilter::Processing,
            Some(other) => OrderStatus::parse(other)
                .map(OrderFilter::Exact)
                .unwrap_or(OrderFilter::All),
        }
    }

    pub fn statuses(&self) -> Vec<OrderStatus> {
        match self {
            OrderFilter::All => vec![],
            OrderFilter::Processing => OrderStatus::PROCESSING.to_vec(),
            OrderFilter::Exact(status) => vec![*status],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_only() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipping.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn cancel_is_allowed_until_terminal() {
        assert!(OrderStatus::Shipping.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(OrderFilter::parse(None), OrderFilter::All);
        assert_eq!(OrderFilter::parse(Some("processing")).statuses().len(), 4);
        assert_eq!(
            OrderFilter::parse(Some("delivered")),
            OrderFilter::Exact(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderFilter::parse(Some("CANCELLED")),
            OrderFilter::Exact(OrderStatus::Cancelled)
        );
    }
}
