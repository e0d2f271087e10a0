// src/models/shipping.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = -6.200000)]
    pub latitude: f64,
    #[schema(example = 106.816666)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeBand {
    #[schema(example = 5.0)]
    pub up_to_km: f64,
    #[schema(example = "10000")]
    pub fee: Decimal,
}

/// Configuração de frete guardada em `store_settings.shipping_config` (JSONB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingConfig {
    #[schema(example = 15.0)]
    pub max_radius_km: f64,
    pub fee_bands: Vec<FeeBand>,
    #[serde(default)]
    pub free_shipping_min_subtotal: Option<Decimal>,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            max_radius_km: 15.0,
            fee_bands: vec![
                FeeBand { up_to_km: 3.0, fee: Decimal::from(5_000) },
                FeeBand { up_to_km: 7.0, fee: Decimal::from(10_000) },
                FeeBand { up_to_km: 15.0, fee: Decimal::from(15_000) },
            ],
            free_shipping_min_subtotal: Some(Decimal::from(300_000)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub origin: GeoPoint,
    pub shipping: ShippingConfig,
}

/// Resultado do cálculo de frete, antes de virar resposta HTTP.
#[derive(Debug, Clone, PartialEq)]
pub enum ShippingQuote {
    Deliverable {
        fee: Decimal,
        distance_km: f64,
        is_free_shipping: bool,
    },
    OutOfRange {
        distance_km: f64,
        max_radius_km: f64,
    },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ShippingQuoteResponse {
    Deliverable {
        #[serde(rename = "shippingFee")]
        shipping_fee: Decimal,
        distance_km: f64,
        #[serde(rename = "isFreeShipping")]
        is_free_shipping: bool,
    },
    OutOfRange {
        #[serde(rename = "isOutOfRange")]
        is_out_of_range: bool,
        message: String,
        distance_km: f64,
    },
}
