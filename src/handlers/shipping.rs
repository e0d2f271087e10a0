// src/handlers/shipping.rs

use axum::{extract::State, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        i18n::I18nStore,
    },
    config::AppState,
    handlers::orders::validate_not_negative,
    middleware::i18n::Locale,
    models::shipping::{GeoPoint, ShippingQuote, ShippingQuoteResponse},
};

pub fn quote_response(quote: ShippingQuote, locale: &Locale, i18n: &I18nStore) -> ShippingQuoteResponse {
    match quote {
        ShippingQuote::Deliverable {
            fee,
            distance_km,
            is_free_shipping,
        } => ShippingQuoteResponse::Deliverable {
            shipping_fee: fee,
            distance_km,
            is_free_shipping,
        },
        ShippingQuote::OutOfRange {
            distance_km,
            max_radius_km,
        } => ShippingQuoteResponse::OutOfRange {
            is_out_of_range: true,
            message: i18n.translate(
                &locale.0,
                "shipping.out_of_range",
                &[
                    ("distance", &distance_km.to_string()),
                    ("max", &max_radius_km.to_string()),
                ],
            ),
            distance_km,
        },
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GeocodePayload {
    #[validate(length(min = 5, message = "Alamat terlalu pendek."))]
    #[schema(example = "Jl. Jend. Sudirman No. 1, Jakarta")]
    pub address: String,
}

// POST /api/shipping/geocode
#[utoipa::path(
    post,
    path = "/api/shipping/geocode",
    tag = "Shipping",
    request_body = GeocodePayload,
    responses(
        (status = 200, description = "Koordinat alamat", body = GeoPoint),
        (status = 400, description = "Alamat tidak ditemukan")
    )
)]
pub async fn geocode(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<GeocodePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let point = app_state
        .shipping_service
        .geocode(&payload.address)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(point))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CalculateShippingPayload {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude tidak valid."))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude tidak valid."))]
    pub longitude: f64,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub subtotal: Decimal,
}

// POST /api/shipping/calculate
#[utoipa::path(
    post,
    path = "/api/shipping/calculate",
    tag = "Shipping",
    request_body = CalculateShippingPayload,
    responses(
        (status = 200, description = "Ongkir atau di luar jangkauan", body = ShippingQuoteResponse)
    )
)]
pub async fn calculate(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CalculateShippingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let destination = GeoPoint {
        latitude: payload.latitude,
        longitude: payload.longitude,
    };

    let quote = app_state
        .shipping_service
        .calculate(destination, payload.subtotal)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(quote_response(quote, &locale, &app_state.i18n_store)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EstimateShippingPayload {
    #[validate(length(min = 5, message = "Alamat terlalu pendek."))]
    pub address: String,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub subtotal: Decimal,
}

// POST /api/shipping/estimate
#[utoipa::path(
    post,
    path = "/api/shipping/estimate",
    tag = "Shipping",
    request_body = EstimateShippingPayload,
    responses(
        (status = 200, description = "Geocoding + ongkir", body = ShippingQuoteResponse),
        (status = 400, description = "Alamat tidak ditemukan")
    )
)]
pub async fn estimate(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<EstimateShippingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let quote = app_state
        .shipping_service
        .estimate(&payload.address, payload.subtotal)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(quote_response(quote, &locale, &app_state.i18n_store)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_response_has_no_fee() {
        let i18n = I18nStore::embedded();
        let response = quote_response(
            ShippingQuote::OutOfRange { distance_km: 40.0, max_radius_km: 15.0 },
            &Locale::default(),
            &i18n,
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["isOutOfRange"], true);
        assert_eq!(json["distance_km"], 40.0);
        assert!(json.get("shippingFee").is_none());
        assert_eq!(
            json["message"],
            "Alamat berjarak 40 km, kami hanya mengirim hingga 15 km."
        );
    }

    #[test]
    fn deliverable_response_shape() {
        let i18n = I18nStore::embedded();
        let response = quote_response(
            ShippingQuote::Deliverable {
                fee: Decimal::from(10_000),
                distance_km: 5.2,
                is_free_shipping: false,
            },
            &Locale::default(),
            &i18n,
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["shippingFee"], 10000.0);
        assert_eq!(json["distance_km"], 5.2);
        assert_eq!(json["isFreeShipping"], false);
        assert!(json.get("isOutOfRange").is_none());
    }

    #[test]
    fn coordinates_out_of_bounds_are_rejected() {
        let payload = CalculateShippingPayload {
            latitude: 95.0,
            longitude: 106.8,
            subtotal: Decimal::ZERO,
        };
        assert!(payload.validate().is_err());
    }
}
