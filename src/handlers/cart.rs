// src/handlers/cart.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedCustomer, i18n::Locale},
    models::{customer::Cart, order::CartLine},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaveCartPayload {
    #[validate(nested, length(max = 100, message = "Keranjang terlalu besar."))]
    pub items: Vec<CartLine>,
}

// GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    responses(
        (status = 200, description = "Keranjang tersimpan (kosong bila belum ada)", body = Cart)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
) -> Result<impl IntoResponse, ApiError> {
    let cart = app_state
        .cart_repo
        .get(customer.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(cart))
}

// PUT /api/cart
#[utoipa::path(
    put,
    path = "/api/cart",
    tag = "Cart",
    request_body = SaveCartPayload,
    responses(
        (status = 200, description = "Keranjang disimpan", body = Cart)
    ),
    security(("api_jwt" = []))
)]
pub async fn save_cart(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Json(payload): Json<SaveCartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let cart = app_state
        .cart_repo
        .upsert(customer.id, &payload.items)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(cart))
}
