// src/handlers/loyalty.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedCustomer, i18n::Locale},
    models::loyalty::{LoyaltyConfig, LoyaltyProfile, RedeemResult, Reward},
};

// GET /api/loyalty/rewards
#[utoipa::path(
    get,
    path = "/api/loyalty/rewards",
    tag = "Loyalty",
    responses(
        (status = 200, description = "Hadiah yang bisa ditukar", body = Vec<Reward>)
    )
)]
pub async fn list_rewards(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let rewards = app_state
        .loyalty_service
        .rewards()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(rewards))
}

// GET /api/loyalty/config
#[utoipa::path(
    get,
    path = "/api/loyalty/config",
    tag = "Loyalty",
    responses(
        (status = 200, description = "Aturan poin dan level", body = LoyaltyConfig)
    )
)]
pub async fn get_config(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let config = app_state
        .loyalty_service
        .config()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(config))
}

// GET /api/loyalty/profile
#[utoipa::path(
    get,
    path = "/api/loyalty/profile",
    tag = "Loyalty",
    responses(
        (status = 200, description = "Poin, level, riwayat dan voucher aktif", body = LoyaltyProfile)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state
        .loyalty_service
        .profile(customer.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(profile))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPayload {
    pub reward_id: Uuid,
}

// POST /api/loyalty/redeem
#[utoipa::path(
    post,
    path = "/api/loyalty/redeem",
    tag = "Loyalty",
    request_body = RedeemPayload,
    responses(
        (status = 200, description = "Voucher baru", body = RedeemResult),
        (status = 400, description = "Poin tidak mencukupi"),
        (status = 404, description = "Hadiah tidak ditemukan")
    ),
    security(("api_jwt" = []))
)]
pub async fn redeem(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Json(payload): Json<RedeemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let (voucher, points) = app_state
        .loyalty_service
        .redeem(customer.id, payload.reward_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(RedeemResult {
        message: app_state.i18n_store.translate(&locale.0, "loyalty.redeemed", &[]),
        voucher,
        points,
    }))
}
