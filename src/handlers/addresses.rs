// src/handlers/addresses.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedCustomer, i18n::Locale},
    models::customer::{Address, CreateAddressPayload},
};

// GET /api/addresses
#[utoipa::path(
    get,
    path = "/api/addresses",
    tag = "Addresses",
    responses(
        (status = 200, description = "Alamat tersimpan, default lebih dulu", body = Vec<Address>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_addresses(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = app_state
        .address_service
        .list(customer.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(addresses))
}

// POST /api/addresses
#[utoipa::path(
    post,
    path = "/api/addresses",
    tag = "Addresses",
    request_body = CreateAddressPayload,
    responses(
        (status = 201, description = "Alamat dibuat", body = Address)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_address(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Json(payload): Json<CreateAddressPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let address = app_state
        .address_service
        .create(customer.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(address)))
}

// POST /api/addresses/{id}/default
#[utoipa::path(
    post,
    path = "/api/addresses/{address_id}/default",
    tag = "Addresses",
    params(("address_id" = Uuid, Path, description = "ID alamat")),
    responses(
        (status = 200, description = "Alamat menjadi default", body = Address),
        (status = 404, description = "Alamat tidak ditemukan")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_default_address(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let address = app_state
        .address_service
        .set_default(customer.id, address_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(address))
}

// DELETE /api/addresses/{id}
#[utoipa::path(
    delete,
    path = "/api/addresses/{address_id}",
    tag = "Addresses",
    params(("address_id" = Uuid, Path, description = "ID alamat")),
    responses(
        (status = 204, description = "Alamat dihapus"),
        (status = 404, description = "Alamat tidak ditemukan")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_address(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .address_service
        .delete(customer.id, address_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
