// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{admin::AdminAccess, auth::AuthenticatedCustomer, i18n::Locale},
    models::order::{CartLine, Order, OrderDetail, OrderFilter, OrderStatus, OrderSummary},
    services::order_service::CheckoutRequest,
};

pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("Nilai tidak boleh negatif.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: checkout
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<CartLine>,

    #[validate(length(min = 1, message = "Label alamat wajib diisi."))]
    #[schema(example = "Rumah")]
    pub address_label: String,

    #[validate(length(min = 1, message = "Nama penerima wajib diisi."))]
    pub address_name: String,

    #[validate(length(min = 8, message = "Nomor telepon tidak valid."))]
    #[schema(example = "081234567890")]
    pub address_phone: String,

    #[validate(length(min = 5, message = "Alamat wajib diisi."))]
    pub address_full: String,

    #[validate(length(min = 1, message = "Metode pembayaran wajib diisi."))]
    #[schema(example = "COD")]
    pub payment_method: String,

    pub shipping_method: Option<String>,
    pub notes: Option<String>,
    pub voucher_code: Option<String>,
    #[schema(example = "HEMAT20")]
    pub coupon_code: Option<String>,

    // Valores informados pelo cliente (vindos da estimativa de frete)
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub shipping_fee: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub service_fee: Decimal,
}

impl From<CreateOrderPayload> for CheckoutRequest {
    fn from(p: CreateOrderPayload) -> Self {
        CheckoutRequest {
            items: p.items,
            address_label: p.address_label,
            address_name: p.address_name,
            address_phone: p.address_phone,
            address_full: p.address_full,
            payment_method: p.payment_method,
            shipping_method: p.shipping_method,
            notes: p.notes,
            voucher_code: p.voucher_code,
            coupon_code: p.coupon_code,
            shipping_fee: p.shipping_fee,
            service_fee: p.service_fee,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrderRef {
    pub id: Uuid,
    pub order_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub message: String,
    pub order: CreatedOrderRef,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pesanan dibuat", body = CreateOrderResponse),
        (status = 400, description = "Keranjang kosong, stok tidak cukup, voucher/kupon tidak valid"),
        (status = 401, description = "Belum login"),
        (status = 500, description = "Gagal membuat pesanan")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = CheckoutRequest::from(payload);

    let order = app_state
        .order_service
        .create_order(customer.id, &request)
        .await
        .map_err(|e| e.to_api_error_or(&locale, &app_state.i18n_store, "orders.create_failed"))?;

    let response = CreateOrderResponse {
        message: app_state.i18n_store.translate(&locale.0, "orders.created", &[]),
        order: CreatedOrderRef {
            id: order.id,
            order_number: order.order_number,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    /// `all`, `processing`, `delivered`, `cancelled`, ...
    pub status: Option<String>,
}

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Pesanan saya", body = Vec<OrderSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = OrderFilter::parse(query.status.as_deref());

    let orders = app_state
        .order_service
        .list_orders(customer.id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(orders))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    tag = "Orders",
    params(("order_id" = Uuid, Path, description = "ID pesanan")),
    responses(
        (status = 200, description = "Detail pesanan", body = OrderDetail),
        (status = 404, description = "Pesanan tidak ditemukan")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedCustomer(customer): AuthenticatedCustomer,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .order_service
        .get_order(customer.id, order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// ---
// Admin: transição de status
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusPayload {
    #[validate(length(min = 1, message = "Status wajib diisi."))]
    #[schema(example = "CONFIRMED")]
    pub status: String,
}

// POST /api/admin/orders/{id}/status
#[utoipa::path(
    post,
    path = "/api/admin/orders/{order_id}/status",
    tag = "Admin",
    request_body = UpdateOrderStatusPayload,
    params(
        ("order_id" = Uuid, Path, description = "ID pesanan"),
        ("x-admin-key" = String, Header, description = "Chave administrativa")
    ),
    responses(
        (status = 200, description = "Status atualizado", body = Order),
        (status = 400, description = "Transição inválida"),
        (status = 403, description = "Chave administrativa inválida")
    )
)]
pub async fn update_order_status(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminAccess,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let next = OrderStatus::parse(payload.status.trim()).ok_or_else(|| {
        let mut errors = validator::ValidationErrors::new();
        let mut err = ValidationError::new("status");
        err.message = Some("Status tidak dikenal.".into());
        errors.add("status", err);
        AppError::ValidationError(errors).to_api_error(&locale, &app_state.i18n_store)
    })?;

    let order = app_state
        .order_service
        .transition_order(order_id, next)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}
