// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Erros de domínio. A mensagem do `#[error]` é só para log;
// o texto que vai para o cliente sai do catálogo de idiomas.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    // --- Pedido ---
    #[error("Carrinho vazio")]
    EmptyCart,

    #[error("Pedido com mais de {max} linhas")]
    TooManyLines { max: usize },

    #[error("Quantidade fora do limite (máx {max})")]
    InvalidQuantity { max: i32 },

    #[error("Subtotal abaixo do mínimo {min}")]
    BelowMinimumSubtotal { min: Decimal },

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(String),

    #[error("Estoque insuficiente: {0}")]
    InsufficientStock(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    // --- Voucher / Cupom ---
    #[error("Voucher inválido")]
    InvalidVoucher,

    #[error("Voucher já utilizado")]
    VoucherAlreadyUsed,

    #[error("Voucher expirado")]
    VoucherExpired,

    #[error("Cupom inválido")]
    InvalidCoupon,

    #[error("Cupom exige compra mínima de {min}")]
    CouponMinPurchase { min: Decimal },

    #[error("Cupom esgotado")]
    CouponExhausted,

    // --- Frete ---
    #[error("Endereço não encontrado")]
    AddressNotFound,

    // --- Fidelidade ---
    #[error("Pontos insuficientes")]
    InsufficientPoints,

    #[error("Recompensa não encontrada")]
    RewardNotFound,

    // Infraestrutura: viram 500 e só aparecem no log.
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro HTTP externo: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

/// O erro "pronto para o cliente": status + mensagem já traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::EmptyCart
            | AppError::TooManyLines { .. }
            | AppError::InvalidQuantity { .. }
            | AppError::BelowMinimumSubtotal { .. }
            | AppError::ProductNotFound(_)
            | AppError::InsufficientStock(_)
            | AppError::InvalidStatusTransition { .. }
            | AppError::InvalidVoucher
            | AppError::VoucherAlreadyUsed
            | AppError::VoucherExpired
            | AppError::InvalidCoupon
            | AppError::CouponMinPurchase { .. }
            | AppError::CouponExhausted
            | AppError::AddressNotFound
            | AppError::InsufficientPoints => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound(_) | AppError::RewardNotFound => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::HttpClientError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte o erro de domínio na resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        let message = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                                .into()
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                return ApiError {
                    status,
                    error: i18n.translate(lang, "errors.validation", &[]),
                    details: Some(Value::Object(details)),
                };
            }
            AppError::InvalidToken => i18n.translate(lang, "errors.invalid_token", &[]),
            AppError::Forbidden => i18n.translate(lang, "errors.forbidden", &[]),
            AppError::ResourceNotFound(resource) => {
                i18n.translate(lang, "errors.not_found", &[("resource", resource)])
            }
            AppError::EmptyCart => i18n.translate(lang, "orders.cart_empty", &[]),
            AppError::TooManyLines { max } => {
                i18n.translate(lang, "orders.too_many_lines", &[("max", &max.to_string())])
            }
            AppError::InvalidQuantity { max } => {
                i18n.translate(lang, "orders.invalid_quantity", &[("max", &max.to_string())])
            }
            AppError::BelowMinimumSubtotal { min } => {
                i18n.translate(lang, "orders.min_subtotal", &[("min", &min.normalize().to_string())])
            }
            AppError::ProductNotFound(product) => {
                i18n.translate(lang, "orders.product_not_found", &[("product", product)])
            }
            AppError::InsufficientStock(product) => {
                i18n.translate(lang, "orders.insufficient_stock", &[("product", product)])
            }
            AppError::InvalidStatusTransition { from, to } => i18n.translate(
                lang,
                "orders.invalid_status_transition",
                &[("from", from), ("to", to)],
            ),
            AppError::InvalidVoucher => i18n.translate(lang, "vouchers.invalid", &[]),
            AppError::VoucherAlreadyUsed => i18n.translate(lang, "vouchers.used", &[]),
            AppError::VoucherExpired => i18n.translate(lang, "vouchers.expired", &[]),
            AppError::InvalidCoupon => i18n.translate(lang, "coupons.invalid", &[]),
            AppError::CouponMinPurchase { min } => {
                i18n.translate(lang, "coupons.min_purchase", &[("min", &min.normalize().to_string())])
            }
            AppError::CouponExhausted => i18n.translate(lang, "coupons.exhausted", &[]),
            AppError::AddressNotFound => i18n.translate(lang, "shipping.address_not_found", &[]),
            AppError::InsufficientPoints => i18n.translate(lang, "loyalty.insufficient_points", &[]),
            AppError::RewardNotFound => i18n.translate(lang, "loyalty.reward_not_found", &[]),

            // Nada de detalhes internos para o cliente: o log fica com tudo.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                i18n.translate(lang, "errors.internal", &[])
            }
        };

        ApiError::new(status, message)
    }

    /// Igual a `to_api_error`, mas troca a mensagem genérica de 500 por uma específica da operação.
    pub fn to_api_error_or(&self, locale: &Locale, i18n: &I18nStore, internal_key: &str) -> ApiError {
        let mut api_error = self.to_api_error(locale, i18n);
        if api_error.status == StatusCode::INTERNAL_SERVER_ERROR {
            api_error.error = i18n.translate(&locale.0, internal_key, &[]);
        }
        api_error
    }
}

// Usado pelos extratores, que não têm acesso ao idioma nem ao catálogo.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let i18n = I18nStore::embedded();
        self.to_api_error(&Locale::default(), &i18n).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        assert_eq!(AppError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientStock("Dada Ayam".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::VoucherAlreadyUsed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::RewardNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_details() {
        let i18n = I18nStore::embedded();
        let err = AppError::InternalServerError(anyhow::anyhow!("connection reset by peer"));
        let api = err.to_api_error(&Locale("id".into()), &i18n);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("connection reset"));
    }

    #[test]
    fn order_failures_use_operation_message() {
        let i18n = I18nStore::embedded();
        let err = AppError::InternalServerError(anyhow::anyhow!("deadlock"));
        let api = err.to_api_error_or(&Locale("id".into()), &i18n, "orders.create_failed");

        assert_eq!(api.error, "Gagal membuat pesanan.");
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let i18n = I18nStore::embedded();
        let api = AppError::InsufficientStock("Dada Ayam Fillet".into())
            .to_api_error(&Locale("id".into()), &i18n);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.error.contains("Dada Ayam Fillet"));
    }
}
