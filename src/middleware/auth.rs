// src/middleware/auth.rs

use axum::{extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::customer::Customer,
};

// Extrator do cliente autenticado (JWT no cabeçalho Authorization: Bearer)
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer(pub Customer);

impl FromRequestParts<AppState> for AuthenticatedCustomer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let locale = parts.extract::<Locale>().await.unwrap_or_default();

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                crate::common::error::AppError::InvalidToken.to_api_error(&locale, &state.i18n_store)
            })?;

        let customer = state
            .auth_service
            .validate_token(bearer.token())
            .await
            .map_err(|e| e.to_api_error(&locale, &state.i18n_store))?;

        Ok(AuthenticatedCustomer(customer))
    }
}
