// src/middleware/admin.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Acesso do painel administrativo: chave compartilhada no cabeçalho `x-admin-key`.
#[derive(Debug, Clone)]
pub struct AdminAccess;

// Comparação em tempo constante para chaves do mesmo tamanho
pub fn key_matches(expected: &str, provided: Option<&str>) -> bool {
    let Some(key) = provided else {
        return false;
    };
    if expected.is_empty() || key.len() != expected.len() {
        return false;
    }
    key.bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if key_matches(&state.config.admin_api_key, provided) {
            return Ok(AdminAccess);
        }

        let locale = parts
            .headers
            .get(axum::http::header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        tracing::warn!("🚫 Chamada administrativa recusada (x-admin-key ausente ou inválida)");
        Err(AppError::Forbidden.to_api_error(&locale, &state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_is_accepted() {
        assert!(key_matches("rahasia", Some("rahasia")));
    }

    #[test]
    fn wrong_or_missing_key_is_rejected() {
        assert!(!key_matches("rahasia", Some("rahasib")));
        assert!(!key_matches("rahasia", Some("rahasia2")));
        assert!(!key_matches("rahasia", None));
        assert!(!key_matches("", Some("")));
    }
}
