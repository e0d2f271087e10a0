// src/handlers/health.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub database: bool,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Serviço e banco no ar", body = HealthStatus),
        (status = 503, description = "Banco indisponível", body = HealthStatus)
    )
)]
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&app_state.db_pool)
        .await
        .is_ok();

    if database {
        (StatusCode::OK, Json(HealthStatus { status: "ok".into(), database }))
    } else {
        tracing::warn!("⚠️ Health check: banco de dados indisponível");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthStatus { status: "degraded".into(), database }),
        )
    }
}
