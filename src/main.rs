//src/main.rs

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let poll_interval = config.notify_poll_interval;
    let reconcile_interval = config.loyalty_reconcile_interval;

    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Workers em segundo plano: entrega de notificações e reconciliação de pontos
    tokio::spawn(app_state.notification_service.clone().run_worker(poll_interval));
    tokio::spawn(app_state.loyalty_service.clone().run_reconciliation(reconcile_interval));

    let order_routes = Router::new()
        .route("/", post(handlers::orders::create_order).get(handlers::orders::list_orders))
        .route("/{order_id}", get(handlers::orders::get_order));

    let admin_routes = Router::new()
        .route("/orders/{order_id}/status", post(handlers::orders::update_order_status));

    let shipping_routes = Router::new()
        .route("/geocode", post(handlers::shipping::geocode))
        .route("/calculate", post(handlers::shipping::calculate))
        .route("/estimate", post(handlers::shipping::estimate));

    let loyalty_routes = Router::new()
        .route("/rewards", get(handlers::loyalty::list_rewards))
        .route("/config", get(handlers::loyalty::get_config))
        .route("/profile", get(handlers::loyalty::get_profile))
        .route("/redeem", post(handlers::loyalty::redeem));

    let address_routes = Router::new()
        .route(
            "/",
            get(handlers::addresses::list_addresses).post(handlers::addresses::create_address),
        )
        .route("/{address_id}", delete(handlers::addresses::delete_address))
        .route("/{address_id}/default", post(handlers::addresses::set_default_address));

    let app = Router::new()
        .route("/api/health", get(handlers::health::health))
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/api/cart",
            get(handlers::cart::get_cart).put(handlers::cart::save_cart),
        )
        .nest("/api/orders", order_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/shipping", shipping_routes)
        .nest("/api/loyalty", loyalty_routes)
        .nest("/api/addresses", address_routes)
        .with_state(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
