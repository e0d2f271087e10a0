// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        AddressRepository, CartRepository, CatalogRepository, CustomerRepository, LoyaltyRepository,
        OrderRepository, OutboxRepository, PromotionRepository, SettingsRepository,
    },
    models::order::OrderLimits,
    services::{
        address_service::AddressService,
        auth::AuthService,
        loyalty_service::LoyaltyService,
        notification_service::{HttpWhatsAppGateway, NotificationService},
        order_service::OrderService,
        shipping_service::{NominatimGeocoder, ShippingService},
    },
};

/// Configuração de processo, lida do ambiente (.env).
/// Regras de negócio (faixas de frete, fidelidade, templates) ficam no banco.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub admin_api_key: String,
    pub geocoder_base_url: String,
    pub geocoder_user_agent: String,
    pub whatsapp_gateway_url: String,
    pub whatsapp_gateway_token: Option<String>,
    pub order_limits: OrderLimits,
    pub notify_poll_interval: Duration,
    pub notify_max_attempts: i32,
    pub notify_backoff: Duration,
    pub loyalty_reconcile_interval: Duration,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} deve ser definida", key))
}

fn or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Valor inválido para {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

// Intervalos de tarefas periódicas: zero faria o `tokio::time::interval` entrar em pânico.
fn interval_secs(key: &str, default: u64) -> anyhow::Result<Duration> {
    let secs: u64 = or_default(key, default)?;
    at_least_one_second(key, secs)
}

fn at_least_one_second(key: &str, secs: u64) -> anyhow::Result<Duration> {
    if secs < 1 {
        anyhow::bail!("{} deve ser pelo menos 1 segundo", key);
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: or_default("DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            jwt_secret: required("JWT_SECRET")?,
            admin_api_key: required("ADMIN_API_KEY")?,
            geocoder_base_url: or_default(
                "GEOCODER_BASE_URL",
                "https://nominatim.openstreetmap.org".to_string(),
            )?,
            geocoder_user_agent: or_default("GEOCODER_USER_AGENT", "protein-store/0.1".to_string())?,
            whatsapp_gateway_url: or_default(
                "WHATSAPP_GATEWAY_URL",
                "https://api.fonnte.com/send".to_string(),
            )?,
            whatsapp_gateway_token: env::var("WHATSAPP_GATEWAY_TOKEN").ok(),
            order_limits: OrderLimits {
                max_lines: or_default("ORDER_MAX_LINES", 50)?,
                max_quantity_per_line: or_default("ORDER_MAX_QTY_PER_LINE", 100)?,
                min_subtotal: or_default("ORDER_MIN_SUBTOTAL", Decimal::ZERO)?,
            },
            notify_poll_interval: interval_secs("NOTIFY_POLL_INTERVAL_SECS", 15)?,
            notify_max_attempts: or_default("NOTIFY_MAX_ATTEMPTS", 5)?,
            notify_backoff: Duration::from_secs(or_default("NOTIFY_BACKOFF_SECS", 30)?),
            loyalty_reconcile_interval: interval_secs("LOYALTY_RECONCILE_INTERVAL_SECS", 3600)?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub order_service: OrderService,
    pub shipping_service: ShippingService,
    pub loyalty_service: LoyaltyService,
    pub notification_service: NotificationService,
    pub cart_repo: CartRepository,
    pub address_service: AddressService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("falha ao construir o cliente HTTP")?;

        // --- Monta o gráfico de dependências ---
        let catalog_repo = CatalogRepository::new();
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let promotion_repo = PromotionRepository::new(db_pool.clone());
        let loyalty_repo = LoyaltyRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let outbox_repo = OutboxRepository::new(db_pool.clone());
        let cart_repo = CartRepository::new(db_pool.clone());
        let address_repo = AddressRepository::new(db_pool.clone());

        let address_service = AddressService::new(db_pool.clone(), address_repo);

        let auth_service = AuthService::new(customer_repo.clone(), config.jwt_secret.clone());

        let geocoder = NominatimGeocoder::new(
            http_client.clone(),
            config.geocoder_base_url.clone(),
            config.geocoder_user_agent.clone(),
        );
        let shipping_service = ShippingService::new(settings_repo.clone(), Arc::new(geocoder));

        let gateway = HttpWhatsAppGateway::new(
            http_client,
            config.whatsapp_gateway_url.clone(),
            config.whatsapp_gateway_token.clone(),
        );
        let notification_service = NotificationService::new(
            settings_repo.clone(),
            outbox_repo,
            Arc::new(gateway),
            config.notify_max_attempts,
            config.notify_backoff,
        );

        let loyalty_service = LoyaltyService::new(
            db_pool.clone(),
            loyalty_repo,
            customer_repo.clone(),
            promotion_repo.clone(),
        );

        let order_service = OrderService::new(
            db_pool.clone(),
            catalog_repo,
            order_repo,
            promotion_repo,
            cart_repo.clone(),
            notification_service.clone(),
            loyalty_service.clone(),
            config.order_limits.clone(),
        );

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store: I18nStore::embedded(),
            auth_service,
            order_service,
            shipping_service,
            loyalty_service,
            notification_service,
            cart_repo,
            address_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_second_interval_is_rejected() {
        let err = at_least_one_second("LOYALTY_RECONCILE_INTERVAL_SECS", 0).unwrap_err();
        assert!(err.to_string().contains("LOYALTY_RECONCILE_INTERVAL_SECS"));
    }

    #[test]
    fn positive_interval_is_accepted() {
        assert_eq!(
            at_least_one_second("NOTIFY_POLL_INTERVAL_SECS", 15).unwrap(),
            Duration::from_secs(15)
        );
    }
}
