// src/db/settings_repo.rs

use sqlx::{types::Json, FromRow, PgPool};

use crate::{
    common::error::AppError,
    models::{
        notification::NotificationSettings,
        shipping::{GeoPoint, ShippingConfig, StoreSettings},
    },
};

#[derive(Debug, FromRow)]
struct StoreSettingsRow {
    store_latitude: f64,
    store_longitude: f64,
    shipping_config: Json<ShippingConfig>,
}

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `None` quando a loja ainda não cadastrou a origem do frete.
    pub async fn get_store_settings(&self) -> Result<Option<StoreSettings>, AppError> {
        let row = sqlx::query_as::<_, StoreSettingsRow>(
            "SELECT store_latitude, store_longitude, shipping_config FROM store_settings WHERE id = 1",
        )
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| StoreSettings {
            origin: GeoPoint {
                latitude: r.store_latitude,
                longitude: r.store_longitude,
            },
            shipping: r.shipping_config.0,
        }))
    }

    /// Se não existir linha, tudo desligado.
    pub async fn get_notification_settings(&self) -> Result<NotificationSettings, AppError> {
        let settings = sqlx::query_as::<_, NotificationSettings>(
            r#"
            SELECT admin_enabled, customer_enabled, admin_phones, admin_template, customer_template
            FROM notification_settings
            WHERE id = 1
            "#,
        )
            .fetch_optional(&self.pool)
            .await?;

        Ok(settings.unwrap_or_default())
    }
}
