// src/db/address_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Address, CreateAddressPayload},
};

#[derive(Clone)]
pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<Address>, AppError> {
        let addresses = sqlx::query_as::<_, Address>(
            r#"
            SELECT * FROM addresses
            WHERE customer_id = $1
            ORDER BY is_default DESC, created_at DESC
            "#,
        )
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(addresses)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE id = $1 AND customer_id = $2",
        )
            .bind(address_id)
            .bind(customer_id)
            .fetch_optional(executor)
            .await?;
        Ok(address)
    }

    pub async fn count<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        payload: &CreateAddressPayload,
        is_default: bool,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (
                customer_id, label, recipient_name, recipient_phone, full_address,
                latitude, longitude, type, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
            .bind(customer_id)
            .bind(payload.label.trim())
            .bind(payload.recipient_name.trim())
            .bind(payload.recipient_phone.trim())
            .bind(payload.full_address.trim())
            .bind(payload.latitude)
            .bind(payload.longitude)
            .bind(payload.address_type)
            .bind(is_default)
            .fetch_one(executor)
            .await?;
        Ok(address)
    }

    /// Precisa rodar antes de marcar outro endereço como padrão (índice único parcial).
    pub async fn clear_default<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE customer_id = $1 AND is_default")
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_default<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses SET is_default = TRUE
            WHERE id = $1 AND customer_id = $2
            RETURNING *
            "#,
        )
            .bind(address_id)
            .bind(customer_id)
            .fetch_optional(executor)
            .await?;
        Ok(address)
    }

    pub async fn delete<'e, E>(&self, executor: E, customer_id: Uuid, address_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
            .bind(address_id)
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
