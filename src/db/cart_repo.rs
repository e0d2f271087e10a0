// src/db/cart_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{customer::Cart, order::CartLine},
};

#[derive(Debug, FromRow)]
struct CartRow {
    items: Json<Vec<CartLine>>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Cart {
            items: row.items.0,
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cliente sem carrinho salvo recebe um carrinho vazio.
    pub async fn get(&self, customer_id: Uuid) -> Result<Cart, AppError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT items, updated_at FROM carts WHERE customer_id = $1",
        )
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Cart::from).unwrap_or(Cart {
            items: vec![],
            updated_at: None,
        }))
    }

    // UPSERT: o carrinho inteiro é substituído
    pub async fn upsert(&self, customer_id: Uuid, items: &[CartLine]) -> Result<Cart, AppError> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            INSERT INTO carts (customer_id, items)
            VALUES ($1, $2)
            ON CONFLICT (customer_id)
            DO UPDATE SET items = EXCLUDED.items, updated_at = NOW()
            RETURNING items, updated_at
            "#,
        )
            .bind(customer_id)
            .bind(Json(items))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    pub async fn delete<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM carts WHERE customer_id = $1")
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
