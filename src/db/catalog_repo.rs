// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Product, ProductVariant},
};

/// Sem pool próprio: o catálogo só é lido e alterado dentro das transações de pedido.
#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_products_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn find_variants_by_product_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<ProductVariant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, unit, price, cost_price, is_default
            FROM product_variants
            WHERE product_id = ANY($1)
            ORDER BY is_default DESC, unit ASC
            "#,
        )
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(variants)
    }

    /// Baixa condicional (compare-and-swap). Retorna `false` quando o saldo não cobre a quantidade,
    /// inclusive se outro checkout concorrente consumiu o estoque entre a leitura e a escrita.
    pub async fn decrement_stock<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            "#,
        )
            .bind(product_id)
            .bind(quantity)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn restock<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock_status = 'FINITE'
            "#,
        )
            .bind(product_id)
            .bind(quantity)
            .execute(executor)
            .await?;

        Ok(())
    }
}
