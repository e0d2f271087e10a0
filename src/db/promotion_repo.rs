// src/db/promotion_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::promotion::{Coupon, Voucher, VoucherType},
};

/// Códigos de voucher e cupom são gravados em maiúsculas.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Clone)]
pub struct PromotionRepository {
    pool: PgPool,
}

impl PromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // --- Vouchers ---

    /// Busca com `FOR UPDATE`: dois checkouts com o mesmo voucher serializam aqui.
    pub async fn find_voucher_by_code<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<Voucher>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let voucher = sqlx::query_as::<_, Voucher>(
            "SELECT * FROM vouchers WHERE code = $1 FOR UPDATE",
        )
            .bind(normalize_code(code))
            .fetch_optional(executor)
            .await?;
        Ok(voucher)
    }

    /// Consumo condicional. `false` = outro pedido usou o voucher antes.
    pub async fn mark_voucher_used<'e, E>(&self, executor: E, voucher_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE vouchers
            SET is_used = TRUE, used_at = NOW()
            WHERE id = $1 AND is_used = FALSE
            "#,
        )
            .bind(voucher_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn create_voucher<'e, E>(
        &self,
        executor: E,
        code: &str,
        voucher_type: VoucherType,
        value: Decimal,
        customer_id: Uuid,
        reward_id: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Voucher, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let voucher = sqlx::query_as::<_, Voucher>(
            r#"
            INSERT INTO vouchers (code, type, value, customer_id, reward_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(code)
            .bind(voucher_type)
            .bind(value)
            .bind(customer_id)
            .bind(reward_id)
            .bind(expires_at)
            .fetch_one(executor)
            .await?;
        Ok(voucher)
    }

    /// Vouchers ainda utilizáveis do cliente.
    pub async fn list_vouchers_for_customer(&self, customer_id: Uuid) -> Result<Vec<Voucher>, AppError> {
        let vouchers = sqlx::query_as::<_, Voucher>(
            r#"
            SELECT * FROM vouchers
            WHERE customer_id = $1
              AND is_used = FALSE
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY created_at DESC
            "#,
        )
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(vouchers)
    }

    // --- Cupons ---

    pub async fn find_coupon_by_code<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<Coupon>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let coupon = sqlx::query_as::<_, Coupon>(
            "SELECT * FROM coupons WHERE code = $1 FOR UPDATE",
        )
            .bind(normalize_code(code))
            .fetch_optional(executor)
            .await?;
        Ok(coupon)
    }

    /// Incremento condicional ao limite de uso.
    pub async fn increment_coupon_usage<'e, E>(&self, executor: E, coupon_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET usage_count = usage_count + 1
            WHERE id = $1
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
            .bind(coupon_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
