// src/db/loyalty_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::loyalty::{LoyaltyConfig, LoyaltyTransaction, Reward, TransactionType},
};

#[derive(Clone)]
pub struct LoyaltyRepository {
    pool: PgPool,
}

impl LoyaltyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sem linha de configuração, usa os valores padrão.
    pub async fn get_config<'e, E>(&self, executor: E) -> Result<LoyaltyConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, LoyaltyConfig>(
            r#"
            SELECT min_spent_silver, min_spent_gold, points_per_amount,
                   bronze_multiplier, silver_multiplier, gold_multiplier,
                   voucher_validity_days
            FROM loyalty_config
            WHERE id = 1
            "#,
        )
            .fetch_optional(executor)
            .await?;

        Ok(config.unwrap_or_default())
    }

    pub async fn append_transaction<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        transaction_type: TransactionType,
        amount: i64,
        description: &str,
        order_id: Option<Uuid>,
    ) -> Result<LoyaltyTransaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, LoyaltyTransaction>(
            r#"
            INSERT INTO loyalty_transactions (customer_id, type, amount, description, order_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(customer_id)
            .bind(transaction_type)
            .bind(amount)
            .bind(description)
            .bind(order_id)
            .fetch_one(executor)
            .await?;
        Ok(entry)
    }

    /// Recalcula o saldo em cache a partir do livro-razão e devolve o novo valor.
    pub async fn sync_cached_balance<'e, E>(&self, executor: E, customer_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let points: i64 = sqlx::query_scalar(
            r#"
            UPDATE customers
            SET points = (
                SELECT COALESCE(SUM(amount), 0)::BIGINT
                FROM loyalty_transactions
                WHERE customer_id = $1
            ),
            updated_at = NOW()
            WHERE id = $1
            RETURNING points
            "#,
        )
            .bind(customer_id)
            .fetch_one(executor)
            .await?;
        Ok(points)
    }

    pub async fn has_earned_for_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loyalty_transactions WHERE order_id = $1 AND type = 'EARNED')",
        )
            .bind(order_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn list_transactions(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LoyaltyTransaction>, AppError> {
        let entries = sqlx::query_as::<_, LoyaltyTransaction>(
            r#"
            SELECT * FROM loyalty_transactions
            WHERE customer_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
            .bind(customer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn list_active_rewards(&self) -> Result<Vec<Reward>, AppError> {
        let rewards = sqlx::query_as::<_, Reward>(
            "SELECT * FROM rewards WHERE is_active = TRUE ORDER BY points_cost ASC",
        )
            .fetch_all(&self.pool)
            .await?;
        Ok(rewards)
    }

    pub async fn find_active_reward<'e, E>(&self, executor: E, reward_id: Uuid) -> Result<Option<Reward>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reward = sqlx::query_as::<_, Reward>(
            "SELECT * FROM rewards WHERE id = $1 AND is_active = TRUE",
        )
            .bind(reward_id)
            .fetch_optional(executor)
            .await?;
        Ok(reward)
    }

    /// Corrige todo saldo em cache que divergiu do livro-razão. Retorna quantos foram ajustados.
    pub async fn reconcile_all_balances(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE customers c
            SET points = l.balance, updated_at = NOW()
            FROM (
                SELECT cu.id, COALESCE(SUM(lt.amount), 0)::BIGINT AS balance
                FROM customers cu
                LEFT JOIN loyalty_transactions lt ON lt.customer_id = cu.id
                GROUP BY cu.id
            ) l
            WHERE c.id = l.id AND c.points <> l.balance
            "#,
        )
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
