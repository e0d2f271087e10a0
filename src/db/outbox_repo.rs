// src/db/outbox_repo.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notification::{NewOutboxMessage, OutboxMessage},
};

#[derive(Clone)]
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava na mesma transação do pedido.
    pub async fn enqueue<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        message: &NewOutboxMessage,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO notification_outbox (order_id, kind, recipient_phone, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
            .bind(order_id)
            .bind(message.kind)
            .bind(&message.recipient_phone)
            .bind(&message.message)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Reserva um lote de mensagens vencidas num único comando: empurra o
    /// `next_attempt_at` para frente pelo tempo da reserva, então outras instâncias
    /// do worker não pegam as mesmas linhas. Se o worker cair no meio do envio,
    /// a mensagem volta a vencer quando a reserva expira.
    pub async fn claim_due(&self, limit: i64, lease: Duration) -> Result<Vec<OutboxMessage>, AppError> {
        let messages = sqlx::query_as::<_, OutboxMessage>(
            r#"
            UPDATE notification_outbox
            SET next_attempt_at = NOW() + make_interval(secs => $2)
            WHERE id IN (
                SELECT id FROM notification_outbox
                WHERE status = 'PENDING' AND next_attempt_at <= NOW()
                ORDER BY next_attempt_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
            .bind(limit)
            .bind(lease.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    pub async fn mark_sent(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'SENT', attempts = attempts + 1, sent_at = NOW(), last_error = NULL
            WHERE id = $1
            "#,
        )
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_retry(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET attempts = attempts + 1, last_error = $2, next_attempt_at = $3
            WHERE id = $1
            "#,
        )
            .bind(id)
            .bind(error)
            .bind(next_attempt_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE notification_outbox
            SET status = 'FAILED', attempts = attempts + 1, last_error = $2
            WHERE id = $1
            "#,
        )
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
