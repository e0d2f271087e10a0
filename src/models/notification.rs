// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Admin,
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "outbox_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationSettings {
    pub admin_enabled: bool,
    pub customer_enabled: bool,
    pub admin_phones: Vec<String>,
    pub admin_template: Option<String>,
    pub customer_template: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            admin_enabled: false,
            customer_enabled: false,
            admin_phones: vec![],
            admin_template: None,
            customer_template: None,
        }
    }
}

/// Mensagem já renderizada, pronta para entrar no outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxMessage {
    pub kind: NotificationKind,
    pub recipient_phone: String,
    pub message: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: NotificationKind,
    pub recipient_phone: String,
    pub message: String,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}
