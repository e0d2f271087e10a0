// src/services/notification_service.rs
//
// Notificações de pedido por WhatsApp via outbox: as mensagens são gravadas na
// transação do pedido e um worker em segundo plano faz a entrega com retentativas.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use tokio::sync::Notify;

use crate::{
    common::error::AppError,
    db::{OutboxRepository, SettingsRepository},
    models::{
        notification::{NewOutboxMessage, NotificationKind, NotificationSettings, OutboxMessage},
        order::{Order, OrderItem},
    },
};

const WORKER_BATCH_SIZE: i64 = 20;
// Tempo que um lote fica reservado para este worker
const CLAIM_LEASE: Duration = Duration::from_secs(300);

pub const DEFAULT_ADMIN_TEMPLATE: &str = "🛒 *Pesanan Baru* {{OrderNumber}}\n\
Pelanggan: {{CustomerName}}\n\n\
{{Items}}\n\n\
Subtotal: {{Subtotal}}\n\
Ongkir: {{Ongkir}}\n\
Diskon: {{Diskon}}\n\
*Total: {{Total}}*\n\n\
Pembayaran: {{PaymentMethod}}\n\
Pengiriman: {{ShippingMethod}}";

pub const DEFAULT_CUSTOMER_TEMPLATE: &str = "Halo {{CustomerName}}, terima kasih! 🙏\n\
Pesanan *{{OrderNumber}}* sudah kami terima.\n\n\
{{Items}}\n\n\
Subtotal: {{Subtotal}}\n\
Ongkir: {{Ongkir}}\n\
Diskon: {{Diskon}}\n\
*Total: {{Total}}*\n\n\
Metode pembayaran: {{PaymentMethod}}";

// --- Formatação ---

/// Normaliza para o formato `62…` do gateway. `None` quando não sobra número utilizável.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 8 {
        return None;
    }
    let normalized = if let Some(rest) = digits.strip_prefix('0') {
        format!("62{}", rest)
    } else if digits.starts_with('8') {
        format!("62{}", digits)
    } else {
        digits
    };
    Some(normalized)
}

/// `Rp116.000`: sem casas decimais, milhar com ponto.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round();
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-Rp{}", grouped)
    } else {
        format!("Rp{}", grouped)
    }
}

fn format_items(items: &[OrderItem]) -> String {
    items
        .iter()
        .map(|item| {
            let variant = item
                .variant
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!(" ({})", v))
                .unwrap_or_default();
            format!(
                "- {}{} x{} = {}",
                item.product_name,
                variant,
                item.quantity,
                format_rupiah(item.line_total)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitui os marcadores `{{Nome}}` com os dados do pedido.
pub fn render_template(template: &str, order: &Order, items: &[OrderItem]) -> String {
    let replacements = [
        ("{{OrderNumber}}", order.order_number.clone()),
        ("{{CustomerName}}", order.address_name.clone()),
        ("{{Items}}", format_items(items)),
        ("{{Total}}", format_rupiah(order.grand_total)),
        ("{{Subtotal}}", format_rupiah(order.subtotal)),
        ("{{Ongkir}}", format_rupiah(order.shipping_fee)),
        ("{{Diskon}}", format_rupiah(order.discount)),
        ("{{PaymentMethod}}", order.payment_method.clone()),
        (
            "{{ShippingMethod}}",
            order.shipping_method.clone().unwrap_or_else(|| "-".to_string()),
        ),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |acc, (token, value)| acc.replace(token, value))
}

/// Mensagens a enfileirar para um pedido, conforme as configurações da loja.
pub fn build_messages(
    settings: &NotificationSettings,
    order: &Order,
    items: &[OrderItem],
) -> Vec<NewOutboxMessage> {
    let mut messages = Vec::new();

    if settings.admin_enabled {
        let template = settings
            .admin_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_ADMIN_TEMPLATE);
        let text = render_template(template, order, items);

        let mut seen = Vec::new();
        for phone in settings.admin_phones.iter().filter_map(|p| normalize_phone(p)) {
            if seen.contains(&phone) {
                continue;
            }
            seen.push(phone.clone());
            messages.push(NewOutboxMessage {
                kind: NotificationKind::Admin,
                recipient_phone: phone,
                message: text.clone(),
            });
        }
    }

    if settings.customer_enabled {
        if let Some(phone) = normalize_phone(&order.address_phone) {
            let template = settings
                .customer_template
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_CUSTOMER_TEMPLATE);
            messages.push(NewOutboxMessage {
                kind: NotificationKind::Customer,
                recipient_phone: phone,
                message: render_template(template, order, items),
            });
        }
    }

    messages
}

/// Backoff linear. `None` = tentativas esgotadas, a mensagem vira FAILED.
pub fn retry_delay(attempts_so_far: i32, max_attempts: i32, backoff: Duration) -> Option<Duration> {
    let attempt = attempts_so_far + 1;
    if attempt >= max_attempts {
        return None;
    }
    Some(backoff * attempt.max(1) as u32)
}

// --- Gateway ---

#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default = "default_true")]
    status: bool,
    #[serde(default)]
    reason: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Gateway HTTP no estilo Fonnte: `POST {target, message}` com o token no `Authorization`.
#[derive(Clone)]
pub struct HttpWhatsAppGateway {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpWhatsAppGateway {
    pub fn new(client: Client, url: String, token: Option<String>) -> Self {
        Self { client, url, token }
    }
}

#[async_trait]
impl MessageGateway for HttpWhatsAppGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<(), AppError> {
        let Some(token) = self.token.as_deref() else {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "WHATSAPP_GATEWAY_TOKEN não configurado"
            )));
        };

        let response: GatewayResponse = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, token)
            .json(&serde_json::json!({ "target": phone, "message": message }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.status {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "gateway recusou a mensagem: {}",
                response.reason.unwrap_or_else(|| "sem motivo".into())
            )));
        }
        Ok(())
    }
}

// --- Serviço ---

#[derive(Clone)]
pub struct NotificationService {
    settings_repo: SettingsRepository,
    outbox_repo: OutboxRepository,
    gateway: Arc<dyn MessageGateway>,
    max_attempts: i32,
    backoff: Duration,
    signal: Arc<Notify>,
}

impl NotificationService {
    pub fn new(
        settings_repo: SettingsRepository,
        outbox_repo: OutboxRepository,
        gateway: Arc<dyn MessageGateway>,
        max_attempts: i32,
        backoff: Duration,
    ) -> Self {
        Self {
            settings_repo,
            outbox_repo,
            gateway,
            max_attempts: max_attempts.max(1),
            backoff,
            signal: Arc::new(Notify::new()),
        }
    }

    /// Grava as mensagens do pedido no outbox, na transação de quem chama.
    pub async fn enqueue_for_order(
        &self,
        conn: &mut PgConnection,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<usize, AppError> {
        let settings = self.settings_repo.get_notification_settings().await?;
        let messages = build_messages(&settings, order, items);

        for message in &messages {
            self.outbox_repo.enqueue(&mut *conn, order.id, message).await?;
        }
        Ok(messages.len())
    }

    /// Acorda o worker. Chamado depois do commit.
    pub fn wake(&self) {
        self.signal.notify_one();
    }

    async fn deliver(&self, message: &OutboxMessage) -> Result<(), AppError> {
        match self.gateway.send(&message.recipient_phone, &message.message).await {
            Ok(()) => {
                self.outbox_repo.mark_sent(message.id).await?;
                tracing::info!("📨 Notificação {:?} do pedido {} enviada.", message.kind, message.order_id);
            }
            Err(e) => {
                let reason = e.to_string();
                match retry_delay(message.attempts, self.max_attempts, self.backoff) {
                    Some(delay) => {
                        let next = Utc::now()
                            + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::seconds(30));
                        self.outbox_repo.mark_retry(message.id, &reason, next).await?;
                        tracing::warn!(
                            "⚠️ Falha ao enviar notificação {} (tentativa {}): {}",
                            message.id,
                            message.attempts + 1,
                            reason
                        );
                    }
                    None => {
                        self.outbox_repo.mark_failed(message.id, &reason).await?;
                        tracing::error!(
                            "🔥 Notificação {} descartada após {} tentativas: {}",
                            message.id,
                            message.attempts + 1,
                            reason
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Processa um lote de mensagens vencidas. Retorna quantas foram reservadas.
    /// Cada envio é marcado em comando próprio, logo após a resposta do gateway.
    pub async fn process_due(&self) -> Result<usize, AppError> {
        let batch = self.outbox_repo.claim_due(WORKER_BATCH_SIZE, CLAIM_LEASE).await?;
        for message in &batch {
            if let Err(e) = self.deliver(message).await {
                tracing::error!("🔥 Falha ao registrar entrega da notificação {}: {:?}", message.id, e);
            }
        }
        Ok(batch.len())
    }

    /// Loop do worker: roda a cada `poll_interval` ou quando um pedido novo o acorda.
    pub async fn run_worker(self, poll_interval: Duration) {
        tracing::info!("📬 Worker de notificações iniciado.");
        loop {
            tokio::select! {
                _ = self.signal.notified() => {}
                _ = tokio::time::sleep(poll_interval) => {}
            }

            loop {
                match self.process_due().await {
                    Ok(n) if n as i64 == WORKER_BATCH_SIZE => continue,
                    Ok(_) => break,
                    Err(e) => {
                        tracing::error!("🔥 Erro no worker de notificações: {:?}", e);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        notification::OutboxStatus,
        order::{OrderSource, OrderStatus},
    };
    use sqlx::PgPool;
    use std::sync::Mutex;
    use uuid::Uuid;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-20261015-7F3A9C".into(),
            customer_id: Some(Uuid::new_v4()),
            address_label: "Rumah".into(),
            address_name: "Budi".into(),
            address_phone: "0812-3456-7890".into(),
            address_full: "Jl. Melati 5, Bandung".into(),
            subtotal: Decimal::from(100_000),
            shipping_fee: Decimal::from(15_000),
            service_fee: Decimal::from(1_000),
            voucher_discount: Decimal::ZERO,
            coupon_discount: Decimal::ZERO,
            discount: Decimal::ZERO,
            grand_total: Decimal::from(116_000),
            status: OrderStatus::Pending,
            payment_method: "COD".into(),
            shipping_method: None,
            source: OrderSource::Online,
            notes: None,
            voucher_id: None,
            coupon_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn items(order_id: Uuid) -> Vec<OrderItem> {
        vec![OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: Some(Uuid::new_v4()),
            product_name: "Dada Ayam Fillet".into(),
            variant: Some("500g".into()),
            image_url: None,
            quantity: 2,
            unit_price: Decimal::from(50_000),
            original_price: Decimal::from(50_000),
            cost_price: Decimal::from(35_000),
            line_total: Decimal::from(100_000),
            is_promo: false,
        }]
    }

    #[test]
    fn phones_are_normalized_to_country_code() {
        assert_eq!(normalize_phone("0812-3456-7890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("81234567890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("+62 812 3456 7890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("12ab"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn rupiah_formatting() {
        assert_eq!(format_rupiah(Decimal::from(116_000)), "Rp116.000");
        assert_eq!(format_rupiah(Decimal::from(1_250_000)), "Rp1.250.000");
        assert_eq!(format_rupiah(Decimal::from(500)), "Rp500");
        assert_eq!(format_rupiah(Decimal::ZERO), "Rp0");
        assert_eq!(format_rupiah(Decimal::new(9_999_950, 2)), "Rp100.000");
        assert_eq!(format_rupiah(Decimal::from(-20_000)), "-Rp20.000");
    }

    #[test]
    fn template_placeholders_are_filled() {
        let order = order();
        let text = render_template(
            "{{OrderNumber}}|{{CustomerName}}|{{Total}}|{{Ongkir}}|{{Diskon}}|{{ShippingMethod}}\n{{Items}}",
            &order,
            &items(order.id),
        );
        assert_eq!(
            text,
            "ORD-20261015-7F3A9C|Budi|Rp116.000|Rp15.000|Rp0|-\n- Dada Ayam Fillet (500g) x2 = Rp100.000"
        );
    }

    #[test]
    fn nothing_is_queued_when_disabled() {
        let order = order();
        let settings = NotificationSettings {
            admin_phones: vec!["08111111111".into()],
            ..NotificationSettings::default()
        };
        assert!(build_messages(&settings, &order, &items(order.id)).is_empty());
    }

    #[test]
    fn one_message_per_admin_phone_plus_customer() {
        let order = order();
        let settings = NotificationSettings {
            admin_enabled: true,
            customer_enabled: true,
            admin_phones: vec![
                "08111111111".into(),
                "628111111111".into(),
                "xx".into(),
                "08222222222".into(),
            ],
            admin_template: Some("Admin {{OrderNumber}}".into()),
            customer_template: None,
        };

        let messages = build_messages(&settings, &order, &items(order.id));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].recipient_phone, "628111111111");
        assert_eq!(messages[0].message, "Admin ORD-20261015-7F3A9C");
        assert_eq!(messages[1].recipient_phone, "628222222222");
        assert_eq!(messages[2].kind, NotificationKind::Customer);
        assert_eq!(messages[2].recipient_phone, "6281234567890");
        assert!(messages[2].message.contains("Halo Budi"));
    }

    #[test]
    fn customer_without_usable_phone_is_skipped() {
        let mut order = order();
        order.address_phone = "-".into();
        let settings = NotificationSettings {
            customer_enabled: true,
            ..NotificationSettings::default()
        };
        assert!(build_messages(&settings, &order, &[]).is_empty());
    }

    #[test]
    fn linear_backoff_until_max_attempts() {
        let backoff = Duration::from_secs(30);
        assert_eq!(retry_delay(0, 5, backoff), Some(Duration::from_secs(30)));
        assert_eq!(retry_delay(1, 5, backoff), Some(Duration::from_secs(60)));
        assert_eq!(retry_delay(3, 5, backoff), Some(Duration::from_secs(120)));
        assert_eq!(retry_delay(4, 5, backoff), None);
        assert_eq!(retry_delay(0, 1, backoff), None);
    }

    fn gateway_for(server: &MockServer, token: Option<&str>) -> HttpWhatsAppGateway {
        HttpWhatsAppGateway::new(
            Client::new(),
            format!("{}/send", server.uri()),
            token.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn gateway_posts_target_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "secret-token"))
            .and(body_json(serde_json::json!({
                "target": "6281234567890",
                "message": "Halo"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": true })))
            .expect(1)
            .mount(&server)
            .await;

        gateway_for(&server, Some("secret-token"))
            .send("6281234567890", "Halo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gateway_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": false, "reason": "invalid token" })),
            )
            .mount(&server)
            .await;

        let result = gateway_for(&server, Some("bad")).send("628111", "x").await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }

    #[tokio::test]
    async fn gateway_http_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = gateway_for(&server, Some("t")).send("628111", "x").await;
        assert!(matches!(result, Err(AppError::HttpClientError(_))));
    }

    #[tokio::test]
    async fn gateway_without_token_does_not_call_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = gateway_for(&server, None).send("628111", "x").await;
        assert!(result.is_err());
    }

    /// Gateway em memória: registra os envios e falha para um número específico.
    pub(crate) struct ScriptedGateway {
        failing_phone: Option<&'static str>,
        pub(crate) sent: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        pub(crate) fn ok() -> Self {
            Self { failing_phone: None, sent: Mutex::new(vec![]) }
        }

        fn failing_for(phone: &'static str) -> Self {
            Self { failing_phone: Some(phone), sent: Mutex::new(vec![]) }
        }
    }

    #[async_trait]
    impl MessageGateway for ScriptedGateway {
        async fn send(&self, phone: &str, _message: &str) -> Result<(), AppError> {
            if self.failing_phone == Some(phone) {
                return Err(AppError::InternalServerError(anyhow::anyhow!("gateway fora do ar")));
            }
            self.sent.lock().unwrap().push(phone.to_string());
            Ok(())
        }
    }

    async fn seed_order(pool: &PgPool) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_number, address_label, address_name, address_phone,
                                address_full, subtotal, grand_total, payment_method)
            VALUES ('ORD-20261015-AAAAAA', 'Rumah', 'Budi', '081234567890',
                    'Jl. Melati 5', 100000, 100000, 'COD')
            RETURNING id
            "#,
        )
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_message(pool: &PgPool, order_id: Uuid, phone: &str, attempts: i32) {
        sqlx::query(
            r#"
            INSERT INTO notification_outbox (order_id, kind, recipient_phone, message, attempts)
            VALUES ($1, 'ADMIN', $2, 'Pesanan baru', $3)
            "#,
        )
            .bind(order_id)
            .bind(phone)
            .bind(attempts)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn outbox_state(pool: &PgPool) -> Vec<(String, OutboxStatus, i32)> {
        sqlx::query_as(
            "SELECT recipient_phone, status, attempts FROM notification_outbox ORDER BY recipient_phone",
        )
            .fetch_all(pool)
            .await
            .unwrap()
    }

    fn service(pool: &PgPool, gateway: Arc<dyn MessageGateway>) -> NotificationService {
        NotificationService::new(
            SettingsRepository::new(pool.clone()),
            OutboxRepository::new(pool.clone()),
            gateway,
            5,
            Duration::from_secs(30),
        )
    }

    #[sqlx::test]
    async fn each_delivery_is_recorded_independently(pool: PgPool) {
        let order_id = seed_order(&pool).await;
        seed_message(&pool, order_id, "6281111111111", 0).await;
        seed_message(&pool, order_id, "6282222222222", 0).await;

        let gateway = Arc::new(ScriptedGateway::failing_for("6282222222222"));
        let service = service(&pool, gateway.clone());

        assert_eq!(service.process_due().await.unwrap(), 2);
        assert_eq!(*gateway.sent.lock().unwrap(), vec!["6281111111111".to_string()]);
        assert_eq!(
            outbox_state(&pool).await,
            vec![
                ("6281111111111".to_string(), OutboxStatus::Sent, 1),
                ("6282222222222".to_string(), OutboxStatus::Pending, 1),
            ]
        );

        // A falha foi reagendada para o futuro: nada vence agora
        assert_eq!(service.process_due().await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn last_attempt_marks_message_failed(pool: PgPool) {
        let order_id = seed_order(&pool).await;
        seed_message(&pool, order_id, "6282222222222", 4).await;

        let service = service(&pool, Arc::new(ScriptedGateway::failing_for("6282222222222")));
        service.process_due().await.unwrap();

        assert_eq!(
            outbox_state(&pool).await,
            vec![("6282222222222".to_string(), OutboxStatus::Failed, 5)]
        );
    }

    #[sqlx::test]
    async fn claimed_batch_is_not_handed_out_twice(pool: PgPool) {
        let order_id = seed_order(&pool).await;
        seed_message(&pool, order_id, "6281111111111", 0).await;

        let repo = OutboxRepository::new(pool.clone());
        assert_eq!(repo.claim_due(20, Duration::from_secs(300)).await.unwrap().len(), 1);
        assert!(repo.claim_due(20, Duration::from_secs(300)).await.unwrap().is_empty());
    }
}
