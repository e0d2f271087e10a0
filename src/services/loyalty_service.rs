// src/services/loyalty_service.rs

use chrono::{Duration, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerRepository, LoyaltyRepository, PromotionRepository},
    models::{
        loyalty::{LoyaltyConfig, LoyaltyProfile, Reward, Tier, TransactionType},
        promotion::Voucher,
    },
};

const PROFILE_HISTORY_LIMIT: i64 = 50;

/// `floor(floor(valor / points_per_amount) × multiplicador)`.
pub fn points_for(amount: Decimal, config: &LoyaltyConfig, tier: Tier) -> i64 {
    if config.points_per_amount <= Decimal::ZERO || amount <= Decimal::ZERO {
        return 0;
    }
    let base = (amount / config.points_per_amount).floor();
    (base * config.multiplier_for(tier))
        .floor()
        .to_i64()
        .unwrap_or(0)
}

/// Nível pelo gasto acumulado. Nunca rebaixa.
pub fn tier_for(total_spent: Decimal, config: &LoyaltyConfig, current: Tier) -> Tier {
    let reached = if total_spent >= config.min_spent_gold {
        Tier::Gold
    } else if total_spent >= config.min_spent_silver {
        Tier::Silver
    } else {
        Tier::Bronze
    };
    reached.max(current)
}

pub fn reward_voucher_code() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("RWD-{}", &id[..8])
}

/// Resultado do acúmulo de pontos de um pedido entregue.
#[derive(Debug, Clone, PartialEq)]
pub struct Accrual {
    pub points_earned: i64,
    pub balance: i64,
    pub tier: Tier,
}

#[derive(Clone)]
pub struct LoyaltyService {
    pool: PgPool,
    loyalty_repo: LoyaltyRepository,
    customer_repo: CustomerRepository,
    promotion_repo: PromotionRepository,
}

impl LoyaltyService {
    pub fn new(
        pool: PgPool,
        loyalty_repo: LoyaltyRepository,
        customer_repo: CustomerRepository,
        promotion_repo: PromotionRepository,
    ) -> Self {
        Self {
            pool,
            loyalty_repo,
            customer_repo,
            promotion_repo,
        }
    }

    /// Roda dentro da transação de quem chama (transição para DELIVERED).
    /// Um pedido só acumula uma vez.
    pub async fn accrue_for_order(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        order_id: Uuid,
        order_number: &str,
        amount: Decimal,
    ) -> Result<Option<Accrual>, AppError> {
        if self.loyalty_repo.has_earned_for_order(&mut *conn, order_id).await? {
            tracing::warn!("⚠️ Pedido {} já acumulou pontos; ignorando.", order_number);
            return Ok(None);
        }

        let customer = self
            .customer_repo
            .find_for_update(&mut *conn, customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("customer".into()))?;

        let config = self.loyalty_repo.get_config(&mut *conn).await?;

        // Multiplicador do nível anterior à compra
        let points = points_for(amount, &config, customer.tier);
        if points > 0 {
            self.loyalty_repo
                .append_transaction(
                    &mut *conn,
                    customer_id,
                    TransactionType::Earned,
                    points,
                    &format!("Poin dari pesanan {}", order_number),
                    Some(order_id),
                )
                .await?;
        }
        let balance = self.loyalty_repo.sync_cached_balance(&mut *conn, customer_id).await?;

        let tier = tier_for(customer.total_spent + amount, &config, customer.tier);
        self.customer_repo
            .record_spending(&mut *conn, customer_id, amount, tier)
            .await?;

        if tier != customer.tier {
            tracing::info!("🏅 Cliente {} subiu para {:?}", customer_id, tier);
        }

        Ok(Some(Accrual {
            points_earned: points,
            balance,
            tier,
        }))
    }

    /// Troca pontos por um voucher. Sem saldo suficiente nada é gravado.
    pub async fn redeem(&self, customer_id: Uuid, reward_id: Uuid) -> Result<(Voucher, i64), AppError> {
        let mut tx = self.pool.begin().await?;

        self.customer_repo
            .find_for_update(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("customer".into()))?;

        let reward = self
            .loyalty_repo
            .find_active_reward(&mut *tx, reward_id)
            .await?
            .ok_or(AppError::RewardNotFound)?;

        // Saldo autoritativo vem do livro-razão, não do cache
        let balance = self.loyalty_repo.sync_cached_balance(&mut *tx, customer_id).await?;
        if balance < reward.points_cost {
            return Err(AppError::InsufficientPoints);
        }

        let config = self.loyalty_repo.get_config(&mut *tx).await?;

        self.loyalty_repo
            .append_transaction(
                &mut *tx,
                customer_id,
                TransactionType::Spent,
                -reward.points_cost,
                &format!("Tukar poin: {}", reward.name),
                None,
            )
            .await?;
        let balance = self.loyalty_repo.sync_cached_balance(&mut *tx, customer_id).await?;

        let expires_at = Utc::now() + Duration::days(i64::from(config.voucher_validity_days));
        let voucher = self
            .promotion_repo
            .create_voucher(
                &mut *tx,
                &reward_voucher_code(),
                reward.reward_type,
                reward.value,
                customer_id,
                Some(reward.id),
                Some(expires_at),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🎁 Cliente {} trocou {} pontos por '{}' ({})",
            customer_id,
            reward.points_cost,
            reward.name,
            voucher.code
        );
        Ok((voucher, balance))
    }

    pub async fn profile(&self, customer_id: Uuid) -> Result<LoyaltyProfile, AppError> {
        let customer = self
            .customer_repo
            .find_by_id(customer_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("customer".into()))?;

        let transactions = self
            .loyalty_repo
            .list_transactions(customer_id, PROFILE_HISTORY_LIMIT)
            .await?;
        let vouchers = self.promotion_repo.list_vouchers_for_customer(customer_id).await?;

        Ok(LoyaltyProfile {
            points: customer.points,
            tier: customer.tier,
            total_spent: customer.total_spent,
            transactions,
            vouchers,
        })
    }

    pub async fn rewards(&self) -> Result<Vec<Reward>, AppError> {
        self.loyalty_repo.list_active_rewards().await
    }

    pub async fn config(&self) -> Result<LoyaltyConfig, AppError> {
        self.loyalty_repo.get_config(&self.pool).await
    }

    pub async fn reconcile(&self) -> Result<u64, AppError> {
        self.loyalty_repo.reconcile_all_balances().await
    }

    /// Tarefa de fundo: corrige saldos em cache que divergiram do livro-razão.
    pub async fn run_reconciliation(self, every: std::time::Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match self.reconcile().await {
                Ok(0) => tracing::debug!("🔎 Saldos de pontos conferidos, nenhum ajuste."),
                Ok(n) => tracing::warn!("🔧 {} saldo(s) de pontos corrigido(s) a partir do livro-razão.", n),
                Err(e) => tracing::error!("🔥 Falha na reconciliação de pontos: {:?}", e),
            }
        }
    }
}
