// src/services/order_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        order_repo::NewOrder, CartRepository, CatalogRepository, OrderRepository, PromotionRepository,
    },
    models::order::{
        CartLine, Order, OrderDetail, OrderFilter, OrderItem, OrderLimits, OrderSource, OrderStatus,
        OrderSummary,
    },
    services::{
        loyalty_service::LoyaltyService,
        notification_service::NotificationService,
        pricing::{self, CatalogEntry, PricedLine},
    },
};

const MAX_THUMBNAILS: usize = 3;
const MONTHS_ID: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// Dados do checkout já validados pelo handler.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub address_label: String,
    pub address_name: String,
    pub address_phone: String,
    pub address_full: String,
    pub payment_method: String,
    pub shipping_method: Option<String>,
    pub notes: Option<String>,
    pub voucher_code: Option<String>,
    pub coupon_code: Option<String>,
    pub shipping_fee: Decimal,
    pub service_fee: Decimal,
}

/// `ORD-AAAAMMDD-XXXXXX`
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d"), &suffix[..6])
}

/// Data no fuso de Jacarta (WIB), ex.: `15 Okt 2026, 14:30`.
pub fn format_order_date(at: DateTime<Utc>) -> String {
    let wib = FixedOffset::east_opt(7 * 3600).map(|tz| at.with_timezone(&tz));
    match wib {
        Some(local) => format!(
            "{} {} {}, {:02}:{:02}",
            local.day(),
            MONTHS_ID[local.month0() as usize],
            local.year(),
            local.hour(),
            local.minute()
        ),
        None => at.format("%d/%m/%Y %H:%M").to_string(),
    }
}

pub fn summarize(order: &Order, items: &[&OrderItem]) -> OrderSummary {
    OrderSummary {
        id: order.id,
        order_number: order.order_number.clone(),
        date: format_order_date(order.created_at),
        status: order.status.as_str().to_lowercase(),
        thumbnails: items
            .iter()
            .filter_map(|item| item.image_url.clone())
            .take(MAX_THUMBNAILS)
            .collect(),
        total: order.grand_total,
    }
}

/// Quantidade total por produto, só para produtos com estoque finito.
fn stock_demand(lines: &[PricedLine]) -> Vec<(Uuid, String, i32)> {
    let mut demand: Vec<(Uuid, String, i32)> = Vec::new();
    for line in lines.iter().filter(|l| l.tracks_stock) {
        match demand.iter_mut().find(|(id, _, _)| *id == line.product_id) {
            Some(entry) => entry.2 += line.quantity,
            None => demand.push((line.product_id, line.product_name.clone(), line.quantity)),
        }
    }
    demand
}

fn non_empty(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|c| !c.is_empty())
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    catalog_repo: CatalogRepository,
    order_repo: OrderRepository,
    promotion_repo: PromotionRepository,
    cart_repo: CartRepository,
    notification_service: NotificationService,
    loyalty_service: LoyaltyService,
    limits: OrderLimits,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        catalog_repo: CatalogRepository,
        order_repo: OrderRepository,
        promotion_repo: PromotionRepository,
        cart_repo: CartRepository,
        notification_service: NotificationService,
        loyalty_service: LoyaltyService,
        limits: OrderLimits,
    ) -> Self {
        Self {
            pool,
            catalog_repo,
            order_repo,
            promotion_repo,
            cart_repo,
            notification_service,
            loyalty_service,
            limits,
        }
    }

    /// Checkout completo numa única transação: preço, estoque, voucher, cupom,
    /// carrinho, pedido e outbox. Qualquer erro desfaz tudo (rollback no drop).
    pub async fn create_order(&self, customer_id: Uuid, request: &CheckoutRequest) -> Result<Order, AppError> {
        pricing::validate_order_limits(&request.items, &self.limits)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // 1. Catálogo autoritativo
        let mut ids: Vec<Uuid> = request.items.iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();

        let products = self.catalog_repo.find_products_by_ids(&mut *tx, &ids).await?;
        let variants = self.catalog_repo.find_variants_by_product_ids(&mut *tx, &ids).await?;

        let mut catalog: HashMap<Uuid, CatalogEntry> = products
            .into_iter()
            .map(|product| (product.id, CatalogEntry { product, variants: vec![] }))
            .collect();
        for variant in variants {
            if let Some(entry) = catalog.get_mut(&variant.product_id) {
                entry.variants.push(variant);
            }
        }

        // 2. Existência, saldo e preço
        pricing::check_availability(&request.items, &catalog)?;
        let lines = pricing::price_lines(&request.items, &catalog, now)?;

        let subtotal = pricing::subtotal(&lines);
        if subtotal < self.limits.min_subtotal {
            return Err(AppError::BelowMinimumSubtotal { min: self.limits.min_subtotal });
        }

        // 3. Voucher e cupom (podem ser combinados)
        let voucher = match non_empty(request.voucher_code.as_deref()) {
            Some(code) => {
                let found = self.promotion_repo.find_voucher_by_code(&mut *tx, code).await?;
                let discount = pricing::voucher_discount(found.as_ref(), customer_id, now)?;
                found.map(|v| (v, discount))
            }
            None => None,
        };

        let coupon = match non_empty(request.coupon_code.as_deref()) {
            Some(code) => {
                let found = self.promotion_repo.find_coupon_by_code(&mut *tx, code).await?;
                let discount = pricing::coupon_discount(found.as_ref(), &lines, now)?;
                found.map(|c| (c, discount))
            }
            None => None,
        };

        let totals = pricing::compute_totals(
            &lines,
            request.shipping_fee,
            request.service_fee,
            voucher.as_ref().map_or(Decimal::ZERO, |(_, d)| *d),
            coupon.as_ref().map_or(Decimal::ZERO, |(_, d)| *d),
        );

        // 4. Baixa de estoque condicional
        for (product_id, name, quantity) in stock_demand(&lines) {
            let decremented = self
                .catalog_repo
                .decrement_stock(&mut *tx, product_id, quantity)
                .await?;
            if !decremented {
                return Err(AppError::InsufficientStock(name));
            }
        }

        // 5. Consumo de voucher / cupom
        if let Some((voucher, _)) = &voucher {
            if !self.promotion_repo.mark_voucher_used(&mut *tx, voucher.id).await? {
                return Err(AppError::VoucherAlreadyUsed);
            }
        }
        if let Some((coupon, discount)) = &coupon {
            if *discount > Decimal::ZERO
                && !self.promotion_repo.increment_coupon_usage(&mut *tx, coupon.id).await?
            {
                return Err(AppError::CouponExhausted);
            }
        }

        // 6. Carrinho persistido
        self.cart_repo.delete(&mut *tx, customer_id).await?;

        // 7. Pedido + itens
        let order_number = generate_order_number(now);
        let order = self
            .order_repo
            .insert_order(
                &mut *tx,
                &NewOrder {
                    order_number: &order_number,
                    customer_id: Some(customer_id),
                    address_label: request.address_label.trim(),
                    address_name: request.address_name.trim(),
                    address_phone: request.address_phone.trim(),
                    address_full: request.address_full.trim(),
                    totals: &totals,
                    payment_method: request.payment_method.trim(),
                    shipping_method: non_empty(request.shipping_method.as_deref()),
                    source: OrderSource::Online,
                    notes: non_empty(request.notes.as_deref()),
                    voucher_id: voucher.as_ref().map(|(v, _)| v.id),
                    coupon_id: coupon.as_ref().map(|(c, _)| c.id),
                },
            )
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.order_repo.insert_item(&mut *tx, order.id, line).await?);
        }

        // 8. Outbox (entregue depois do commit pelo worker)
        let queued = self
            .notification_service
            .enqueue_for_order(&mut *tx, &order, &items)
            .await?;

        tx.commit().await?;

        self.notification_service.wake();

        tracing::info!(
            "✅ Pedido {} criado: {} itens, total {} ({} notificações na fila)",
            order.order_number,
            items.len(),
            order.grand_total,
            queued
        );
        Ok(order)
    }

    pub async fn list_orders(&self, customer_id: Uuid, filter: &OrderFilter) -> Result<Vec<OrderSummary>, AppError> {
        let orders = self
            .order_repo
            .list_for_customer(customer_id, &filter.statuses())
            .await?;

        if orders.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = self.order_repo.items_for_orders(&ids).await?;

        let mut by_order: HashMap<Uuid, Vec<&OrderItem>> = HashMap::new();
        for item in &items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .iter()
            .map(|order| {
                let order_items = by_order.get(&order.id).map(Vec::as_slice).unwrap_or(&[]);
                summarize(order, order_items)
            })
            .collect())
    }

    /// Pedido de outro cliente responde como inexistente.
    pub async fn get_order(&self, customer_id: Uuid, order_id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self
            .order_repo
            .find_by_id(&self.pool, order_id)
            .await?
            .filter(|o| o.customer_id == Some(customer_id))
            .ok_or_else(|| AppError::ResourceNotFound("order".into()))?;

        let items = self.order_repo.list_items(&self.pool, order.id).await?;
        Ok(OrderDetail { header: order, items })
    }

    /// Transição administrativa de status. DELIVERED acumula pontos e CANCELLED devolve estoque,
    /// ambos na mesma transação da mudança.
    pub async fn transition_order(&self, order_id: Uuid, next: OrderStatus) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .order_repo
            .find_for_update(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("order".into()))?;

        if !order.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: order.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let updated = self.order_repo.update_status(&mut *tx, order_id, next).await?;

        match next {
            OrderStatus::Delivered => {
                // Pedido de balcão (POS) sem cliente não acumula
                if let Some(customer_id) = order.customer_id {
                    let accrual = self
                        .loyalty_service
                        .accrue_for_order(
                            &mut *tx,
                            customer_id,
                            order.id,
                            &order.order_number,
                            order.grand_total,
                        )
                        .await?;
                    if let Some(accrual) = accrual {
                        tracing::info!(
                            "🏅 Pedido {}: +{} pontos (saldo {})",
                            order.order_number,
                            accrual.points_earned,
                            accrual.balance
                        );
                    }
                }
            }
            OrderStatus::Cancelled => {
                let items = self.order_repo.list_items(&mut *tx, order.id).await?;
                for item in items {
                    if let Some(product_id) = item.product_id {
                        self.catalog_repo.restock(&mut *tx, product_id, item.quantity).await?;
                    }
                }
            }
            _ => {}
        }

        tx.commit().await?;

        tracing::info!(
            "🔄 Pedido {}: {} -> {}",
            updated.order_number,
            order.status.as_str(),
            updated.status.as_str()
        );
        Ok(updated)
    }
}
