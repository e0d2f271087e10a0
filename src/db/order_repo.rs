// src/db/order_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::order::{Order, OrderItem, OrderSource, OrderStatus},
    services::pricing::{OrderTotals, PricedLine},
};

/// Cabeçalho do pedido a inserir. Os totais já chegam calculados.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub customer_id: Option<Uuid>,
    pub address_label: &'a str,
    pub address_name: &'a str,
    pub address_phone: &'a str,
    pub address_full: &'a str,
    pub totals: &'a OrderTotals,
    pub payment_method: &'a str,
    pub shipping_method: Option<&'a str>,
    pub source: OrderSource,
    pub notes: Option<&'a str>,
    pub voucher_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_order<'e, E>(&self, executor: E, new: &NewOrder<'_>) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, customer_id,
                address_label, address_name, address_phone, address_full,
                subtotal, shipping_fee, service_fee,
                voucher_discount, coupon_discount, discount, grand_total,
                payment_method, shipping_method, source, notes,
                voucher_id, coupon_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
            .bind(new.order_number)
            .bind(new.customer_id)
            .bind(new.address_label)
            .bind(new.address_name)
            .bind(new.address_phone)
            .bind(new.address_full)
            .bind(new.totals.subtotal)
            .bind(new.totals.shipping_fee)
            .bind(new.totals.service_fee)
            .bind(new.totals.voucher_discount)
            .bind(new.totals.coupon_discount)
            .bind(new.totals.discount)
            .bind(new.totals.grand_total)
            .bind(new.payment_method)
            .bind(new.shipping_method)
            .bind(new.source)
            .bind(new.notes)
            .bind(new.voucher_id)
            .bind(new.coupon_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::InternalServerError(anyhow::anyhow!(
                            "número de pedido duplicado: {}",
                            new.order_number
                        ));
                    }
                }
                e.into()
            })?;

        Ok(order)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        line: &PricedLine,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (
                order_id, product_id, product_name, variant, image_url,
                quantity, unit_price, original_price, cost_price, line_total, is_promo
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.variant)
            .bind(&line.image_url)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.original_price)
            .bind(line.cost_price)
            .bind(line.line_total)
            .bind(line.is_promo)
            .fetch_one(executor)
            .await?;

        Ok(item)
    }

    /// Pedidos do cliente, mais recentes primeiro. Lista de status vazia = todos.
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE customer_id = $1
              AND (cardinality($2::order_status[]) = 0 OR status = ANY($2))
            ORDER BY created_at DESC
            "#,
        )
            .bind(customer_id)
            .bind(statuses)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    pub async fn items_for_orders(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>, AppError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY product_name ASC",
        )
            .bind(order_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(order)
    }

    pub async fn list_items<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = $1 ORDER BY product_name ASC",
        )
            .bind(order_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(order_id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(order)
    }
}
