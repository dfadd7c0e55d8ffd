//! Order repository over `PostgreSQL`.
//!
//! Order creation is transactional: the order row, its line items, and the
//! account's denormalized order count all land or none do. The paid
//! transition is a conditional update keyed on the current payment status,
//! so a redelivered confirmation event cannot apply twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor, Postgres, Transaction};

use copperleaf_core::{AccountId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId};

use super::{OrderStore, PaidTransition, PgStore, RepositoryError};
use crate::models::{NewOrder, Order, OrderItem, OrderStats, ShippingAddress};

#[derive(FromRow)]
struct OrderRow {
    id: i32,
    account_id: i32,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    ship_street: String,
    ship_city: String,
    ship_state: String,
    ship_zip: String,
    ship_country: String,
    payment_session_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status: OrderStatus = self.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;
        let payment_status: PaymentStatus = self.payment_status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            account_id: AccountId::new(self.account_id),
            items,
            total_amount: self.total_amount,
            status,
            payment_status,
            shipping_address: ShippingAddress {
                street: self.ship_street,
                city: self.ship_city,
                state: self.ship_state,
                zip: self.ship_zip,
                country: self.ship_country,
            },
            payment_session_ref: self.payment_session_ref,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    name: String,
    image: Option<String>,
    quantity: i32,
    price_at_purchase: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(r.id),
            product_id: ProductId::new(r.product_id),
            name: r.name,
            image: r.image,
            quantity: r.quantity,
            price_at_purchase: r.price_at_purchase,
        }
    }
}

const ORDER_COLUMNS: &str = "id, account_id, total_amount, status, payment_status, \
     ship_street, ship_city, ship_state, ship_zip, ship_country, \
     payment_session_ref, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, name, image, quantity, price_at_purchase";

async fn items_for<'e, E>(executor: E, order_id: i32) -> Result<Vec<OrderItem>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM storefront.order_item WHERE order_id = $1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// Attach line items to an already-fetched batch of order rows.
async fn hydrate(
    tx: &mut Transaction<'_, Postgres>,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = items_for(&mut **tx, row.id).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

impl OrderStore for PgStore {
    async fn create_order(&self, input: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO storefront.orders \
                 (account_id, total_amount, status, payment_status, \
                  ship_street, ship_city, ship_state, ship_zip, ship_country) \
             VALUES ($1, $2, 'pending', 'pending', $3, $4, $5, $6, $7) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(input.account_id.as_i32())
        .bind(input.total_amount)
        .bind(&input.shipping_address.street)
        .bind(&input.shipping_address.city)
        .bind(&input.shipping_address.state)
        .bind(&input.shipping_address.zip)
        .bind(&input.shipping_address.country)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let item_row: OrderItemRow = sqlx::query_as(&format!(
                "INSERT INTO storefront.order_item \
                     (order_id, product_id, name, image, quantity, price_at_purchase) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(row.id)
            .bind(item.product_id.as_i32())
            .bind(&item.name)
            .bind(&item.image)
            .bind(item.quantity)
            .bind(item.price_at_purchase)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item_row));
        }

        sqlx::query(
            "UPDATE storefront.account \
             SET order_count = order_count + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(input.account_id.as_i32())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_order(items)
    }

    async fn set_payment_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.orders \
             SET payment_session_ref = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(session_ref)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = items_for(&self.pool, row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn get_order_by_payment_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE payment_session_ref = $1"
        ))
        .bind(session_ref)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = items_for(&self.pool, row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn orders_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders \
             WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id.as_i32())
        .fetch_all(&mut *tx)
        .await?;

        let orders = hydrate(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let orders = hydrate(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(orders)
    }

    async fn mark_paid_if_pending(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<PaidTransition, RepositoryError> {
        // The WHERE clause is the idempotence guard: only a still-pending
        // order can transition, so event redelivery is a no-op.
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE storefront.orders \
             SET status = 'processing', payment_status = 'paid', \
                 payment_session_ref = $2, updated_at = NOW() \
             WHERE id = $1 AND payment_status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(session_ref)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let items = items_for(&self.pool, row.id).await?;
            return Ok(PaidTransition::Applied(row.into_order(items)?));
        }

        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM storefront.orders WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        Ok(if exists.is_some() {
            PaidTransition::AlreadySettled
        } else {
            PaidTransition::NotFound
        })
    }

    async fn cancel_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.orders \
             SET status = 'cancelled', payment_status = 'failed', updated_at = NOW() \
             WHERE payment_status = 'pending' AND status = 'pending' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn order_stats(&self) -> Result<OrderStats, RepositoryError> {
        let row: (Decimal, i64, i64) = sqlx::query_as(
            "SELECT \
                 COALESCE(SUM(total_amount) FILTER (WHERE status <> 'cancelled'), 0), \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE status = 'pending') \
             FROM storefront.orders",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderStats {
            total_revenue: row.0,
            order_count: row.1,
            pending_count: row.2,
        })
    }
}
