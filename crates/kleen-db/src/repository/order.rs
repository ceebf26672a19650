//! # Order Repository
//!
//! Persistence for orders: numbering, creation and every lifecycle write.
//!
//! ## Order Numbers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │  UPDATE counters SET value = value + 1                                 │
//! │   WHERE name = 'order_number' RETURNING value        → 42             │
//! │  INSERT INTO orders (… order_number = 'KP00042' …)                     │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  The counter only moves forward: deleting orders never frees a number. │
//! │  A duplicate number (counter behind the table, e.g. after a restore)   │
//! │  resynchronises the counter with the highest stored number and retries │
//! │  once before surfacing the conflict.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mutations
//! Every change to an existing order goes through [`OrderRepository::mutate`]:
//! the row is locked with a no-op write, loaded, handed to a `kleen-core`
//! rule, and written back in the same transaction. A rule error drops the
//! transaction, leaving the stored order untouched.

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use kleen_core::lifecycle::{self, Stage};
use kleen_core::{
    format_order_number, Actor, CoreResult, CustomerOrderEdit, Money, Order, OrderStatus,
    OrderUpdate, PaymentMethod, PaymentStatus, Percent, ORDER_NUMBER_PREFIX,
};

/// Optional filters for [`OrderRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
    pub business_date: Option<NaiveDate>,
    /// Matches order number, customer name or phone.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

const DEFAULT_LIST_LIMIT: i64 = 200;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Gets an order by ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Order> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Lists orders, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM orders WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(customer_id) = &filter.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(date) = filter.business_date {
            query.push(" AND business_date = ").push_bind(date);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (order_number LIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_phone LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY created_at DESC, order_number DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));

        let orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    /// A portal customer's orders: linked by id, or unlinked with a matching
    /// phone key.
    pub async fn list_for_customer(&self, customer_id: &str, phone_key: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE customer_id = ?1
               OR (customer_id IS NULL AND customer_phone_key = ?2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .bind(phone_key)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Driver work queue: everything ready to go out, plus pickup/delivery
    /// orders still waiting to be collected.
    pub async fn list_driver_queue(&self) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE status = 'ready'
               OR (status = 'received' AND order_type = 'pickup_delivery')
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Σ totals of paid cash orders taken on `date`.
    pub async fn cash_sales(&self, date: NaiveDate) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_cents), 0) FROM orders
            WHERE business_date = ?1
              AND payment_method = 'cash'
              AND payment_status = 'paid'
            "#,
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Assigns the next order number and inserts the order atomically.
    ///
    /// `order` is typically built by [`lifecycle::open_order`]; its
    /// `order_number` is overwritten.
    pub async fn create(&self, mut order: Order) -> DbResult<Order> {
        match self.insert_numbered(&mut order).await {
            Err(err) if err.is_unique_violation_on("order_number") => {
                warn!(
                    order_number = %order.order_number,
                    "Order number already taken, resynchronising counter"
                );
                self.resync_counter().await?;
                self.insert_numbered(&mut order).await?;
            }
            other => other?,
        }

        info!(
            id = %order.id,
            order_number = %order.order_number,
            total_cents = order.total_cents,
            created_by = order.created_by_name.as_deref().unwrap_or("-"),
            "Order created"
        );
        Ok(order)
    }

    async fn insert_numbered(&self, order: &mut Order) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar(
            "UPDATE counters SET value = value + 1 WHERE name = 'order_number' RETURNING value",
        )
        .fetch_one(&mut *tx)
        .await?;
        order.order_number = format_order_number(sequence);

        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");
        insert_order(&mut *tx, order).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Moves the counter up to the highest number already stored.
    async fn resync_counter(&self) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE counters
            SET value = MAX(value, (
                SELECT COALESCE(MAX(CAST(SUBSTR(order_number, ?1) AS INTEGER)), 0)
                FROM orders
                WHERE order_number LIKE ?2
            ))
            WHERE name = 'order_number'
            "#,
        )
        .bind(ORDER_NUMBER_PREFIX.len() as i64 + 1)
        .bind(format!("{}%", ORDER_NUMBER_PREFIX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Loads, changes and saves an order in one transaction.
    ///
    /// `change` runs with the row already write-locked; returning an error
    /// rolls everything back.
    pub async fn mutate<T, F>(&self, id: &str, change: F) -> DbResult<(Order, T)>
    where
        F: FnOnce(&mut Order) -> CoreResult<T>,
    {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        let mut order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let outcome = change(&mut order)?;

        save_order(&mut *tx, &order).await?;
        tx.commit().await?;

        Ok((order, outcome))
    }

    /// Staff edit. Totals are recomputed with `tax_rate` when a money input
    /// changes.
    pub async fn update(&self, id: &str, update: OrderUpdate, tax_rate: Percent) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| {
                lifecycle::ensure_staff_editable(order)?;
                lifecycle::apply_update(order, update, tax_rate, Utc::now())
            })
            .await?;
        debug!(order_number = %order.order_number, "Order updated");
        Ok(order)
    }

    /// Portal edit by the owning customer, only while `received`.
    pub async fn update_as_customer(
        &self,
        id: &str,
        customer_id: &str,
        phone_key: &str,
        edit: CustomerOrderEdit,
        tax_rate: Percent,
    ) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| {
                lifecycle::ensure_customer_modifiable(order, customer_id, phone_key)?;
                lifecycle::apply_update(order, edit.into(), tax_rate, Utc::now())
            })
            .await?;
        debug!(order_number = %order.order_number, "Order updated by customer");
        Ok(order)
    }

    pub async fn set_status(&self, id: &str, status: OrderStatus, actor: &Actor) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| lifecycle::transition(order, status, actor, Utc::now()))
            .await?;
        info!(
            order_number = %order.order_number,
            status = %order.status,
            by = %actor.name,
            "Order status changed"
        );
        Ok(order)
    }

    pub async fn cancel(&self, id: &str, actor: &Actor) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| lifecycle::cancel(order, &actor.name, Utc::now()))
            .await?;
        info!(order_number = %order.order_number, by = %actor.name, "Order cancelled");
        Ok(order)
    }

    /// Portal cancellation by the owning customer, only while `received`.
    pub async fn cancel_as_customer(
        &self,
        id: &str,
        customer_id: &str,
        phone_key: &str,
        customer_name: &str,
    ) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| {
                lifecycle::ensure_customer_modifiable(order, customer_id, phone_key)?;
                lifecycle::cancel(order, customer_name, Utc::now())
            })
            .await?;
        info!(order_number = %order.order_number, "Order cancelled by customer");
        Ok(order)
    }

    pub async fn set_payment(
        &self,
        id: &str,
        status: PaymentStatus,
        method: Option<PaymentMethod>,
    ) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| {
                lifecycle::set_payment(order, status, method, Utc::now());
                Ok(())
            })
            .await?;
        debug!(order_number = %order.order_number, paid = order.is_paid(), "Payment updated");
        Ok(order)
    }

    /// Records an approved card charge of `charged`. Only the last four
    /// digits are stored.
    ///
    /// The order is re-checked under the write lock; see
    /// [`lifecycle::record_card_payment`].
    pub async fn record_card_payment(
        &self,
        id: &str,
        charged: Money,
        last_four: String,
        reference: String,
    ) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| {
                lifecycle::record_card_payment(order, charged, last_four, reference, Utc::now())
            })
            .await?;
        info!(order_number = %order.order_number, "Card payment recorded");
        Ok(order)
    }

    /// Delivery fast path. Returns the order and the stages it skipped.
    pub async fn deliver(
        &self,
        id: &str,
        actor: &Actor,
        photo: Option<String>,
    ) -> DbResult<(Order, Vec<Stage>)> {
        let (order, skipped) = self
            .mutate(id, |order| lifecycle::deliver(order, actor, photo, Utc::now()))
            .await?;

        if !skipped.is_empty() {
            warn!(
                order_number = %order.order_number,
                by = %actor.name,
                skipped = ?skipped,
                "Order delivered without passing every stage"
            );
        }
        info!(order_number = %order.order_number, by = %actor.name, "Order delivered");
        Ok((order, skipped))
    }

    pub async fn mark_picked_up(&self, id: &str, actor: &Actor) -> DbResult<Order> {
        let (order, _) = self
            .mutate(id, |order| lifecycle::mark_picked_up(order, actor, Utc::now()))
            .await?;
        info!(order_number = %order.order_number, by = %actor.name, "Order picked up");
        Ok(order)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Hard delete. The order-number counter is not touched.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }
        info!(id = %id, "Order deleted");
        Ok(())
    }

    /// Deletes every order. Customers and the counter are left alone.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM orders").execute(&self.pool).await?;
        warn!(count = result.rows_affected(), "All orders deleted");
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Row Writers
// =============================================================================

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number,
            customer_id, customer_name, customer_phone, customer_phone_key,
            customer_email, customer_address,
            order_type, items,
            subtotal_cents, discount_percent, discount_cents, adjustment_cents,
            tax_rate, tax_cents, total_cents, weight_lbs,
            status, payment_status, payment_method, card_last_four, payment_reference,
            notes, created_by, created_by_name,
            received_by, received_at,
            business_date, created_at, updated_at
        ) VALUES (
            ?1, ?2,
            ?3, ?4, ?5, ?6,
            ?7, ?8,
            ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18,
            ?19, ?20, ?21, ?22, ?23,
            ?24, ?25, ?26,
            ?27, ?28,
            ?29, ?30, ?31
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_phone_key)
    .bind(&order.customer_email)
    .bind(&order.customer_address)
    .bind(order.order_type)
    .bind(sqlx::types::Json(&order.items))
    .bind(order.subtotal_cents)
    .bind(order.discount_percent)
    .bind(order.discount_cents)
    .bind(order.adjustment_cents)
    .bind(order.tax_rate)
    .bind(order.tax_cents)
    .bind(order.total_cents)
    .bind(order.weight_lbs)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(&order.card_last_four)
    .bind(&order.payment_reference)
    .bind(&order.notes)
    .bind(&order.created_by)
    .bind(&order.created_by_name)
    .bind(&order.received_by)
    .bind(order.received_at)
    .bind(order.business_date)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Writes every mutable column back.
async fn save_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE orders SET
            customer_name = ?2,
            customer_phone = ?3,
            customer_phone_key = ?4,
            customer_email = ?5,
            customer_address = ?6,
            order_type = ?7,
            items = ?8,
            subtotal_cents = ?9,
            discount_percent = ?10,
            discount_cents = ?11,
            adjustment_cents = ?12,
            tax_rate = ?13,
            tax_cents = ?14,
            total_cents = ?15,
            weight_lbs = ?16,
            status = ?17,
            payment_status = ?18,
            payment_method = ?19,
            card_last_four = ?20,
            payment_reference = ?21,
            notes = ?22,
            received_by = ?23, received_at = ?24,
            cleaned_by = ?25, cleaned_at = ?26,
            ready_by = ?27, ready_at = ?28,
            delivered_by = ?29, delivered_at = ?30,
            pickup_by = ?31, pickup_at = ?32,
            cancelled_by = ?33, cancelled_at = ?34,
            delivery_photo = ?35,
            updated_at = ?36
        WHERE id = ?1
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_phone_key)
    .bind(&order.customer_email)
    .bind(&order.customer_address)
    .bind(order.order_type)
    .bind(sqlx::types::Json(&order.items))
    .bind(order.subtotal_cents)
    .bind(order.discount_percent)
    .bind(order.discount_cents)
    .bind(order.adjustment_cents)
    .bind(order.tax_rate)
    .bind(order.tax_cents)
    .bind(order.total_cents)
    .bind(order.weight_lbs)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(&order.card_last_four)
    .bind(&order.payment_reference)
    .bind(&order.notes)
    .bind(&order.received_by)
    .bind(order.received_at)
    .bind(&order.cleaned_by)
    .bind(order.cleaned_at)
    .bind(&order.ready_by)
    .bind(order.ready_at)
    .bind(&order.delivered_by)
    .bind(order.delivered_at)
    .bind(&order.pickup_by)
    .bind(order.pickup_at)
    .bind(&order.cancelled_by)
    .bind(order.cancelled_at)
    .bind(&order.delivery_photo)
    .bind(order.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
