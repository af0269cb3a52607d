//! # Order Repository
//!
//! Persistence for orders: batch insert at checkout, buyer-scoped reads, and
//! compare-and-set status transitions.
//!
//! ## Order Lifecycle in the Database
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Persistence                                 │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert_batch([o1, o2, o3])   one SQL transaction               │
//! │         all rows or none                                               │
//! │                                                                         │
//! │  2. TRANSITION (pay / ship / refund / cancel)                          │
//! │     └── order.mark_as_paid(..)       pure, in memory (folio-core)      │
//! │     └── save_transition(&order, previous_status)                       │
//! │             UPDATE orders SET ... WHERE id = ? AND status = <previous> │
//! │             0 rows → Conflict (someone else moved it first)            │
//! │                                                                         │
//! │  3. NEVER DELETED                                                      │
//! │     Cancelled and refunded orders stay for audit.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use folio_core::{Order, OrderStatus, PaymentMethod};

const ORDER_COLUMNS: &str = r#"
    id, reference, checkout_id, buyer_id, item_id, item_title,
    quantity, unit_price_cents, line_subtotal_cents, tax_cents,
    shipping_cents, final_amount_cents, currency, payment_method,
    transaction_id, shipping_address, notes, status, tracking_number,
    estimated_delivery, paid_at, shipped_at, delivered_at, cancelled_at,
    cancel_reason, refund_reason, refund_amount_cents, refunded_at,
    created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat row shape; the shipping address is a JSON column.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    reference: String,
    checkout_id: String,
    buyer_id: String,
    item_id: String,
    item_title: String,
    quantity: i64,
    unit_price_cents: i64,
    line_subtotal_cents: i64,
    tax_cents: i64,
    shipping_cents: i64,
    final_amount_cents: i64,
    currency: String,
    payment_method: PaymentMethod,
    transaction_id: Option<String>,
    shipping_address: String,
    notes: Option<String>,
    status: OrderStatus,
    tracking_number: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    refund_reason: Option<String>,
    refund_amount_cents: Option<i64>,
    refunded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            shipping_address: serde_json::from_str(&row.shipping_address)?,
            id: row.id,
            reference: row.reference,
            checkout_id: row.checkout_id,
            buyer_id: row.buyer_id,
            item_id: row.item_id,
            item_title: row.item_title,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            line_subtotal_cents: row.line_subtotal_cents,
            tax_cents: row.tax_cents,
            shipping_cents: row.shipping_cents,
            final_amount_cents: row.final_amount_cents,
            currency: row.currency,
            payment_method: row.payment_method,
            transaction_id: row.transaction_id,
            notes: row.notes,
            status: row.status,
            tracking_number: row.tracking_number,
            estimated_delivery: row.estimated_delivery,
            paid_at: row.paid_at,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            cancel_reason: row.cancel_reason,
            refund_reason: row.refund_reason,
            refund_amount_cents: row.refund_amount_cents,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> DbResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts every order of one checkout in a single transaction.
    ///
    /// Either all rows land or none do; on error the transaction is rolled
    /// back when dropped.
    pub async fn insert_batch(&self, orders: &[Order]) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for order in orders {
            insert_order(&mut tx, order).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(count = orders.len(), "Inserted orders");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// One of the buyer's own orders. Another buyer's order reads as absent.
    pub async fn get_for_buyer(&self, id: &str, buyer_id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?1 AND buyer_id = ?2",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(buyer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// The buyer's orders, newest first, optionally filtered by status.
    pub async fn list_for_buyer(
        &self,
        buyer_id: &str,
        status: Option<OrderStatus>,
    ) -> DbResult<Vec<Order>> {
        debug!(buyer_id = %buyer_id, status = ?status, "Listing orders");

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM orders
            WHERE buyer_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, reference ASC
            "#,
            ORDER_COLUMNS
        ))
        .bind(buyer_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    /// All orders created by one checkout, in line order.
    pub async fn list_by_checkout(&self, checkout_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE checkout_id = ?1 ORDER BY reference ASC",
            ORDER_COLUMNS
        ))
        .bind(checkout_id)
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    /// Persists an in-memory transition, if the stored status is still
    /// `previous`.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - the order moved on since it was loaded
    /// * `Err(DbError::NotFound)` - no such order
    pub async fn save_transition(&self, order: &Order, previous: OrderStatus) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?3,
                transaction_id = ?4,
                tracking_number = ?5,
                estimated_delivery = ?6,
                paid_at = ?7,
                shipped_at = ?8,
                delivered_at = ?9,
                cancelled_at = ?10,
                cancel_reason = ?11,
                refund_reason = ?12,
                refund_amount_cents = ?13,
                refunded_at = ?14,
                updated_at = ?15
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(&order.id)
        .bind(previous)
        .bind(order.status)
        .bind(&order.transaction_id)
        .bind(&order.tracking_number)
        .bind(order.estimated_delivery)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancel_reason)
        .bind(&order.refund_reason)
        .bind(order.refund_amount_cents)
        .bind(order.refunded_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?1")
                .bind(&order.id)
                .fetch_optional(&self.pool)
                .await?;
            return Err(match exists {
                Some(_) => DbError::conflict("Order", &order.id),
                None => DbError::not_found("Order", &order.id),
            });
        }

        info!(
            order_id = %order.id,
            from = %previous,
            to = %order.status,
            "Order transitioned"
        );
        Ok(())
    }
}

async fn insert_order(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
    debug!(order_id = %order.id, reference = %order.reference, "Inserting order");

    let shipping_address = serde_json::to_string(&order.shipping_address)?;

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, reference, checkout_id, buyer_id, item_id, item_title,
            quantity, unit_price_cents, line_subtotal_cents, tax_cents,
            shipping_cents, final_amount_cents, currency, payment_method,
            transaction_id, shipping_address, notes, status, tracking_number,
            estimated_delivery, paid_at, shipped_at, delivered_at, cancelled_at,
            cancel_reason, refund_reason, refund_amount_cents, refunded_at,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23, ?24,
            ?25, ?26, ?27, ?28,
            ?29, ?30
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.reference)
    .bind(&order.checkout_id)
    .bind(&order.buyer_id)
    .bind(&order.item_id)
    .bind(&order.item_title)
    .bind(order.quantity)
    .bind(order.unit_price_cents)
    .bind(order.line_subtotal_cents)
    .bind(order.tax_cents)
    .bind(order.shipping_cents)
    .bind(order.final_amount_cents)
    .bind(&order.currency)
    .bind(order.payment_method)
    .bind(&order.transaction_id)
    .bind(shipping_address)
    .bind(&order.notes)
    .bind(order.status)
    .bind(&order.tracking_number)
    .bind(order.estimated_delivery)
    .bind(order.paid_at)
    .bind(order.shipped_at)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .bind(&order.cancel_reason)
    .bind(&order.refund_reason)
    .bind(order.refund_amount_cents)
    .bind(order.refunded_at)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Helper to generate a new order or checkout ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, sample_item, sample_order};
    use folio_core::Money;

    #[tokio::test]
    async fn test_insert_batch_and_read_back() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();

        let first = sample_order(&item, "buyer-1", "chk-1", 1);
        let second = sample_order(&item, "buyer-1", "chk-1", 2);
        db.orders()
            .insert_batch(&[first.clone(), second.clone()])
            .await
            .unwrap();

        let loaded = db.orders().get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(loaded, first);

        let batch = db.orders().list_by_checkout("chk-1").await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
    }

    #[tokio::test]
    async fn test_checkout_lists_in_line_order_past_nine_lines() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();

        let orders: Vec<Order> = (1..=11)
            .map(|line| sample_order(&item, "buyer-1", "chk-1", line))
            .collect();
        db.orders().insert_batch(&orders).await.unwrap();

        let expected: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        let batch = db.orders().list_by_checkout("chk-1").await.unwrap();
        assert_eq!(batch.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), expected);

        let listed = db.orders().list_for_buyer("buyer-1", None).await.unwrap();
        assert_eq!(listed.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), expected);
    }

    #[tokio::test]
    async fn test_duplicate_reference_names_the_column() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();

        let first = sample_order(&item, "buyer-1", "chk-1", 1);
        let clash = sample_order(&item, "buyer-2", "chk-1", 1);
        db.orders().insert_batch(&[first]).await.unwrap();

        match db.orders().insert_batch(&[clash]).await {
            Err(DbError::UniqueViolation { entity, field }) => {
                assert_eq!(entity, "Order");
                assert_eq!(field, "reference");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_batch_is_all_or_nothing() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();

        let good = sample_order(&item, "buyer-1", "chk-1", 1);
        let mut dangling = sample_order(&item, "buyer-1", "chk-1", 2);
        dangling.item_id = "no-such-item".to_string();

        let err = db.orders().insert_batch(&[good.clone(), dangling]).await;
        assert!(matches!(err, Err(DbError::ForeignKeyViolation)));
        assert!(db.orders().get_by_id(&good.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_buyer_scoping_and_status_filter() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();

        let mine = sample_order(&item, "buyer-1", "chk-1", 1);
        let mut paid = sample_order(&item, "buyer-1", "chk-2", 1);
        paid.status = OrderStatus::Paid;
        let theirs = sample_order(&item, "buyer-2", "chk-3", 1);
        db.orders()
            .insert_batch(&[mine.clone(), paid.clone(), theirs.clone()])
            .await
            .unwrap();

        let all = db.orders().list_for_buyer("buyer-1", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_paid = db
            .orders()
            .list_for_buyer("buyer-1", Some(OrderStatus::Paid))
            .await
            .unwrap();
        assert_eq!(only_paid.len(), 1);
        assert_eq!(only_paid[0].id, paid.id);

        assert!(db
            .orders()
            .get_for_buyer(&theirs.id, "buyer-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_transition_compare_and_set() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();
        let order = sample_order(&item, "buyer-1", "chk-1", 1);
        db.orders().insert_batch(&[order.clone()]).await.unwrap();

        let now = Utc::now();
        let mut paid = order.clone();
        let transition = paid.mark_as_paid("txn_1", now).unwrap();
        db.orders().save_transition(&paid, transition.from).await.unwrap();

        // A second writer still holding the pending copy loses.
        let mut stale = order.clone();
        let transition = stale.cancel(None, now).unwrap();
        let err = db.orders().save_transition(&stale, transition.from).await;
        assert!(matches!(err, Err(DbError::Conflict { .. })));

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.transaction_id.as_deref(), Some("txn_1"));
    }

    #[tokio::test]
    async fn test_refund_columns_persist() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        db.items().insert(&item).await.unwrap();
        let mut order = sample_order(&item, "buyer-1", "chk-1", 1);
        order.status = OrderStatus::Delivered;
        db.orders().insert_batch(&[order.clone()]).await.unwrap();

        let transition = order
            .process_refund("damaged", Some(Money::from_cents(500)), Utc::now())
            .unwrap();
        db.orders().save_transition(&order, transition.from).await.unwrap();

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Refunded);
        assert_eq!(stored.refund_amount_cents, Some(500));
        assert_eq!(stored.refund_reason.as_deref(), Some("damaged"));
    }

    #[tokio::test]
    async fn test_save_transition_unknown_order() {
        let db = memory_db().await;
        let item = sample_item("BOOK-ATLAS", 2000, 10);
        let order = sample_order(&item, "buyer-1", "chk-1", 1);
        let err = db.orders().save_transition(&order, OrderStatus::Pending).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }
}
