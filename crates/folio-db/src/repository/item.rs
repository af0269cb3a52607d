//! # Item Repository
//!
//! Catalogue lookups and the per-item stock operations the ledger is built on.
//!
//! ## Conditional Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (two checkouts both see stock = 1)          │
//! │     SELECT stock FROM items WHERE id = ?      → 1                      │
//! │     UPDATE items SET stock = 0 WHERE id = ?                            │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional statement                                 │
//! │     UPDATE items SET stock = stock - ?2                                │
//! │     WHERE id = ?1 AND is_active = 1 AND stock >= ?2                    │
//! │                                                                         │
//! │  rows_affected = 1 → reserved                                          │
//! │  rows_affected = 0 → rejected, nothing changed                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use folio_core::Item;

const ITEM_COLUMNS: &str =
    "id, sku, title, price_cents, stock, is_active, created_at, updated_at";

/// Repository for item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets several items in one query. Unknown ids are simply absent.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM items WHERE id IN (", ITEM_COLUMNS));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let items = query.build_query_as::<Item>().fetch_all(&self.pool).await?;

        debug!(requested = ids.len(), found = items.len(), "Loaded items");
        Ok(items)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE sku = ?1",
            ITEM_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new item.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, item: &Item) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, sku, title, price_cents, stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sku)
        .bind(&item.title)
        .bind(item.price_cents)
        .bind(item.stock)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current stock level, `None` for an unknown item.
    pub async fn stock_of(&self, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    /// Atomically takes `quantity` units if the item is active and has them.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - inactive, unknown, or not enough stock; nothing changed
    pub async fn reserve_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET
                stock = stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND is_active = 1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let reserved = result.rows_affected() == 1;
        debug!(id = %id, quantity, reserved, "Reserve stock");
        Ok(reserved)
    }

    /// Puts `quantity` units back. Active flag is irrelevant here.
    pub async fn release_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET
                stock = stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        debug!(id = %id, quantity, "Released stock");
        Ok(())
    }

    /// Soft-deletes an item: it stays on past orders but cannot be bought.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE items SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Counts active items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, sample_item as item};

    async fn repo() -> ItemRepository {
        memory_db().await.items()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let atlas = item("BOOK-ATLAS", 2000, 5);
        repo.insert(&atlas).await.unwrap();

        let found = repo.get_by_id(&atlas.id).await.unwrap().unwrap();
        assert_eq!(found.sku, "BOOK-ATLAS");
        assert_eq!(found.stock, 5);
        assert!(found.is_active);

        let by_sku = repo.get_by_sku("BOOK-ATLAS").await.unwrap().unwrap();
        assert_eq!(by_sku.id, atlas.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let repo = repo().await;
        repo.insert(&item("POSTER-1", 900, 1)).await.unwrap();
        let err = repo.insert(&item("POSTER-1", 900, 1)).await.unwrap_err();
        match &err {
            DbError::UniqueViolation { entity, field } => {
                assert_eq!(entity, "Item");
                assert_eq!(field, "sku");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "Item with this sku already exists");
    }

    #[tokio::test]
    async fn test_stock_below_zero_is_reported_as_underflow() {
        let repo = repo().await;
        let atlas = item("BOOK-ATLAS", 2000, 1);
        repo.insert(&atlas).await.unwrap();

        // Bypasses the conditional reserve on purpose.
        let err: DbError = sqlx::query("UPDATE items SET stock = stock - 2 WHERE id = ?1")
            .bind(&atlas.id)
            .execute(&repo.pool)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::StockUnderflow));
        assert_eq!(repo.stock_of(&atlas.id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let repo = repo().await;
        let a = item("A", 100, 1);
        let b = item("B", 200, 1);
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();

        let found = repo
            .get_many(&[a.id.clone(), "nope".to_string(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_reserve_is_conditional() {
        let repo = repo().await;
        let atlas = item("BOOK-ATLAS", 2000, 3);
        repo.insert(&atlas).await.unwrap();

        assert!(repo.reserve_stock(&atlas.id, 2).await.unwrap());
        assert!(!repo.reserve_stock(&atlas.id, 2).await.unwrap());
        assert_eq!(repo.stock_of(&atlas.id).await.unwrap(), Some(1));

        repo.release_stock(&atlas.id, 2).await.unwrap();
        assert_eq!(repo.stock_of(&atlas.id).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_inactive_item_cannot_be_reserved() {
        let repo = repo().await;
        let atlas = item("BOOK-ATLAS", 2000, 3);
        repo.insert(&atlas).await.unwrap();
        repo.deactivate(&atlas.id).await.unwrap();

        assert!(!repo.reserve_stock(&atlas.id, 1).await.unwrap());
        assert_eq!(repo.stock_of(&atlas.id).await.unwrap(), Some(3));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_release_unknown_item_fails() {
        let repo = repo().await;
        let err = repo.release_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
