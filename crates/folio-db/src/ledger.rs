//! # Stock Ledger
//!
//! All-or-nothing stock reservation for a whole cart.
//!
//! ## Two-Phase Reservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    reserve_all([Atlas ×2, Poster ×1, Ebook ×4])         │
//! │                                                                         │
//! │  PHASE 1: reserve each item with one conditional UPDATE                │
//! │     Atlas  ×2  ✓ taken                                                 │
//! │     Poster ×1  ✓ taken                                                 │
//! │     Ebook  ×4  ✗ stock = 3                                             │
//! │                                                                         │
//! │  PHASE 2: release everything already taken                             │
//! │     Atlas  +2                                                          │
//! │     Poster +1                                                          │
//! │                                                                         │
//! │  → Err(Rejected(InsufficientStock { Ebook, available 3, requested 4 }))│
//! │    stock snapshot after == stock snapshot before                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On success the caller owns a [`ReservationSet`]. If a later step of the
//! checkout fails (persisting the orders), the caller hands it back to
//! [`StockLedger::release_all`].

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::item::ItemRepository;
use folio_core::{CoreError, Order, ValidationError};

// =============================================================================
// Types
// =============================================================================

/// One (item, quantity) request against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRequest {
    pub item_id: String,
    pub quantity: i64,
}

impl StockRequest {
    pub fn new(item_id: impl Into<String>, quantity: i64) -> Self {
        StockRequest {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Units taken from one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub item_id: String,
    pub quantity: i64,
}

/// Everything one `reserve_all` call took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "reservations must be kept or released"]
pub struct ReservationSet {
    reservations: Vec<Reservation>,
}

impl ReservationSet {
    /// The units held by an order that is being cancelled.
    pub fn for_order(order: &Order) -> Self {
        ReservationSet {
            reservations: vec![Reservation {
                item_id: order.item_id.clone(),
                quantity: order.quantity,
            }],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.iter()
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Units reserved for `item_id`, 0 if none.
    pub fn quantity_of(&self, item_id: &str) -> i64 {
        self.reservations
            .iter()
            .filter(|r| r.item_id == item_id)
            .map(|r| r.quantity)
            .sum()
    }
}

/// Why a batch could not be reserved.
#[derive(Debug, Error)]
pub enum StockError {
    /// Business rejection, typically `InsufficientStock`.
    #[error(transparent)]
    Rejected(CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

// =============================================================================
// Ledger
// =============================================================================

/// Two-phase stock reservation over [`ItemRepository`].
#[derive(Debug, Clone)]
pub struct StockLedger {
    items: ItemRepository,
}

impl StockLedger {
    pub fn new(items: ItemRepository) -> Self {
        StockLedger { items }
    }

    /// Reserves every request or none of them.
    ///
    /// Duplicate item ids are merged first (quantities summed, first
    /// occurrence keeps its position).
    ///
    /// ## Returns
    /// * `Ok(ReservationSet)` - every item decremented
    /// * `Err(StockError::Rejected)` - an item was inactive, unknown or short;
    ///   nothing remains decremented
    /// * `Err(StockError::Db)` - the database failed; reservations already
    ///   taken were released
    pub async fn reserve_all(&self, requests: &[StockRequest]) -> Result<ReservationSet, StockError> {
        let merged = merge_requests(requests)?;
        let mut taken = ReservationSet::default();

        for request in &merged {
            let reserved = match self
                .items
                .reserve_stock(&request.item_id, request.quantity)
                .await
            {
                Ok(reserved) => reserved,
                Err(e) => {
                    self.compensate(taken).await;
                    return Err(StockError::Db(e));
                }
            };

            if !reserved {
                let rejection = self.rejection_for(request).await;
                self.compensate(taken).await;
                return Err(rejection);
            }

            taken.reservations.push(Reservation {
                item_id: request.item_id.clone(),
                quantity: request.quantity,
            });
        }

        debug!(items = taken.len(), "Reserved stock");
        Ok(taken)
    }

    /// Puts every reservation back.
    ///
    /// Every reservation is attempted even if one fails; the first failure
    /// is returned.
    pub async fn release_all(&self, reservations: ReservationSet) -> DbResult<()> {
        let mut first_error = None;

        for reservation in reservations.reservations {
            if let Err(e) = self
                .items
                .release_stock(&reservation.item_id, reservation.quantity)
                .await
            {
                error!(
                    item_id = %reservation.item_id,
                    quantity = reservation.quantity,
                    error = %e,
                    "Failed to release stock"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Releases after a failure. The release outcome is only logged so the
    /// original error reaches the caller.
    async fn compensate(&self, taken: ReservationSet) {
        if taken.is_empty() {
            return;
        }
        let count = taken.len();
        if self.release_all(taken).await.is_ok() {
            info!(released = count, "Compensating release complete");
        }
    }

    /// Builds the `InsufficientStock` error from the item as it is now.
    async fn rejection_for(&self, request: &StockRequest) -> StockError {
        match self.items.get_by_id(&request.item_id).await {
            Ok(Some(item)) => {
                let available = if item.is_active { item.stock } else { 0 };
                warn!(
                    item_id = %item.id,
                    available,
                    requested = request.quantity,
                    "Stock reservation rejected"
                );
                StockError::Rejected(CoreError::InsufficientStock {
                    item_id: item.id,
                    name: item.title,
                    available,
                    requested: request.quantity,
                })
            }
            Ok(None) => StockError::Rejected(CoreError::ItemNotFound(request.item_id.clone())),
            Err(e) => StockError::Db(e),
        }
    }
}

fn merge_requests(requests: &[StockRequest]) -> Result<Vec<StockRequest>, StockError> {
    let mut merged: Vec<StockRequest> = Vec::with_capacity(requests.len());

    for request in requests {
        if request.quantity <= 0 {
            return Err(StockError::Rejected(CoreError::Validation(
                ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                },
            )));
        }
        match merged.iter_mut().find(|m| m.item_id == request.item_id) {
            Some(existing) => existing.quantity += request.quantity,
            None => merged.push(request.clone()),
        }
    }

    Ok(merged)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{file_db, memory_db, sample_item};
    use crate::Database;

    async fn stocked(db: &Database, sku: &str, stock: i64) -> String {
        let item = sample_item(sku, 1000, stock);
        db.items().insert(&item).await.unwrap();
        item.id
    }

    #[test]
    fn test_merge_keeps_first_occurrence_order() {
        let merged = merge_requests(&[
            StockRequest::new("b", 1),
            StockRequest::new("a", 2),
            StockRequest::new("b", 3),
        ])
        .unwrap();
        assert_eq!(merged, vec![StockRequest::new("b", 4), StockRequest::new("a", 2)]);
    }

    #[test]
    fn test_merge_rejects_non_positive_quantity() {
        let err = merge_requests(&[StockRequest::new("a", 0)]).unwrap_err();
        assert!(matches!(
            err,
            StockError::Rejected(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reserve_all_decrements_every_item() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 5).await;
        let poster = stocked(&db, "POSTER-1", 2).await;

        let set = db
            .ledger()
            .reserve_all(&[StockRequest::new(&atlas, 3), StockRequest::new(&poster, 2)])
            .await
            .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.quantity_of(&atlas), 3);
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(2));
        assert_eq!(db.items().stock_of(&poster).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_stock_untouched() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 5).await;
        let poster = stocked(&db, "POSTER-1", 2).await;
        let ebook = stocked(&db, "EBOOK-1", 3).await;

        let err = db
            .ledger()
            .reserve_all(&[
                StockRequest::new(&atlas, 2),
                StockRequest::new(&poster, 1),
                StockRequest::new(&ebook, 4),
            ])
            .await
            .unwrap_err();

        match err {
            StockError::Rejected(CoreError::InsufficientStock {
                item_id,
                name,
                available,
                requested,
            }) => {
                assert_eq!(item_id, ebook);
                assert_eq!(name, "Title EBOOK-1");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(5));
        assert_eq!(db.items().stock_of(&poster).await.unwrap(), Some(2));
        assert_eq!(db.items().stock_of(&ebook).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_duplicates_are_checked_against_combined_quantity() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 3).await;

        let err = db
            .ledger()
            .reserve_all(&[StockRequest::new(&atlas, 2), StockRequest::new(&atlas, 2)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StockError::Rejected(CoreError::InsufficientStock { requested: 4, .. })
        ));
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_inactive_item_reports_zero_available() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 10).await;
        db.items().deactivate(&atlas).await.unwrap();

        let err = db
            .ledger()
            .reserve_all(&[StockRequest::new(&atlas, 1)])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StockError::Rejected(CoreError::InsufficientStock { available: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_release_all_restores_stock() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 5).await;

        let ledger = db.ledger();
        let set = ledger
            .reserve_all(&[StockRequest::new(&atlas, 4)])
            .await
            .unwrap();
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(1));

        ledger.release_all(set).await.unwrap();
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_oversell() {
        let db = memory_db().await;
        let atlas = stocked(&db, "BOOK-ATLAS", 4).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = db.ledger();
            let atlas = atlas.clone();
            handles.push(tokio::spawn(async move {
                ledger.reserve_all(&[StockRequest::new(atlas, 1)]).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StockError::Rejected(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 4);
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_racing_connections_never_oversell_file_database() {
        let (db, _dir) = file_db(8).await;
        let atlas = stocked(&db, "BOOK-ATLAS", 5).await;
        let poster = stocked(&db, "POSTER-1", 20).await;

        // Each cart needs one atlas, so at most five can win.
        let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(16));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = db.ledger();
            let barrier = barrier.clone();
            let (atlas, poster) = (atlas.clone(), poster.clone());
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .reserve_all(&[StockRequest::new(poster, 1), StockRequest::new(atlas, 1)])
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StockError::Rejected(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(db.items().stock_of(&atlas).await.unwrap(), Some(0));
        // Losers put their poster back.
        assert_eq!(db.items().stock_of(&poster).await.unwrap(), Some(15));
        db.close().await;
    }
}
