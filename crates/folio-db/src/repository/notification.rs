//! # Notification Repository
//!
//! In-app notifications written by the fulfillment worker, read by buyers
//! and administrators.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use folio_core::{Notification, NotificationAudience, NotificationKind};

const NOTIFICATION_COLUMNS: &str =
    "id, recipient, audience, kind, order_id, title, message, is_read, created_at";

/// What to store; id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: String,
    pub audience: NotificationAudience,
    pub kind: NotificationKind,
    pub order_id: String,
    pub title: String,
    pub message: String,
}

/// Repository for notification database operations.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    pub async fn insert(&self, new: NewNotification) -> DbResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            recipient: new.recipient,
            audience: new.audience,
            kind: new.kind,
            order_id: new.order_id,
            title: new.title,
            message: new.message,
            is_read: false,
            created_at: Utc::now(),
        };

        debug!(
            recipient = %notification.recipient,
            order_id = %notification.order_id,
            kind = ?notification.kind,
            "Storing notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient, audience, kind, order_id, title, message, is_read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.recipient)
        .bind(notification.audience)
        .bind(notification.kind)
        .bind(&notification.order_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Newest first.
    pub async fn list_for_recipient(&self, recipient: &str) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE recipient = ?1 ORDER BY created_at DESC, rowid DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE order_id = ?1 ORDER BY created_at ASC, rowid ASC",
            NOTIFICATION_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
