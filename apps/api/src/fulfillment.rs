//! # Fulfillment Notifier
//!
//! Best-effort side effects of order creation and lifecycle changes.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fulfillment Pipeline                                 │
//! │                                                                         │
//! │  checkout / lifecycle service                                          │
//! │       │  notifier.dispatch(event)    try_send, never awaits            │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────┐                                       │
//! │  │ bounded mpsc queue          │  full or closed → warn!, dropped      │
//! │  └──────────────┬──────────────┘                                       │
//! │                 ▼                                                       │
//! │  FulfillmentWorker (own task)                                          │
//! │  ├── OrderPlaced                                                       │
//! │  │     ├── per order: buyer "order placed" notification                │
//! │  │     ├── per order: admin "new order" notification                   │
//! │  │     └── per checkout: one receipt through the Mailer                │
//! │  └── StatusChanged                                                     │
//! │        └── buyer "status changed" notification                         │
//! │                                                                         │
//! │  Every failure is logged with error! and then forgotten: the order     │
//! │  is already committed and the HTTP response already sent.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use folio_core::{Money, NotificationAudience, NotificationKind, Order, OrderStatus, OrderTotals};
use folio_db::{DbError, NewNotification, NotificationRepository};

// =============================================================================
// Events
// =============================================================================

/// Work item for the fulfillment worker.
#[derive(Debug, Clone)]
pub enum FulfillmentEvent {
    /// A checkout committed these orders (one per line, same checkout id).
    OrderPlaced {
        orders: Vec<Order>,
        totals: OrderTotals,
    },

    /// A persisted lifecycle transition.
    StatusChanged { order: Order, from: OrderStatus },
}

impl FulfillmentEvent {
    fn label(&self) -> &'static str {
        match self {
            FulfillmentEvent::OrderPlaced { .. } => "order_placed",
            FulfillmentEvent::StatusChanged { .. } => "status_changed",
        }
    }
}

// =============================================================================
// Collaborators
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers in-app notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<(), FulfillmentError>;
}

/// Sends receipt emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_receipt(&self, receipt: &Receipt) -> Result<(), FulfillmentError>;
}

/// Stores notifications in the `notifications` table.
#[derive(Debug, Clone)]
pub struct StoredNotifier {
    notifications: NotificationRepository,
}

impl StoredNotifier {
    pub fn new(notifications: NotificationRepository) -> Self {
        StoredNotifier { notifications }
    }
}

#[async_trait]
impl Notifier for StoredNotifier {
    async fn notify(&self, notification: NewNotification) -> Result<(), FulfillmentError> {
        self.notifications.insert(notification).await?;
        Ok(())
    }
}

/// Renders receipts into the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_receipt(&self, receipt: &Receipt) -> Result<(), FulfillmentError> {
        info!(
            checkout_id = %receipt.checkout_id,
            buyer_id = %receipt.buyer_id,
            receipt = %receipt.render(),
            "Receipt email"
        );
        Ok(())
    }
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub reference: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub amount: Money,
}

/// One receipt per checkout, listing every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub checkout_id: String,
    pub buyer_id: String,
    pub currency: String,
    pub lines: Vec<ReceiptLine>,
    pub totals: OrderTotals,
    pub shipping_address: String,
}

impl Receipt {
    /// Builds the receipt for a checkout. `None` for an empty batch.
    pub fn for_checkout(orders: &[Order], totals: OrderTotals) -> Option<Self> {
        let first = orders.first()?;
        Some(Receipt {
            checkout_id: first.checkout_id.clone(),
            buyer_id: first.buyer_id.clone(),
            currency: first.currency.clone(),
            lines: orders
                .iter()
                .map(|o| ReceiptLine {
                    reference: o.reference.clone(),
                    title: o.item_title.clone(),
                    quantity: o.quantity,
                    unit_price: o.unit_price(),
                    amount: o.final_amount(),
                })
                .collect(),
            totals,
            shipping_address: first.shipping_address.one_line(),
        })
    }

    /// Plain-text body.
    pub fn render(&self) -> String {
        let mut text = format!("Receipt for checkout {}\n", self.checkout_id);
        for line in &self.lines {
            text.push_str(&format!(
                "  {}  {} x {} @ {} = {}\n",
                line.reference,
                line.quantity,
                line.title,
                line.unit_price.format_in(&self.currency),
                line.amount.format_in(&self.currency),
            ));
        }
        text.push_str(&format!(
            "Subtotal: {}\n",
            self.totals.subtotal.format_in(&self.currency)
        ));
        text.push_str(&format!("Tax: {}\n", self.totals.tax.format_in(&self.currency)));
        text.push_str(&format!(
            "Shipping: {}\n",
            self.totals.shipping_fee.format_in(&self.currency)
        ));
        text.push_str(&format!(
            "Total: {}\n",
            self.totals.final_total.format_in(&self.currency)
        ));
        text.push_str(&format!("Ship to: {}\n", self.shipping_address));
        text
    }
}

// =============================================================================
// Notifier Handle
// =============================================================================

/// Cloneable sending side of the fulfillment queue.
#[derive(Debug, Clone)]
pub struct FulfillmentNotifier {
    tx: mpsc::Sender<FulfillmentEvent>,
}

impl FulfillmentNotifier {
    /// Queues `event` without waiting. Returns whether it was queued.
    pub fn dispatch(&self, event: FulfillmentEvent) -> bool {
        let label = event.label();
        match self.tx.try_send(event) {
            Ok(()) => {
                debug!(event = label, "Fulfillment event queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = label, "Fulfillment queue full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event = label, "Fulfillment worker stopped, event dropped");
                false
            }
        }
    }
}

/// Handle for stopping a running worker.
#[derive(Debug, Clone)]
pub struct FulfillmentHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl FulfillmentHandle {
    /// Asks the worker to drain what is queued and stop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Consumes fulfillment events in its own task.
pub struct FulfillmentWorker {
    rx: mpsc::Receiver<FulfillmentEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    notifier: Arc<dyn Notifier>,
    mailer: Arc<dyn Mailer>,
    admin_recipient: String,
}

impl FulfillmentWorker {
    /// Creates the worker together with its sending handle and shutdown handle.
    pub fn new(
        capacity: usize,
        notifier: Arc<dyn Notifier>,
        mailer: Arc<dyn Mailer>,
        admin_recipient: impl Into<String>,
    ) -> (Self, FulfillmentNotifier, FulfillmentHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = FulfillmentWorker {
            rx,
            shutdown_rx,
            notifier,
            mailer,
            admin_recipient: admin_recipient.into(),
        };

        (
            worker,
            FulfillmentNotifier { tx },
            FulfillmentHandle { shutdown_tx },
        )
    }

    /// Runs until shutdown is requested or every sender is gone.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Fulfillment worker started");

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },

                _ = self.shutdown_rx.recv() => {
                    info!("Fulfillment worker shutting down");
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.handle(event).await;
                    }
                    break;
                }
            }
        }

        info!("Fulfillment worker stopped");
    }

    async fn handle(&self, event: FulfillmentEvent) {
        match event {
            FulfillmentEvent::OrderPlaced { orders, totals } => {
                self.order_placed(&orders, totals).await
            }
            FulfillmentEvent::StatusChanged { order, from } => {
                self.status_changed(&order, from).await
            }
        }
    }

    async fn order_placed(&self, orders: &[Order], totals: OrderTotals) {
        for order in orders {
            let total = order.final_amount().format_in(&order.currency);

            self.deliver(NewNotification {
                recipient: order.buyer_id.clone(),
                audience: NotificationAudience::Buyer,
                kind: NotificationKind::OrderPlaced,
                order_id: order.id.clone(),
                title: format!("Order {} placed", order.reference),
                message: format!(
                    "{} x {} is confirmed. Total {}.",
                    order.quantity, order.item_title, total
                ),
            })
            .await;

            self.deliver(NewNotification {
                recipient: self.admin_recipient.clone(),
                audience: NotificationAudience::Admin,
                kind: NotificationKind::NewOrder,
                order_id: order.id.clone(),
                title: format!("New order {}", order.reference),
                message: format!(
                    "{} x {} for {} ({}, {})",
                    order.quantity, order.item_title, total, order.payment_method, order.status
                ),
            })
            .await;
        }

        if let Some(receipt) = Receipt::for_checkout(orders, totals) {
            if let Err(e) = self.mailer.send_receipt(&receipt).await {
                error!(checkout_id = %receipt.checkout_id, error = %e, "Failed to send receipt");
            }
        }
    }

    async fn status_changed(&self, order: &Order, from: OrderStatus) {
        self.deliver(NewNotification {
            recipient: order.buyer_id.clone(),
            audience: NotificationAudience::Buyer,
            kind: NotificationKind::OrderStatusChanged,
            order_id: order.id.clone(),
            title: format!("Order {} is now {}", order.reference, order.status),
            message: format!(
                "{} x {} moved from {} to {}.",
                order.quantity, order.item_title, from, order.status
            ),
        })
        .await;
    }

    async fn deliver(&self, notification: NewNotification) {
        let order_id = notification.order_id.clone();
        let kind = notification.kind;
        if let Err(e) = self.notifier.notify(notification).await {
            error!(order_id = %order_id, kind = ?kind, error = %e, "Failed to deliver notification");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
