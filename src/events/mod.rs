use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{CancelReason, ItemStatus, OrderStatus};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events published after a state change has been committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    OrderItemStatusChanged {
        order_id: Uuid,
        item_id: Uuid,
        old_status: ItemStatus,
        new_status: ItemStatus,
    },
    OrderItemCancelled {
        order_id: Uuid,
        item_id: Uuid,
        reason: CancelReason,
    },

    // Return events
    ReturnRequested { order_id: Uuid, item_id: Uuid },
    ReturnApproved { order_id: Uuid, item_id: Uuid },
    ReturnRejected { order_id: Uuid, item_id: Uuid },

    // Payment events
    PaymentCaptured {
        order_id: Uuid,
        payment_reference: String,
    },
    PaymentFailed(Uuid),
    PaymentRefunded { order_id: Uuid, amount: Decimal },

    // Catalog events
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    StockRestored { product_id: Uuid, quantity: u32 },

    // Promotion events
    CouponCreated(Uuid),
    CouponUpdated(Uuid),
    CouponDeleted(Uuid),
    CouponRedeemed { coupon_id: Uuid, customer_id: Uuid },
    OfferCreated(Uuid),
    OfferUpdated(Uuid),
    OfferDeleted(Uuid),
}

impl Event {
    /// Short name used as the log field for the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderPlaced { .. } => "order_placed",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::OrderItemStatusChanged { .. } => "order_item_status_changed",
            Event::OrderItemCancelled { .. } => "order_item_cancelled",
            Event::ReturnRequested { .. } => "return_requested",
            Event::ReturnApproved { .. } => "return_approved",
            Event::ReturnRejected { .. } => "return_rejected",
            Event::PaymentCaptured { .. } => "payment_captured",
            Event::PaymentFailed(_) => "payment_failed",
            Event::PaymentRefunded { .. } => "payment_refunded",
            Event::CategoryCreated(_) => "category_created",
            Event::CategoryUpdated(_) => "category_updated",
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::StockRestored { .. } => "stock_restored",
            Event::CouponCreated(_) => "coupon_created",
            Event::CouponUpdated(_) => "coupon_updated",
            Event::CouponDeleted(_) => "coupon_deleted",
            Event::CouponRedeemed { .. } => "coupon_redeemed",
            Event::OfferCreated(_) => "offer_created",
            Event::OfferUpdated(_) => "offer_updated",
            Event::OfferDeleted(_) => "offer_deleted",
        }
    }
}

/// Creates the event channel with the given capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPlaced {
                order_id,
                customer_id,
                total,
            } => {
                info!(event = event.name(), %order_id, %customer_id, %total, "Order placed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    event = event.name(),
                    %order_id,
                    %old_status,
                    %new_status,
                    "Order status changed"
                );
            }
            Event::OrderItemStatusChanged {
                order_id,
                item_id,
                old_status,
                new_status,
            } => {
                info!(
                    event = event.name(),
                    %order_id,
                    %item_id,
                    %old_status,
                    %new_status,
                    "Order item status changed"
                );
            }
            Event::PaymentFailed(order_id) => {
                warn!(event = event.name(), %order_id, "Payment verification failed");
            }
            Event::PaymentRefunded { order_id, amount } => {
                info!(event = event.name(), %order_id, %amount, "Payment refunded");
            }
            other => {
                info!(event = other.name(), payload = ?other, "Domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}
