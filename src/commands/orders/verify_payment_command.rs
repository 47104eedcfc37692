use crate::{
    auth::AuthUser,
    commands::{ensure_order_owner, Command},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{Order, OrderStatus, PaymentMethod, PaymentStatus},
    repositories::Store,
    services::payments::SignatureVerifier,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Confirms an online payment from the gateway's signed callback.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub actor: AuthUser,
    pub verifier: SignatureVerifier,
}

enum Verification {
    Captured { order: Order, refunded: Decimal },
    Rejected,
}

#[async_trait::async_trait]
impl Command for VerifyPaymentCommand {
    type Result = Order;

    #[instrument(skip(self, store, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        store: Arc<Store>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let now = Utc::now();
        let outcome = store.orders.update(self.order_id, |order| {
            ensure_order_owner(order, &self.actor)?;
            if order.payment_method != PaymentMethod::Online {
                return Err(ServiceError::InvalidOperation(format!(
                    "order {} is cash on delivery",
                    order.order_number
                )));
            }
            if !matches!(
                order.payment_status,
                PaymentStatus::Pending | PaymentStatus::Failed
            ) {
                return Err(ServiceError::Conflict(format!(
                    "order {} payment is already {}",
                    order.order_number, order.payment_status
                )));
            }
            if order.status == OrderStatus::Cancelled {
                return Err(ServiceError::Conflict(format!(
                    "order {} is cancelled and cannot be paid",
                    order.order_number
                )));
            }
            if order.gateway_order_id.as_deref() != Some(self.gateway_order_id.as_str()) {
                return Err(ServiceError::BadRequest(
                    "gateway order id does not match this order".to_string(),
                ));
            }

            order.updated_at = now;
            if self
                .verifier
                .verify(&self.gateway_order_id, &self.gateway_payment_id, &self.signature)?
            {
                order.payment_reference = Some(self.gateway_payment_id.clone());
                let refunded = order.settle_payment();
                Ok(Verification::Captured {
                    order: order.clone(),
                    refunded,
                })
            } else {
                order.payment_status = PaymentStatus::Failed;
                Ok(Verification::Rejected)
            }
        })?;

        match outcome {
            Verification::Captured { order, refunded } => {
                info!(
                    order_id = %self.order_id,
                    payment_id = %self.gateway_payment_id,
                    refunded = %refunded,
                    "Payment captured"
                );
                event_sender
                    .send_or_log(Event::PaymentCaptured {
                        order_id: self.order_id,
                        payment_reference: self.gateway_payment_id.clone(),
                    })
                    .await;
                if refunded > Decimal::ZERO {
                    event_sender
                        .send_or_log(Event::PaymentRefunded {
                            order_id: self.order_id,
                            amount: refunded,
                        })
                        .await;
                }
                Ok(order)
            }
            Verification::Rejected => {
                warn!(order_id = %self.order_id, "Payment signature mismatch");
                event_sender
                    .send_or_log(Event::PaymentFailed(self.order_id))
                    .await;
                Err(ServiceError::PaymentFailed(
                    "payment signature could not be verified".to_string(),
                ))
            }
        }
    }
}
