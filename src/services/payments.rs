//! Payment gateway signature checks and payment verification.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{fmt, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    commands::{orders::VerifyPaymentCommand, Command},
    errors::ServiceError,
    events::EventSender,
    models::Order,
    repositories::Store,
};

type HmacSha256 = Hmac<Sha256>;

/// Checks `hex(HMAC_SHA256(key_secret, "{gateway_order_id}|{gateway_payment_id}"))`
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: Arc<str>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(key_secret: impl AsRef<str>) -> Self {
        Self {
            key_secret: Arc::from(key_secret.as_ref()),
        }
    }

    fn mac(&self, gateway_order_id: &str, gateway_payment_id: &str) -> Result<HmacSha256, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("invalid gateway key: {e}")))?;
        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(gateway_payment_id.as_bytes());
        Ok(mac)
    }

    /// Hex signature the gateway is expected to send.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> Result<String, ServiceError> {
        let mac = self.mac(gateway_order_id, gateway_payment_id)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison of `signature` against the expected value.
    pub fn verify(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError> {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return Ok(false);
        };
        let mac = self.mac(gateway_order_id, gateway_payment_id)?;
        Ok(mac.verify_slice(&provided).is_ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 128, message = "Gateway order id is required"))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, max = 128, message = "Gateway payment id is required"))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1, max = 256, message = "Signature is required"))]
    pub signature: String,
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
    verifier: SignatureVerifier,
}

impl PaymentService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>, verifier: SignatureVerifier) -> Self {
        Self {
            store,
            event_sender,
            verifier,
        }
    }

    /// Verifies a gateway callback for an online order.
    #[instrument(skip(self, request), fields(gateway_order_id = %request.gateway_order_id))]
    pub async fn verify_payment(
        &self,
        order_id: Uuid,
        request: VerifyPaymentRequest,
        actor: AuthUser,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        VerifyPaymentCommand {
            order_id,
            gateway_order_id: request.gateway_order_id,
            gateway_payment_id: request.gateway_payment_id,
            signature: request.signature,
            actor,
            verifier: self.verifier.clone(),
        }
        .execute(self.store.clone(), self.event_sender.clone())
        .await
    }
}
