use crate::domain::money::Amount;
use crate::domain::ports::{
    CheckoutEvent, CheckoutEventKind, CheckoutPurpose, CheckoutSession, PaymentGateway,
};
use crate::domain::{OrderId, UserId};
use crate::error::MarketError;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};

type HmacSha256 = Hmac<Sha256>;

/// The one event type the engine acts on, mirroring the hosted-checkout flow
/// of card processors.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Serialize, Deserialize)]
struct WirePayload {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<WireMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireMetadata {
    OrderPayment { order_id: OrderId },
    WalletTopUp { user_id: UserId, amount: Decimal },
}

/// Reference `PaymentGateway`: HMAC-SHA-256 signatures over the raw body,
/// hex-encoded, and JSON payloads in the wire shape above.
///
/// Used by the replay CLI and the test suites; a production deployment
/// implements `PaymentGateway` against its processor's SDK instead.
pub struct HmacGateway {
    secret: Vec<u8>,
    counter: AtomicU64,
}

impl HmacGateway {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Hex HMAC-SHA-256 of the body, as a provider would place in the
    /// signature header.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify(&self, body: &[u8], signature: &str) -> Result<(), MarketError> {
        let claimed = hex::decode(signature)
            .map_err(|_| MarketError::Signature("malformed signature header".to_string()))?;
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(body);
        mac.verify_slice(&claimed)
            .map_err(|_| MarketError::Signature("signature mismatch".to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HmacGateway {
    async fn create_checkout(
        &self,
        _amount: Amount,
        _currency: &str,
        _purpose: CheckoutPurpose,
    ) -> Result<CheckoutSession, MarketError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("cs_{n:08}");
        let url = format!("https://pay.invalid/checkout/{id}");
        Ok(CheckoutSession { id, url })
    }

    fn verify_and_decode(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> Result<CheckoutEvent, MarketError> {
        self.verify(raw_body, signature)?;
        let payload: WirePayload = serde_json::from_slice(raw_body)
            .map_err(|e| MarketError::Signature(format!("malformed payload: {e}")))?;

        if payload.event_type != CHECKOUT_COMPLETED {
            return Ok(CheckoutEvent {
                reference: payload.id,
                kind: CheckoutEventKind::Ignored,
            });
        }
        let kind = match payload.metadata {
            Some(WireMetadata::OrderPayment { order_id }) => {
                CheckoutEventKind::OrderPaid { order_id }
            }
            Some(WireMetadata::WalletTopUp { user_id, amount }) => {
                let amount = Amount::new(amount).map_err(|_| {
                    MarketError::Signature("non-positive top-up amount".to_string())
                })?;
                CheckoutEventKind::WalletTopUp { user_id, amount }
            }
            None => CheckoutEventKind::Ignored,
        };
        Ok(CheckoutEvent {
            reference: payload.id,
            kind,
        })
    }
}

/// Serialized event body for an order payment, as the provider would post it.
pub fn order_paid_payload(reference: &str, order_id: OrderId) -> Vec<u8> {
    serde_json::to_vec(&WirePayload {
        id: reference.to_string(),
        event_type: CHECKOUT_COMPLETED.to_string(),
        metadata: Some(WireMetadata::OrderPayment { order_id }),
    })
    .expect("payload serializes")
}

/// Serialized event body for a wallet top-up.
pub fn wallet_topup_payload(reference: &str, user_id: UserId, amount: Decimal) -> Vec<u8> {
    serde_json::to_vec(&WirePayload {
        id: reference.to_string(),
        event_type: CHECKOUT_COMPLETED.to_string(),
        metadata: Some(WireMetadata::WalletTopUp { user_id, amount }),
    })
    .expect("payload serializes")
}
