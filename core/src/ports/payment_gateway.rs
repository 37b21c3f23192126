//! Payment gateway port (C7).

use crate::money::Money;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Outcome of a charge attempt. The port never throws for a declined card
/// or a validation error — those arrive as `success = false` with an
/// `error_message`. Only a transport-level failure becomes a `Result::Err`.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentResult {
    /// Whether the charge succeeded.
    pub success: bool,
    /// The gateway's PaymentIntent id, created regardless of outcome.
    pub payment_intent_id: String,
    /// The charge id, set only on success.
    pub charge_id: Option<String>,
    /// Amount actually charged.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Gateway-reported status string (e.g. `"succeeded"`, `"failed"`).
    pub status: String,
    /// Payment method label, if known.
    pub method: Option<String>,
    /// Operator-readable reason, set when `success` is `false`.
    pub error_message: Option<String>,
}

/// Category of an underlying gateway error, used for metrics and retry
/// decisions upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentErrorSource {
    /// The card itself was declined or invalid.
    Card,
    /// The gateway asked the caller to slow down.
    RateLimit,
    /// The request was malformed.
    InvalidRequest,
    /// Credentials were rejected.
    Authentication,
    /// A network-level failure; outcome unknown.
    Connection,
    /// Anything not covered above.
    Other,
}

/// Transport-level failure from a [`PaymentGateway`] call. The coordinator
/// treats this as an "unknown outcome" (§7), never as a definite decline.
#[derive(Error, Debug)]
pub enum PaymentGatewayError {
    /// The call never reached a definite outcome (timeout, connection
    /// reset, 5xx from the gateway's own infrastructure).
    #[error("payment gateway transport error ({source:?}): {detail}")]
    Transport {
        /// The error category.
        source: PaymentErrorSource,
        /// Operator-readable detail.
        detail: String,
    },
    /// The webhook signature did not match.
    #[error("invalid webhook signature")]
    InvalidSignature,
}

/// Port to a card-processing gateway (e.g. Stripe). Adapters wrap the
/// gateway's SDK in an asynchronous-safe interface: no synchronous
/// blocking may occur on the main dispatch path.
pub trait PaymentGateway: Send + Sync {
    /// Create and immediately confirm a charge.
    #[allow(clippy::too_many_arguments)]
    fn charge<'a>(
        &'a self,
        amount: Money,
        currency_code: &'a str,
        payment_method_id: &'a str,
        description: &'a str,
        metadata: &'a HashMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<PaymentResult, PaymentGatewayError>> + Send + 'a>>;

    /// Verify a webhook payload's HMAC signature and parse it into an
    /// event body.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentGatewayError::InvalidSignature`] on any mismatch.
    fn verify_webhook_signature<'a>(
        &'a self,
        payload: &'a [u8],
        signature: &'a str,
        secret: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, PaymentGatewayError>> + Send + 'a>>;
}
