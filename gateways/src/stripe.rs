//! Stripe-backed [`PaymentGateway`].
//!
//! The charge flow creates and confirms a `PaymentIntent` in one call.
//! Only a genuine transport failure (connection refused, timeout, a 5xx
//! from Stripe's own edge) becomes [`PaymentGatewayError::Transport`]; a
//! declined card, an invalid request, a rate limit, or a bad API key all
//! come back from Stripe as an ordinary error response and are translated
//! into `PaymentResult { success: false, .. }` instead.

use hmac::{Hmac, Mac};
use rental_core::money::Money;
use rental_core::ports::{PaymentErrorSource, PaymentGateway, PaymentGatewayError, PaymentResult};
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// `StripePaymentGateway` talks to the Stripe REST API directly over
/// `reqwest` rather than a generated SDK, since the wire contract used here
/// (create-and-confirm a `PaymentIntent`, verify a webhook signature) is a
/// small, stable surface.
pub struct StripePaymentGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripePaymentGateway {
    /// Build a gateway against the live Stripe API, with a 20s request
    /// timeout matching the coordinator's payment-call deadline.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build, which
    /// only happens for a malformed TLS configuration baked into the binary.
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            secret_key: secret_key.into(),
            api_base: "https://api.stripe.com/v1".to_string(),
        }
    }

    /// Override the API base URL, for pointing at a mock server in tests.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn categorize_error(status: reqwest::StatusCode, body: &Value) -> (PaymentErrorSource, String) {
        let error_type = body
            .get("error")
            .and_then(|e| e.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("api_error");
        let message = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();

        let source = match error_type {
            "card_error" => PaymentErrorSource::Card,
            "rate_limit_error" => PaymentErrorSource::RateLimit,
            "invalid_request_error" => PaymentErrorSource::InvalidRequest,
            "authentication_error" => PaymentErrorSource::Authentication,
            _ if status.is_server_error() => PaymentErrorSource::Connection,
            _ => PaymentErrorSource::Other,
        };
        (source, message)
    }
}

impl PaymentGateway for StripePaymentGateway {
    fn charge<'a>(
        &'a self,
        amount: Money,
        currency_code: &'a str,
        payment_method_id: &'a str,
        description: &'a str,
        metadata: &'a HashMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<PaymentResult, PaymentGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                amount_cents = amount.cents(),
                currency_code,
                payment_method_id,
                "stripe charge started"
            );

            let mut params: Vec<(String, String)> = vec![
                ("amount".to_string(), amount.cents().to_string()),
                ("currency".to_string(), currency_code.to_lowercase()),
                ("payment_method".to_string(), payment_method_id.to_string()),
                ("description".to_string(), description.to_string()),
                ("confirm".to_string(), "true".to_string()),
                (
                    "automatic_payment_methods[enabled]".to_string(),
                    "true".to_string(),
                ),
                (
                    "automatic_payment_methods[allow_redirects]".to_string(),
                    "never".to_string(),
                ),
            ];
            for (key, value) in metadata {
                params.push((format!("metadata[{key}]"), value.clone()));
            }

            let response = self
                .client
                .post(format!("{}/payment_intents", self.api_base))
                .basic_auth(&self.secret_key, Some(""))
                .form(&params)
                .send()
                .await
                .map_err(|err| PaymentGatewayError::Transport {
                    source: PaymentErrorSource::Connection,
                    detail: err.to_string(),
                })?;

            let status = response.status();
            let body: Value = response.json().await.map_err(|err| PaymentGatewayError::Transport {
                source: PaymentErrorSource::Connection,
                detail: format!("failed to decode stripe response: {err}"),
            })?;

            if !status.is_success() {
                if status.is_server_error() {
                    tracing::warn!(%status, "stripe returned a server error");
                    return Err(PaymentGatewayError::Transport {
                        source: PaymentErrorSource::Connection,
                        detail: format!("stripe responded with {status}"),
                    });
                }

                let (source, message) = Self::categorize_error(status, &body);
                tracing::warn!(?source, message, "stripe declined the charge");
                return Ok(PaymentResult {
                    success: false,
                    payment_intent_id: String::new(),
                    charge_id: None,
                    amount,
                    currency_code: currency_code.to_string(),
                    status: "failed".to_string(),
                    method: None,
                    error_message: Some(message),
                });
            }

            let intent_id = body.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
            let intent_status = body.get("status").and_then(Value::as_str).unwrap_or("unknown").to_string();

            if intent_status == "succeeded" {
                let charge_id = body
                    .get("latest_charge")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let method = body
                    .get("payment_method")
                    .and_then(Value::as_str)
                    .map(|_| "card".to_string());

                tracing::info!(payment_intent_id = intent_id, "stripe payment intent succeeded");
                Ok(PaymentResult {
                    success: true,
                    payment_intent_id: intent_id,
                    charge_id,
                    amount,
                    currency_code: currency_code.to_string(),
                    status: intent_status,
                    method,
                    error_message: None,
                })
            } else {
                tracing::warn!(payment_intent_id = intent_id, status = intent_status, "stripe payment intent not succeeded");
                Ok(PaymentResult {
                    success: false,
                    payment_intent_id: intent_id,
                    charge_id: None,
                    amount,
                    currency_code: currency_code.to_string(),
                    status: intent_status.clone(),
                    method: None,
                    error_message: Some(format!("payment status: {intent_status}")),
                })
            }
        })
    }

    fn verify_webhook_signature<'a>(
        &'a self,
        payload: &'a [u8],
        signature: &'a str,
        secret: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, PaymentGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let mut timestamp = None;
            let mut v1 = None;
            for part in signature.split(',') {
                let mut kv = part.splitn(2, '=');
                match (kv.next(), kv.next()) {
                    (Some("t"), Some(value)) => timestamp = Some(value),
                    (Some("v1"), Some(value)) => v1 = Some(value),
                    _ => {}
                }
            }
            let (timestamp, v1) = match (timestamp, v1) {
                (Some(t), Some(v)) => (t, v),
                _ => return Err(PaymentGatewayError::InvalidSignature),
            };

            let signed_payload = format!("{timestamp}.{}", String::from_utf8_lossy(payload));
            let expected = hex::decode(v1).map_err(|_| PaymentGatewayError::InvalidSignature)?;

            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|_| PaymentGatewayError::InvalidSignature)?;
            mac.update(signed_payload.as_bytes());
            mac.verify_slice(&expected).map_err(|_| PaymentGatewayError::InvalidSignature)?;

            serde_json::from_slice(payload).map_err(|_| PaymentGatewayError::InvalidSignature)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_card_error_from_stripe_error_type() {
        let body = serde_json::json!({"error": {"type": "card_error", "message": "Your card was declined."}});
        let (source, message) = StripePaymentGateway::categorize_error(reqwest::StatusCode::PAYMENT_REQUIRED, &body);
        assert_eq!(source, PaymentErrorSource::Card);
        assert_eq!(message, "Your card was declined.");
    }

    #[test]
    fn categorizes_unknown_4xx_as_other() {
        let body = serde_json::json!({"error": {"type": "something_new", "message": "nope"}});
        let (source, _) = StripePaymentGateway::categorize_error(reqwest::StatusCode::BAD_REQUEST, &body);
        assert_eq!(source, PaymentErrorSource::Other);
    }
}
