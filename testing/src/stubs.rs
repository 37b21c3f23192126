//! Scriptable [`PaymentGateway`]/[`SupplierGateway`]/[`IdempotencyStore`]
//! doubles.

use chrono::{DateTime, Utc};
use rental_core::idempotency::{IdempotencyRecord, IdempotencyStore, IdempotencyStoreError};
use rental_core::money::Money;
use rental_core::ports::{
    ConfirmationResult, CreateReservationResult, Offer, PaymentGateway, PaymentGatewayError, PaymentResult,
    StatusResult, SupplierGateway, SupplierGatewayError,
};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// A [`PaymentGateway`] that returns one scripted outcome for every call.
pub struct StubPaymentGateway {
    charge_outcome: Mutex<Option<Result<PaymentResult, PaymentGatewayError>>>,
    calls: Mutex<u32>,
}

impl StubPaymentGateway {
    /// A gateway whose `charge` always succeeds with `result`.
    #[must_use]
    pub fn succeeding(result: PaymentResult) -> Self {
        Self { charge_outcome: Mutex::new(Some(Ok(result))), calls: Mutex::new(0) }
    }

    /// A gateway whose `charge` always returns `error`.
    #[must_use]
    pub fn failing(error: PaymentGatewayError) -> Self {
        Self { charge_outcome: Mutex::new(Some(Err(error))), calls: Mutex::new(0) }
    }

    /// Number of times `charge` has been called.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl PaymentGateway for StubPaymentGateway {
    fn charge<'a>(
        &'a self,
        _amount: Money,
        _currency_code: &'a str,
        _payment_method_id: &'a str,
        _description: &'a str,
        _metadata: &'a HashMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = Result<PaymentResult, PaymentGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            *self.calls.lock().unwrap() += 1;
            match self.charge_outcome.lock().unwrap().as_ref() {
                Some(Ok(result)) => Ok(result.clone()),
                Some(Err(PaymentGatewayError::Transport { source, detail })) => {
                    Err(PaymentGatewayError::Transport { source: *source, detail: detail.clone() })
                }
                Some(Err(PaymentGatewayError::InvalidSignature)) => Err(PaymentGatewayError::InvalidSignature),
                None => unreachable!("stub constructed without an outcome"),
            }
        })
    }

    fn verify_webhook_signature<'a>(
        &'a self,
        _payload: &'a [u8],
        _signature: &'a str,
        _secret: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, PaymentGatewayError>> + Send + 'a>> {
        Box::pin(async move { Ok(Value::Null) })
    }
}

/// A [`SupplierGateway`] that returns one scripted outcome per operation.
pub struct StubSupplierGateway {
    availability: Vec<Offer>,
    create_reservation_outcome: Result<CreateReservationResult, SupplierGatewayError>,
}

impl StubSupplierGateway {
    /// A gateway whose `create_reservation` always succeeds with `result`,
    /// and whose `search_availability` returns `offers`.
    #[must_use]
    pub fn succeeding(offers: Vec<Offer>, result: CreateReservationResult) -> Self {
        Self { availability: offers, create_reservation_outcome: Ok(result) }
    }

    /// A gateway whose `create_reservation` always fails with `error`.
    #[must_use]
    pub fn failing_create(error: SupplierGatewayError) -> Self {
        Self { availability: Vec::new(), create_reservation_outcome: Err(error) }
    }
}

impl SupplierGateway for StubSupplierGateway {
    fn search_availability<'a>(
        &'a self,
        _pickup_office_code: &'a str,
        _dropoff_office_code: &'a str,
        _pickup_datetime: DateTime<Utc>,
        _dropoff_datetime: DateTime<Utc>,
        _driver_age: Option<u32>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Offer>, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.availability.clone()) })
    }

    fn create_reservation<'a>(
        &'a self,
        _payload: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<CreateReservationResult, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            match &self.create_reservation_outcome {
                Ok(result) => Ok(result.clone()),
                Err(SupplierGatewayError::Rejected { detail }) => Err(SupplierGatewayError::Rejected { detail: detail.clone() }),
                Err(SupplierGatewayError::ExhaustedRetries { detail }) => {
                    Err(SupplierGatewayError::ExhaustedRetries { detail: detail.clone() })
                }
                Err(SupplierGatewayError::Timeout) => Err(SupplierGatewayError::Timeout),
            }
        })
    }

    fn confirm_reservation<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConfirmationResult, SupplierGatewayError>> + Send + 'a>> {
        let code = supplier_reservation_code.to_string();
        Box::pin(async move { Ok(ConfirmationResult { confirmation_number: code, status: "CONFIRMED".to_string() }) })
    }

    fn get_reservation_status<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StatusResult, SupplierGatewayError>> + Send + 'a>> {
        let code = supplier_reservation_code.to_string();
        Box::pin(async move {
            Ok(StatusResult { confirmation_number: code, status: "CONFIRMED".to_string(), pickup_completed: false, dropoff_completed: false })
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

/// In-memory [`IdempotencyStore`].
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<(String, String), IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyStore for InMemoryIdempotencyStore {
    fn get<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IdempotencyRecord>, IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.records.lock().unwrap().get(&(scope.to_string(), key.to_string())).cloned()) })
    }

    fn put<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        request_hash: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.lock().unwrap();
            let map_key = (scope.to_string(), key.to_string());
            if records.contains_key(&map_key) {
                return Err(IdempotencyStoreError::AlreadyExists { scope: scope.to_string() });
            }
            records.insert(
                map_key,
                IdempotencyRecord {
                    scope: scope.to_string(),
                    idem_key: key.to_string(),
                    request_hash: request_hash.to_string(),
                    response_body,
                    http_status,
                    reference_id,
                    created_at: Utc::now(),
                },
            );
            Ok(())
        })
    }

    fn complete<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.lock().unwrap();
            if let Some(record) = records.get_mut(&(scope.to_string(), key.to_string())) {
                record.response_body = response_body;
                record.http_status = http_status;
                record.reference_id = reference_id;
            }
            Ok(())
        })
    }

    fn release<'a>(&'a self, scope: &'a str, key: &'a str) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.records.lock().unwrap().remove(&(scope.to_string(), key.to_string()));
            Ok(())
        })
    }

    fn cleanup<'a>(
        &'a self,
        older_than: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|_, record| record.created_at >= older_than);
            Ok((before - records.len()) as u64)
        })
    }
}

#[cfg(test)]
mod idempotency_tests {
    use super::*;
    use rental_core::idempotency::CLAIMED_HTTP_STATUS;

    #[tokio::test]
    async fn a_second_claim_for_the_same_key_is_rejected_while_the_first_is_pending() {
        let store = InMemoryIdempotencyStore::new();
        store.put("scope", "key-1", "hash", Value::Null, CLAIMED_HTTP_STATUS, None).await.unwrap();

        let second = store.put("scope", "key-1", "hash", Value::Null, CLAIMED_HTTP_STATUS, None).await;
        assert!(matches!(second, Err(IdempotencyStoreError::AlreadyExists { .. })));

        let record = store.get("scope", "key-1").await.unwrap().unwrap();
        assert_eq!(record.http_status, CLAIMED_HTTP_STATUS);
    }

    #[tokio::test]
    async fn release_frees_the_key_for_a_fresh_claim() {
        let store = InMemoryIdempotencyStore::new();
        store.put("scope", "key-1", "hash", Value::Null, CLAIMED_HTTP_STATUS, None).await.unwrap();
        store.release("scope", "key-1").await.unwrap();

        assert!(store.get("scope", "key-1").await.unwrap().is_none());
        assert!(store.put("scope", "key-1", "hash", Value::Null, CLAIMED_HTTP_STATUS, None).await.is_ok());
    }

    #[tokio::test]
    async fn complete_overwrites_the_claim_with_the_durable_response() {
        let store = InMemoryIdempotencyStore::new();
        store.put("scope", "key-1", "hash", Value::Null, CLAIMED_HTTP_STATUS, None).await.unwrap();
        store.complete("scope", "key-1", serde_json::json!({"ok": true}), 201, Some(42)).await.unwrap();

        let record = store.get("scope", "key-1").await.unwrap().unwrap();
        assert_eq!(record.http_status, 201);
        assert_eq!(record.response_body, serde_json::json!({"ok": true}));
        assert_eq!(record.reference_id, Some(42));
    }
}
