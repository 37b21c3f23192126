//! Idempotency record shape and canonical request hashing (C4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// A cached response keyed by `(scope, idem_key)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// Operation family, e.g. `"create_reservation"`.
    pub scope: String,
    /// Client-supplied idempotency key.
    pub idem_key: String,
    /// SHA-256 of the canonical JSON form of the original request.
    pub request_hash: String,
    /// The cached response body, replayed verbatim on a repeat request.
    pub response_body: Value,
    /// The HTTP status the original response was served with.
    pub http_status: u16,
    /// Id of the resource the original request created, if any.
    pub reference_id: Option<i64>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// Errors surfaced by an [`IdempotencyStore`] implementation.
#[derive(Error, Debug)]
pub enum IdempotencyStoreError {
    /// A concurrent writer inserted the same `(scope, idem_key)` first.
    #[error("idempotency key already exists for scope {scope}")]
    AlreadyExists {
        /// The scope the collision occurred in.
        scope: String,
    },
    /// The underlying storage failed.
    #[error("idempotency store backend error: {0}")]
    Backend(String),
}

/// Sentinel `http_status` written by a claim (see [`IdempotencyStore::put`]'s
/// claim-row usage): the request is in flight and has not produced a
/// durable response yet. Never returned to a client.
pub const CLAIMED_HTTP_STATUS: u16 = 0;

/// Persistence contract for idempotency records.
///
/// Methods return boxed futures rather than being declared `async fn` so
/// that the trait stays object-safe: the coordinator holds this behind a
/// `Arc<dyn IdempotencyStore>`.
///
/// `put` doubles as a claim row: a handler inserts one with
/// [`CLAIMED_HTTP_STATUS`] and a `Null` body *before* running the
/// operation it guards, so a second concurrent request with the same
/// `(scope, key)` fails `put`'s uniqueness check immediately rather than
/// racing the first request's side effects. Once the operation finishes
/// the handler calls [`IdempotencyStore::complete`] to fill in the durable
/// response, or [`IdempotencyStore::release`] to free the key if the
/// operation failed.
pub trait IdempotencyStore: Send + Sync {
    /// Look up a cached record by `(scope, key)`.
    fn get<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IdempotencyRecord>, IdempotencyStoreError>> + Send + 'a>>;

    /// Insert a new record, claiming `(scope, key)`. Fails with
    /// [`IdempotencyStoreError::AlreadyExists`] if the key is already
    /// claimed or completed.
    #[allow(clippy::too_many_arguments)]
    fn put<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        request_hash: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>>;

    /// Overwrite a claimed record with its final, durable response. Must be
    /// called after the state change that produced `response_body` has
    /// committed.
    fn complete<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>>;

    /// Remove a claimed record that never completed, freeing `(scope, key)`
    /// for a fresh attempt.
    fn release<'a>(&'a self, scope: &'a str, key: &'a str) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>>;

    /// Remove records older than `older_than`. Returns the number removed.
    fn cleanup<'a>(
        &'a self,
        older_than: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, IdempotencyStoreError>> + Send + 'a>>;
}

/// Default TTL for idempotency records before [`IdempotencyStore::cleanup`]
/// may remove them.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Canonicalize a JSON value the way the request hash is computed over it:
/// object keys sorted, no insignificant whitespace, string values
/// NFC-normalized.
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    let normalized = normalize_strings(value);
    serde_json::to_string(&sort_keys(&normalized)).unwrap_or_default()
}

fn normalize_strings(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.nfc().collect::<String>()),
        Value::Array(items) => Value::Array(items.iter().map(normalize_strings).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), normalize_strings(v))).collect())
        }
        other => other.clone(),
    }
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), sort_keys(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compute the sha-256 request hash of a JSON payload, after
/// [`canonicalize`]-ing it.
#[must_use]
pub fn compute_request_hash(payload: &Value) -> String {
    let canonical = canonicalize(payload);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_under_key_reordering() {
        let a = json!({"driver": {"name": "John"}, "age": 30});
        let b = json!({"age": 30, "driver": {"name": "John"}});
        assert_eq!(compute_request_hash(&a), compute_request_hash(&b));
    }

    #[test]
    fn hash_differs_for_different_payloads() {
        let a = json!({"amount": "10.00"});
        let b = json!({"amount": "10.01"});
        assert_ne!(compute_request_hash(&a), compute_request_hash(&b));
    }

    #[test]
    fn hash_ignores_insignificant_whitespace_differences() {
        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "b" : 2 , "a" : 1 }"#).unwrap();
        assert_eq!(compute_request_hash(&a), compute_request_hash(&b));
    }
}
