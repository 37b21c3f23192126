//! Shared HTTP plumbing for supplier adapters: connection pooling, a retry
//! policy (no retry on 4xx, retry up to `max_retries` on 5xx/transport
//! errors), and structured per-attempt logging.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rental_core::ports::SupplierGatewayError;
use reqwest::{Method, RequestBuilder};
use std::time::Duration;
use tokio::sync::Mutex;

/// Common HTTP client state shared by every concrete supplier adapter.
/// Concrete adapters embed one of these and call [`Self::request_with_retry`]
/// rather than reaching for `reqwest` directly, so the retry/logging policy
/// never drifts between suppliers.
pub struct BaseSupplierClient {
    supplier_id: i64,
    supplier_name: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl BaseSupplierClient {
    /// Build a client with a pooled `reqwest::Client` and the given request
    /// timeout and retry budget.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(supplier_id: i64, supplier_name: impl Into<String>, base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            supplier_id,
            supplier_name: supplier_name.into(),
            base_url: base_url.into(),
            client,
            max_retries,
        }
    }

    /// This adapter's supplier id, as recorded on `reservations.supplier_id`.
    #[must_use]
    pub const fn supplier_id(&self) -> i64 {
        self.supplier_id
    }

    /// Issue an HTTP request against `endpoint`, retrying 5xx/transport
    /// failures up to `max_retries` times with exponential backoff. A 4xx
    /// response is never retried: it becomes [`SupplierGatewayError::Rejected`]
    /// immediately.
    ///
    /// `build` is called fresh on every attempt since `RequestBuilder` is not
    /// `Clone`.
    pub async fn request_with_retry<F>(&self, method: Method, endpoint: &str, build: F) -> Result<reqwest::Response, SupplierGatewayError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{endpoint}", self.base_url);
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.max_retries.max(1) {
            tracing::info!(
                supplier = self.supplier_name,
                method = %method,
                endpoint,
                attempt,
                "supplier request"
            );

            let request = build(self.client.request(method.clone(), &url));
            let outcome = request.send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        tracing::info!(
                            supplier = self.supplier_name,
                            status_code = status.as_u16(),
                            endpoint,
                            "supplier response success"
                        );
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    tracing::error!(
                        supplier = self.supplier_name,
                        status_code = status.as_u16(),
                        endpoint,
                        attempt,
                        "supplier http error"
                    );

                    if status.is_client_error() {
                        return Err(SupplierGatewayError::Rejected {
                            detail: format!("{status}: {body}"),
                        });
                    }

                    last_error = Some(format!("{status}: {body}"));
                }
                Err(err) => {
                    tracing::error!(
                        supplier = self.supplier_name,
                        endpoint,
                        attempt,
                        error = %err,
                        "supplier request error"
                    );
                    if err.is_timeout() {
                        last_error = Some("timed out".to_string());
                    } else {
                        last_error = Some(err.to_string());
                    }
                }
            }

            if attempt < self.max_retries.max(1) {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }
        }

        match last_error {
            Some(detail) if detail == "timed out" => Err(SupplierGatewayError::Timeout),
            Some(detail) => Err(SupplierGatewayError::ExhaustedRetries { detail }),
            None => Err(SupplierGatewayError::ExhaustedRetries {
                detail: "no attempts were made".to_string(),
            }),
        }
    }
}

/// An OAuth2 client-credentials access token, cached until `expires_at`.
#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Caches a supplier's OAuth2 access token, honoring `expires_in` with a 30s
/// safety margin so a request never starts with a token that expires
/// mid-flight.
pub struct TokenCache {
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Construct an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { cached: Mutex::new(None) }
    }

    /// Return a cached token if still valid, otherwise call `fetch` to mint
    /// a new one and cache it.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, SupplierGatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(String, i64), SupplierGatewayError>>,
    {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = guard.as_ref() {
            if token.expires_at > now {
                return Ok(token.access_token.clone());
            }
        }

        let (access_token, expires_in_secs) = fetch().await?;
        let expires_at = now + ChronoDuration::seconds(expires_in_secs) - ChronoDuration::seconds(30);
        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        Ok(access_token)
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_cache_reuses_token_before_expiry() {
        let cache = TokenCache::new();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_fetch(|| async {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok(("tok-1".to_string(), 3600))
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_cache_refetches_after_expiry() {
        let cache = TokenCache::new();
        let token = cache
            .get_or_fetch(|| async { Ok::<_, SupplierGatewayError>(("short-lived".to_string(), 1)) })
            .await
            .unwrap();
        assert_eq!(token, "short-lived");

        // expires_in=1s minus the 30s safety margin means it is already
        // stale, so the next call must fetch again.
        let refreshed = cache
            .get_or_fetch(|| async { Ok::<_, SupplierGatewayError>(("refreshed".to_string(), 3600)) })
            .await
            .unwrap();
        assert_eq!(refreshed, "refreshed");
    }
}
