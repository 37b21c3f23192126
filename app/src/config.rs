//! Process configuration, loaded once from the environment at startup.

use std::time::Duration;
use thiserror::Error;

use rental_gateways::supplier::factory::SupplierConfig;

/// Errors produced while loading [`Config`] from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable was not set.
    #[error("missing required environment variable: {0}")]
    Missing(String),
    /// A variable was set but could not be parsed as the expected type.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: String,
        /// The value that failed to parse.
        value: String,
    },
    /// `PAYMENT_PROVIDER_SECRET_KEY` is shorter than the minimum length a
    /// live secret key should ever have.
    #[error("PAYMENT_PROVIDER_SECRET_KEY must be at least {min} bytes, got {actual}")]
    SecretTooShort {
        /// Minimum required length.
        min: usize,
        /// Actual length found.
        actual: usize,
    },
}

/// Minimum byte length a payment provider secret key must have to be
/// accepted. Catches placeholder values (`"sk_test"`, `"changeme"`) before
/// they reach a live gateway call.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Every external-call deadline the coordinator and gateways honor (§5).
#[derive(Clone, Debug)]
pub struct Deadlines {
    /// Payment gateway call timeout.
    pub payment: Duration,
    /// Supplier gateway call timeout.
    pub supplier: Duration,
}

/// Outbox dispatcher tuning, all with defaults matching `rental-runtime`'s own.
#[derive(Clone, Debug)]
pub struct OutboxConfig {
    /// Rows claimed per dispatcher tick.
    pub batch_size: u32,
    /// Sleep between ticks when the previous batch was empty.
    pub poll_interval: Duration,
    /// How long a claimed-but-unprocessed row is considered legitimately
    /// in-flight before it would be eligible for a future stale-claim
    /// reclaim sweep. Accepted and validated here for forward
    /// compatibility; the current claim query marks a row `NEW` again on
    /// explicit failure rather than on lock expiry, so this has no
    /// reclaim query behind it yet.
    pub lock_timeout: Duration,
}

/// Process-wide configuration, loaded once in `main` and handed down as an
/// owned value rather than a scattered set of `OnceCell`s (§9).
#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Maximum pooled connections.
    pub db_pool_size: u32,
    /// Stripe (or Stripe-shaped) secret key used to authenticate API calls.
    pub payment_provider_secret_key: String,
    /// Shared secret used to verify inbound payment webhook signatures.
    pub payment_webhook_secret: String,
    /// One adapter configuration per supplier the orchestrator talks to.
    pub suppliers: Vec<SupplierConfig>,
    /// Outbox dispatcher tuning.
    pub outbox: OutboxConfig,
    /// How long an idempotency record is retained before the cleanup sweep
    /// may remove it.
    pub idempotency_ttl: Duration,
    /// Socket address the HTTP server binds to.
    pub bind_address: String,
    /// Socket address the `/metrics` server binds to.
    pub metrics_address: String,
    /// External-call deadlines.
    pub deadlines: Deadlines,
    /// How often the reconciliation sweep runs.
    pub reconciliation_interval: Duration,
    /// Age past which a PAID-but-unconfirmed reservation is flagged.
    pub reconciliation_stuck_threshold: chrono::Duration,
}

impl Config {
    /// Load configuration from environment variables, failing fast if a
    /// required value is missing, malformed, or (for the payment secret)
    /// implausibly short.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on the first invalid or missing variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let db_pool_size = parse_or_default("DB_POOL_SIZE", 10)?;

        let payment_provider_secret_key = require("PAYMENT_PROVIDER_SECRET_KEY")?;
        if payment_provider_secret_key.len() < MIN_SECRET_KEY_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_KEY_LEN,
                actual: payment_provider_secret_key.len(),
            });
        }
        let payment_webhook_secret = require("PAYMENT_WEBHOOK_SECRET")?;

        let suppliers = load_supplier_configs()?;

        let outbox = OutboxConfig {
            batch_size: parse_or_default("OUTBOX_BATCH_SIZE", rental_runtime::dispatcher::DEFAULT_BATCH_SIZE)?,
            poll_interval: Duration::from_secs(parse_or_default(
                "OUTBOX_POLL_INTERVAL_SECS",
                rental_runtime::dispatcher::DEFAULT_POLL_INTERVAL.as_secs(),
            )?),
            lock_timeout: Duration::from_secs(parse_or_default("OUTBOX_LOCK_TIMEOUT_SECS", 60)?),
        };

        let idempotency_ttl = Duration::from_secs(
            parse_or_default::<u64>("IDEMPOTENCY_TTL_DAYS", rental_core::idempotency::DEFAULT_TTL_DAYS as u64)? * 86_400,
        );

        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let metrics_address = std::env::var("METRICS_ADDRESS").unwrap_or_else(|_| "0.0.0.0:9090".to_string());

        let deadlines = Deadlines {
            payment: Duration::from_secs(parse_or_default("PAYMENT_CALL_TIMEOUT_SECS", 20)?),
            supplier: Duration::from_secs(parse_or_default("SUPPLIER_CALL_TIMEOUT_SECS", 30)?),
        };

        let reconciliation_interval = Duration::from_secs(parse_or_default("RECONCILIATION_INTERVAL_SECS", 300)?);
        let reconciliation_stuck_threshold = chrono::Duration::minutes(parse_or_default(
            "RECONCILIATION_STUCK_THRESHOLD_MINUTES",
            rental_runtime::reconciliation::DEFAULT_STUCK_THRESHOLD.num_minutes(),
        )?);

        Ok(Self {
            database_url,
            db_pool_size,
            payment_provider_secret_key,
            payment_webhook_secret,
            suppliers,
            outbox,
            idempotency_ttl,
            bind_address,
            metrics_address,
            deadlines,
            reconciliation_interval,
            reconciliation_stuck_threshold,
        })
    }
}

fn require(name: impl Into<String>) -> Result<String, ConfigError> {
    let name = name.into();
    std::env::var(&name).map_err(|_| ConfigError::Missing(name))
}

fn parse_or_default<T>(name: impl Into<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let name = name.into();
    match std::env::var(&name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Per-supplier credentials are given as `SUPPLIER_<N>_ID`/`_NAME`/
/// `_BASE_URL`/`_API_KEY`/`_MAX_RETRIES` for `N` in `1..=SUPPLIER_COUNT`,
/// matching the teacher's convention of numbering homogeneous env-driven
/// collections rather than accepting a single delimited blob.
fn load_supplier_configs() -> Result<Vec<SupplierConfig>, ConfigError> {
    let count: u32 = parse_or_default("SUPPLIER_COUNT", 0)?;
    let mut suppliers = Vec::with_capacity(count as usize);
    for n in 1..=count {
        let id_name = format!("SUPPLIER_{n}_ID");
        let supplier_id = require(id_name.clone())?
            .parse()
            .map_err(|_| ConfigError::Invalid { name: id_name, value: String::new() })?;
        let name = require(format!("SUPPLIER_{n}_NAME"))?;
        let base_url = require(format!("SUPPLIER_{n}_BASE_URL"))?;
        let api_key = require(format!("SUPPLIER_{n}_API_KEY"))?;
        let max_retries = std::env::var(format!("SUPPLIER_{n}_MAX_RETRIES"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        suppliers.push(SupplierConfig { supplier_id, name, base_url, api_key, max_retries });
    }
    Ok(suppliers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_shorter_than_minimum_is_rejected() {
        let err = (|| -> Result<(), ConfigError> {
            let key = "sk_test_short";
            if key.len() < MIN_SECRET_KEY_LEN {
                return Err(ConfigError::SecretTooShort { min: MIN_SECRET_KEY_LEN, actual: key.len() });
            }
            Ok(())
        })();
        assert!(matches!(err, Err(ConfigError::SecretTooShort { .. })));
    }
}
