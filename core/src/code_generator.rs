//! Reservation code generation (C2).
//!
//! Format: `RES-YYYYMMDD-XXXXX`, e.g. `RES-20250108-A3K9M`. The date part is
//! the UTC date the code was generated; the random part is five uppercase
//! alphanumeric characters.

use crate::environment::Clock;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

const PREFIX: &str = "RES";
const RANDOM_LEN: usize = 5;
const MAX_ATTEMPTS: u32 = 10;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a single reservation code for the current date.
#[must_use]
pub fn generate(clock: &dyn Clock) -> String {
    let date_part = clock.now().format("%Y%m%d").to_string();
    let mut rng = rand::thread_rng();
    let random_part: String = (0..RANDOM_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect();
    format!("{PREFIX}-{date_part}-{random_part}")
}

/// Error raised when a unique code could not be produced.
#[derive(Error, Debug)]
pub enum CodeGenerationError {
    /// Exhausted the collision-retry budget.
    #[error("failed to generate a unique reservation code after {attempts} attempts")]
    ExhaustedAttempts {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// A predicate asking whether a candidate code is already taken.
pub type ExistsByCode<'a> =
    dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<bool, CodeGenerationError>> + Send + 'a>> + Send + Sync + 'a;

/// Generate a code guaranteed unique against `exists`, retrying up to
/// [`MAX_ATTEMPTS`] times on collision.
///
/// # Errors
///
/// Returns [`CodeGenerationError::ExhaustedAttempts`] if every attempt
/// collided.
pub async fn generate_unique(
    clock: &dyn Clock,
    exists: &ExistsByCode<'_>,
) -> Result<String, CodeGenerationError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = generate(clock);
        if !exists(code.clone()).await? {
            return Ok(code);
        }
    }
    Err(CodeGenerationError::ExhaustedAttempts { attempts: MAX_ATTEMPTS })
}

/// Validate that `code` matches the `RES-YYYYMMDD-XXXXX` format.
#[must_use]
pub fn validate_format(code: &str) -> bool {
    let parts: Vec<&str> = code.split('-').collect();
    let [prefix, date_part, random_part] = parts.as_slice() else {
        return false;
    };
    if *prefix != PREFIX {
        return false;
    }
    if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if random_part.len() != RANDOM_LEN || !random_part.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::SystemClock;

    #[test]
    fn generated_code_matches_own_validator() {
        let code = generate(&SystemClock);
        assert!(validate_format(&code));
    }

    #[test]
    fn validate_format_rejects_wrong_shape() {
        assert!(!validate_format(""));
        assert!(!validate_format("RES-20250108"));
        assert!(!validate_format("XXX-20250108-A3K9M"));
        assert!(!validate_format("RES-2025018-A3K9M"));
        assert!(!validate_format("RES-20250108-A3K9"));
        assert!(!validate_format("RES-2025010A-A3K9M"));
        assert!(!validate_format("RES-20250108-a3k9m"));
    }

    #[test]
    fn validate_format_accepts_well_formed_code() {
        assert!(validate_format("RES-20250108-A3K9M"));
    }

    #[tokio::test]
    async fn generate_unique_retries_until_available() {
        let clock = SystemClock;
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let exists: &ExistsByCode<'_> = &move |_code: String| {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(async move { Ok(n < 2) })
        };
        let code = generate_unique(&clock, exists).await.unwrap();
        assert!(validate_format(&code));
    }

    #[tokio::test]
    async fn generate_unique_gives_up_after_max_attempts() {
        let clock = SystemClock;
        let exists: &ExistsByCode<'_> = &|_code: String| Box::pin(async { Ok(true) });
        let result = generate_unique(&clock, exists).await;
        assert!(matches!(result, Err(CodeGenerationError::ExhaustedAttempts { attempts: 10 })));
    }
}
