//! String <-> enum codec for columns stored as their `SCREAMING_SNAKE_CASE`
//! serde representation (`status`, `payment_status`, `contact_type`, ...).
//! Reuses `serde_json` as the single source of truth for that mapping
//! rather than hand-writing a match arm per enum per table.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Parse a database string column into an enum via its `serde` `Deserialize`
/// impl.
///
/// # Errors
///
/// Returns an error message if `s` does not match a known variant.
pub fn from_db_str<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(s.to_string())).map_err(|e| e.to_string())
}

/// Render an enum to the string form its `serde` `Serialize` impl produces,
/// for storage in a text column.
#[must_use]
pub fn to_db_str<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::state_machine::ReservationStatus;

    #[test]
    fn round_trips_through_screaming_snake_case() {
        let s = to_db_str(&ReservationStatus::OnRequest);
        assert_eq!(s, "ON_REQUEST");
        let parsed: ReservationStatus = from_db_str(&s).unwrap();
        assert_eq!(parsed, ReservationStatus::OnRequest);
    }

    #[test]
    fn rejects_unknown_variant() {
        assert!(from_db_str::<ReservationStatus>("NOT_A_STATUS").is_err());
    }
}
