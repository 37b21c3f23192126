//! Driver child entity.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A driver listed on a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Surrogate id, absent until persisted.
    pub id: Option<i64>,
    /// Owning reservation id, absent until the reservation itself is persisted.
    pub reservation_id: Option<i64>,
    /// App customer id, if the driver is a registered customer.
    pub app_customer_id: Option<i64>,
    /// Whether this driver is the primary (booking) driver.
    pub is_primary_driver: bool,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email, if provided.
    pub email: Option<String>,
    /// Phone, if provided.
    pub phone: Option<String>,
    /// Date of birth, if provided (used for the minimum-age check).
    pub date_of_birth: Option<NaiveDate>,
    /// Driver's license number.
    pub driver_license_number: Option<String>,
    /// Country that issued the license.
    pub driver_license_country: Option<String>,
}

/// Minimum age, in whole years, to be eligible to drive a rented vehicle.
pub const MINIMUM_DRIVER_AGE: u32 = 21;

impl Driver {
    /// Construct a driver, rejecting a blank first or last name.
    ///
    /// # Errors
    ///
    /// Returns an error message if `first_name` or `last_name` is empty.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        is_primary_driver: bool,
    ) -> Result<Self, String> {
        let first_name = first_name.into();
        let last_name = last_name.into();
        if first_name.trim().is_empty() || last_name.trim().is_empty() {
            return Err("driver must have first and last name".to_string());
        }
        Ok(Self {
            id: None,
            reservation_id: None,
            app_customer_id: None,
            is_primary_driver,
            first_name,
            last_name,
            email: None,
            phone: None,
            date_of_birth: None,
            driver_license_number: None,
            driver_license_country: None,
        })
    }

    /// First and last name joined with a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether this driver may legally drive: a license number is present,
    /// and if a birth date is known, the driver is at least
    /// [`MINIMUM_DRIVER_AGE`].
    #[must_use]
    pub fn is_valid_for_rental(&self) -> bool {
        if self.driver_license_number.is_none() {
            return false;
        }
        if let Some(dob) = self.date_of_birth {
            let today = Utc::now().date_naive();
            let age = today.year() - dob.year();
            if age < MINIMUM_DRIVER_AGE as i32 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        assert!(Driver::new("", "Doe", true).is_err());
    }

    #[test]
    fn invalid_without_license() {
        let d = Driver::new("Jane", "Doe", true).unwrap();
        assert!(!d.is_valid_for_rental());
    }

    #[test]
    fn valid_with_license_and_no_dob() {
        let mut d = Driver::new("Jane", "Doe", true).unwrap();
        d.driver_license_number = Some("X123".to_string());
        assert!(d.is_valid_for_rental());
    }

    #[test]
    fn invalid_when_underage() {
        let mut d = Driver::new("Jane", "Doe", true).unwrap();
        d.driver_license_number = Some("X123".to_string());
        let young_year = Utc::now().date_naive().year() - 10;
        d.date_of_birth = NaiveDate::from_ymd_opt(young_year, 1, 1);
        assert!(!d.is_valid_for_rental());
    }

    #[test]
    fn full_name_joins_parts() {
        let d = Driver::new("Jane", "Doe", true).unwrap();
        assert_eq!(d.full_name(), "Jane Doe");
    }
}
