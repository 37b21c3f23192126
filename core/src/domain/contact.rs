//! Contact child entity.

use serde::{Deserialize, Serialize};

/// The role a contact plays on a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactType {
    /// The person who made the booking.
    Booker,
    /// An alternate contact for emergencies.
    Emergency,
}

/// A contact reachable for a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Surrogate id, absent until persisted.
    pub id: Option<i64>,
    /// Owning reservation id, absent until the reservation itself is persisted.
    pub reservation_id: Option<i64>,
    /// Booker or emergency.
    pub contact_type: ContactType,
    /// Full name.
    pub full_name: String,
    /// Email address.
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
}

impl Contact {
    /// Construct a contact, rejecting blank name/email.
    ///
    /// # Errors
    ///
    /// Returns an error message if `full_name` or `email` is empty.
    pub fn new(
        contact_type: ContactType,
        full_name: impl Into<String>,
        email: impl Into<String>,
        phone: Option<String>,
    ) -> Result<Self, String> {
        let full_name = full_name.into();
        let email = email.into();
        if full_name.trim().is_empty() {
            return Err("contact must have a name".to_string());
        }
        if email.trim().is_empty() {
            return Err("contact must have an email".to_string());
        }
        Ok(Self {
            id: None,
            reservation_id: None,
            contact_type,
            full_name,
            email,
            phone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name() {
        assert!(Contact::new(ContactType::Booker, "", "a@b.com", None).is_err());
    }

    #[test]
    fn rejects_blank_email() {
        assert!(Contact::new(ContactType::Booker, "Ana", "", None).is_err());
    }

    #[test]
    fn accepts_valid_contact() {
        let c = Contact::new(ContactType::Booker, "Ana Lopez", "ana@example.com", None).unwrap();
        assert_eq!(c.full_name, "Ana Lopez");
    }
}
