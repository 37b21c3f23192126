//! The `Reservation` aggregate root.

use super::contact::{Contact, ContactType};
use super::driver::Driver;
use super::payment::PaymentStatus;
use super::pricing_item::PricingItem;
use crate::error::CoordinatorError;
use crate::events::{DomainEvent, ReservationConfirmed, ReservationCreated};
use crate::money::Money;
use crate::state_machine::{self, ReservationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketing and attribution data captured at booking time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingAttribution {
    /// How the customer reached the booking flow.
    pub sales_channel_id: i64,
    /// Traffic source id, if tracked.
    pub traffic_source_id: Option<i64>,
    /// Marketing campaign id, if any.
    pub marketing_campaign_id: Option<i64>,
    /// Affiliate id, if the booking was referred.
    pub affiliate_id: Option<i64>,
    /// Device class the booking was made from (e.g. `"mobile"`).
    pub booking_device: Option<String>,
    /// Client IP at booking time.
    pub customer_ip: Option<String>,
    /// Client user agent at booking time.
    pub customer_user_agent: Option<String>,
    /// `utm_source` query parameter.
    pub utm_source: Option<String>,
    /// `utm_medium` query parameter.
    pub utm_medium: Option<String>,
    /// `utm_campaign` query parameter.
    pub utm_campaign: Option<String>,
    /// `utm_term` query parameter.
    pub utm_term: Option<String>,
    /// `utm_content` query parameter.
    pub utm_content: Option<String>,
}

/// Historical display-value snapshots, captured at booking time so that
/// later catalog edits never retroactively change what a past reservation
/// shows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    /// Supplier display name at booking time.
    pub supplier_name: Option<String>,
    /// Pickup office code at booking time.
    pub pickup_office_code: Option<String>,
    /// Pickup office name at booking time.
    pub pickup_office_name: Option<String>,
    /// Dropoff office code at booking time.
    pub dropoff_office_code: Option<String>,
    /// Dropoff office name at booking time.
    pub dropoff_office_name: Option<String>,
    /// Pickup city name at booking time.
    pub pickup_city_name: Option<String>,
    /// Pickup country name at booking time.
    pub pickup_country_name: Option<String>,
    /// Car category's ACRISS code at booking time.
    pub car_acriss_code: Option<String>,
    /// Car category display name at booking time.
    pub car_category_name: Option<String>,
}

/// Fixed-point totals carried on a reservation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Total charged to the customer.
    pub public_price_total: Money,
    /// Total cost owed to the supplier.
    pub supplier_cost_total: Money,
    /// Total discount applied.
    pub discount_total: Money,
    /// Total taxes.
    pub taxes_total: Money,
    /// Total fees.
    pub fees_total: Money,
    /// Total commission (public minus supplier cost).
    pub commission_total: Money,
    /// Cashback earned by the customer on this booking.
    pub cashback_earned_amount: Money,
}

/// The reservation aggregate root. Children (drivers, contacts, pricing
/// items) are reachable only through it; external code must call its
/// methods to mutate status, payment status, or supplier confirmation so
/// that state-machine invariants and domain events stay consistent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Surrogate id, `None` until persisted.
    pub id: Option<i64>,
    /// Public, globally unique code `RES-YYYYMMDD-XXXXX`.
    pub reservation_code: String,

    /// Registered customer id, if the booker is a known customer.
    pub app_customer_id: Option<i64>,
    /// Corporate account id, for B2B bookings.
    pub corporate_account_id: Option<i64>,
    /// CRM user id, if the booking was created on the customer's behalf.
    pub created_by_crm_user_id: Option<i64>,
    /// Supplier fulfilling this reservation.
    pub supplier_id: i64,
    /// Pickup office.
    pub pickup_office_id: i64,
    /// Dropoff office.
    pub dropoff_office_id: i64,
    /// Car category booked.
    pub car_category_id: i64,
    /// Supplier-specific car product id, if selected.
    pub supplier_car_product_id: Option<i64>,

    /// Scheduled pickup time.
    pub pickup_datetime: DateTime<Utc>,
    /// Scheduled dropoff time.
    pub dropoff_datetime: DateTime<Utc>,
    /// Rental length in whole days, always ≥ 1.
    pub rental_days: i64,

    /// ISO-4217 currency code shared by every amount on this reservation.
    pub currency_code: String,
    /// Fixed-point totals.
    pub totals: Totals,

    /// Lifecycle status (C1).
    pub status: ReservationStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,

    /// Marketing and attribution data.
    pub attribution: MarketingAttribution,
    /// Historical display-value snapshots.
    pub snapshots: Snapshots,

    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped on every persisted update.
    pub lock_version: i64,

    /// When cancelled, if it was (owned by an external cancellation service).
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why it was cancelled.
    pub cancel_reason: Option<String>,

    /// Supplier-assigned confirmation number, set on confirmation.
    pub supplier_reservation_code: Option<String>,
    /// When the supplier confirmed, if it has.
    pub supplier_confirmed_at: Option<DateTime<Utc>>,

    /// Drivers on this reservation.
    pub drivers: Vec<Driver>,
    /// Contacts on this reservation.
    pub contacts: Vec<Contact>,
    /// Pricing line items.
    pub pricing_items: Vec<PricingItem>,

    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[allow(clippy::too_many_arguments)]
impl Reservation {
    /// Construct a new reservation in `PENDING`/`UNPAID`, raising a
    /// [`DomainEvent::ReservationCreated`].
    #[must_use]
    pub fn create(
        reservation_code: String,
        supplier_id: i64,
        pickup_office_id: i64,
        dropoff_office_id: i64,
        car_category_id: i64,
        supplier_car_product_id: Option<i64>,
        pickup_datetime: DateTime<Utc>,
        dropoff_datetime: DateTime<Utc>,
        rental_days: i64,
        currency_code: String,
        totals: Totals,
        sales_channel_id: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut reservation = Self {
            id: None,
            reservation_code: reservation_code.clone(),
            app_customer_id: None,
            corporate_account_id: None,
            created_by_crm_user_id: None,
            supplier_id,
            pickup_office_id,
            dropoff_office_id,
            car_category_id,
            supplier_car_product_id,
            pickup_datetime,
            dropoff_datetime,
            rental_days,
            currency_code: currency_code.clone(),
            totals,
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            attribution: MarketingAttribution {
                sales_channel_id,
                ..Default::default()
            },
            snapshots: Snapshots::default(),
            created_at: now,
            updated_at: now,
            lock_version: 0,
            cancelled_at: None,
            cancel_reason: None,
            supplier_reservation_code: None,
            supplier_confirmed_at: None,
            drivers: Vec::new(),
            contacts: Vec::new(),
            pricing_items: Vec::new(),
            events: Vec::new(),
        };

        reservation.add_event(DomainEvent::ReservationCreated(ReservationCreated {
            aggregate_id: reservation.id.unwrap_or_default(),
            reservation_code,
            pickup_datetime,
            total_amount: totals.public_price_total,
            currency_code,
            occurred_at: now,
        }));

        reservation
    }

    /// Reconstruct a reservation from persisted state, with no pending
    /// uncommitted events. Storage adapters use this to rehydrate an
    /// existing row; application code creating a new reservation should go
    /// through [`Reservation::create`] instead.
    #[must_use]
    pub fn from_persisted(
        id: i64,
        reservation_code: String,
        app_customer_id: Option<i64>,
        corporate_account_id: Option<i64>,
        created_by_crm_user_id: Option<i64>,
        supplier_id: i64,
        pickup_office_id: i64,
        dropoff_office_id: i64,
        car_category_id: i64,
        supplier_car_product_id: Option<i64>,
        pickup_datetime: DateTime<Utc>,
        dropoff_datetime: DateTime<Utc>,
        rental_days: i64,
        currency_code: String,
        totals: Totals,
        status: ReservationStatus,
        payment_status: PaymentStatus,
        attribution: MarketingAttribution,
        snapshots: Snapshots,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        lock_version: i64,
        cancelled_at: Option<DateTime<Utc>>,
        cancel_reason: Option<String>,
        supplier_reservation_code: Option<String>,
        supplier_confirmed_at: Option<DateTime<Utc>>,
        drivers: Vec<Driver>,
        contacts: Vec<Contact>,
        pricing_items: Vec<PricingItem>,
    ) -> Self {
        Self {
            id: Some(id),
            reservation_code,
            app_customer_id,
            corporate_account_id,
            created_by_crm_user_id,
            supplier_id,
            pickup_office_id,
            dropoff_office_id,
            car_category_id,
            supplier_car_product_id,
            pickup_datetime,
            dropoff_datetime,
            rental_days,
            currency_code,
            totals,
            status,
            payment_status,
            attribution,
            snapshots,
            created_at,
            updated_at,
            lock_version,
            cancelled_at,
            cancel_reason,
            supplier_reservation_code,
            supplier_confirmed_at,
            drivers,
            contacts,
            pricing_items,
            events: Vec::new(),
        }
    }

    /// Append a driver.
    pub fn add_driver(&mut self, driver: Driver) {
        self.drivers.push(driver);
    }

    /// Append a contact.
    pub fn add_contact(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    /// Whether this reservation satisfies the invariants required to be
    /// persisted in a bookable state: at least one primary driver and at
    /// least one `BOOKER` contact.
    #[must_use]
    pub fn is_bookable(&self) -> bool {
        self.drivers.iter().any(|d| d.is_primary_driver)
            && self.contacts.iter().any(|c| c.contact_type == ContactType::Booker)
    }

    /// The email of the `BOOKER` contact, if one is present.
    #[must_use]
    pub fn booker_email(&self) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.contact_type == ContactType::Booker)
            .map(|c| c.email.as_str())
    }

    /// Record supplier confirmation: `PENDING`/`ON_REQUEST` → `CONFIRMED`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidStateTransition`] if the current
    /// status cannot legally move to `CONFIRMED`.
    pub fn confirm_with_supplier(
        &mut self,
        supplier_reservation_code: String,
        now: DateTime<Utc>,
    ) -> Result<(), CoordinatorError> {
        if !state_machine::can_transition(self.status, ReservationStatus::Confirmed) {
            return Err(CoordinatorError::InvalidStateTransition {
                from: self.status.to_string(),
                to: ReservationStatus::Confirmed.to_string(),
            });
        }

        self.supplier_reservation_code = Some(supplier_reservation_code.clone());
        self.supplier_confirmed_at = Some(now);
        self.status = ReservationStatus::Confirmed;
        self.updated_at = now;

        self.add_event(DomainEvent::ReservationConfirmed(ReservationConfirmed {
            aggregate_id: self.id.unwrap_or_default(),
            reservation_code: self.reservation_code.clone(),
            supplier_reservation_code,
            supplier_name: self.snapshots.supplier_name.clone().unwrap_or_default(),
            customer_email: self.booker_email().unwrap_or_default().to_string(),
            occurred_at: now,
        }));

        Ok(())
    }

    /// Mark the reservation's payment status `PAID`. Does not touch
    /// `status` — the reservation may still be `PENDING` while paid,
    /// pending supplier confirmation.
    pub fn mark_as_paid(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Paid;
        self.updated_at = now;
    }

    /// Apply any status transition validated against the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidStateTransition`] if `to` is not
    /// reachable from the current status.
    pub fn transition_to(&mut self, to: ReservationStatus, now: DateTime<Utc>) -> Result<(), CoordinatorError> {
        if !state_machine::can_transition(self.status, to) {
            return Err(CoordinatorError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the reservation is confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    /// Whether the reservation's payment is captured.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    fn add_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    /// Drain and return the uncommitted event list, for the coordinator to
    /// write into the outbox in the same transaction as the state change
    /// that produced them.
    pub fn clear_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-08T10:00:00Z").unwrap().into()
    }

    fn sample() -> Reservation {
        Reservation::create(
            "RES-20250108-A3K9M".to_string(),
            1,
            10,
            10,
            5,
            None,
            now(),
            now() + chrono::Duration::days(3),
            3,
            "USD".to_string(),
            Totals {
                public_price_total: Money::from_cents(10_000),
                ..Default::default()
            },
            1,
            now(),
        )
    }

    #[test]
    fn create_raises_reservation_created_event() {
        let mut r = sample();
        let events = r.clear_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ReservationCreated");
        assert!(r.clear_events().is_empty());
    }

    #[test]
    fn is_bookable_requires_primary_driver_and_booker_contact() {
        let mut r = sample();
        assert!(!r.is_bookable());
        r.add_driver(Driver::new("Jane", "Doe", true).unwrap());
        assert!(!r.is_bookable());
        r.add_contact(Contact::new(ContactType::Booker, "Jane Doe", "jane@example.com", None).unwrap());
        assert!(r.is_bookable());
    }

    #[test]
    fn confirm_with_supplier_transitions_and_raises_event() {
        let mut r = sample();
        r.clear_events();
        r.confirm_with_supplier("SUP-123".to_string(), now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert!(r.is_confirmed());
        let events = r.clear_events();
        assert_eq!(events[0].event_type(), "ReservationConfirmed");
    }

    #[test]
    fn confirm_with_supplier_rejects_illegal_transition() {
        let mut r = sample();
        r.status = ReservationStatus::Completed;
        assert!(r.confirm_with_supplier("SUP-123".to_string(), now()).is_err());
    }

    #[test]
    fn mark_as_paid_does_not_touch_status() {
        let mut r = sample();
        r.mark_as_paid(now());
        assert!(r.is_paid());
        assert_eq!(r.status, ReservationStatus::Pending);
    }
}
