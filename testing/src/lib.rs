//! # Rental Testing
//!
//! In-memory port doubles for the car-rental reservation orchestrator:
//! a [`UnitOfWorkFactory`](rental_core::ports::UnitOfWorkFactory) backed by
//! plain `HashMap`s, scriptable `PaymentGateway`/`SupplierGateway` stubs,
//! and a fixed [`Clock`](rental_core::environment::Clock). None of this
//! crate talks to a real database or network — it exists so the
//! coordinator and dispatcher can be exercised without either.

pub mod in_memory;
pub mod stubs;

/// Fixed clock for deterministic tests.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use rental_core::environment::Clock;

    /// Always returns the same time, making tests reproducible.
    ///
    /// ```
    /// use rental_testing::mocks::FixedClock;
    /// use rental_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// A default fixed clock for tests (2025-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should
    /// never happen in practice.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use in_memory::{InMemoryDb, InMemoryUnitOfWorkFactory};
pub use mocks::{FixedClock, test_clock};
pub use stubs::{InMemoryIdempotencyStore, StubPaymentGateway, StubSupplierGateway};

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::environment::Clock;
    use rental_core::ports::{CustomerRow, OfficeRow, UnitOfWork, UnitOfWorkFactory};

    #[test]
    fn fixed_clock_is_stable() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[tokio::test]
    async fn in_memory_factory_round_trips_a_seeded_office() {
        let mut db = InMemoryDb::new();
        db.insert_office(OfficeRow {
            id: 1,
            code: "LIS1".to_string(),
            name: "Lisbon Airport".to_string(),
            city_name: "Lisbon".to_string(),
            country_name: "Portugal".to_string(),
        });
        db.insert_customer(CustomerRow { id: 7, full_name: "Jane Doe".to_string(), email: "jane@example.com".to_string() });

        let factory = InMemoryUnitOfWorkFactory::with_db(db);
        let mut uow = factory.begin().await.unwrap();
        let office = uow.offices().get_by_id(1).await.unwrap().unwrap();
        assert_eq!(office.code, "LIS1");
        let customer = uow.customers().get_by_id(7).await.unwrap().unwrap();
        assert_eq!(customer.email, "jane@example.com");
        uow.commit().await.unwrap();
    }
}
