//! Postgres-backed [`ReservationRepo`].

use crate::codec::{from_db_str, to_db_str};
use crate::conn::SharedTx;
use crate::error::map_uow_err;
use chrono::{DateTime, Utc};
use rental_core::domain::{
    Contact, ContactType, Driver, MarketingAttribution, PricingItem, PricingItemType, Reservation, Snapshots, Totals,
};
use rental_core::money::Money;
use rental_core::ports::{ReservationRepo, UnitOfWorkError};
use rental_core::state_machine::ReservationStatus;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Postgres-backed reservation repository, scoped to a single transaction.
pub struct PgReservationRepo {
    tx: SharedTx,
}

impl PgReservationRepo {
    /// Construct a repository handle sharing `tx` with the rest of a unit
    /// of work.
    #[must_use]
    pub const fn new(tx: SharedTx) -> Self {
        Self { tx }
    }

    async fn load_drivers(&self, reservation_id: i64) -> Result<Vec<Driver>, UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        let rows = sqlx::query(
            r"
            SELECT id, reservation_id, app_customer_id, is_primary_driver, first_name, last_name,
                   email, phone, date_of_birth, driver_license_number, driver_license_country
            FROM reservation_drivers
            WHERE reservation_id = $1
            ",
        )
        .bind(reservation_id)
        .fetch_all(&mut **guard)
        .await
        .map_err(map_uow_err)?;

        Ok(rows
            .iter()
            .map(|row| Driver {
                id: row.get::<Option<i64>, _>("id"),
                reservation_id: row.get::<Option<i64>, _>("reservation_id"),
                app_customer_id: row.get("app_customer_id"),
                is_primary_driver: row.get("is_primary_driver"),
                first_name: row.get("first_name"),
                last_name: row.get("last_name"),
                email: row.get("email"),
                phone: row.get("phone"),
                date_of_birth: row.get("date_of_birth"),
                driver_license_number: row.get("driver_license_number"),
                driver_license_country: row.get("driver_license_country"),
            })
            .collect())
    }

    async fn load_contacts(&self, reservation_id: i64) -> Result<Vec<Contact>, UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        let rows = sqlx::query(
            r"
            SELECT id, reservation_id, contact_type, full_name, email, phone
            FROM reservation_contacts
            WHERE reservation_id = $1
            ",
        )
        .bind(reservation_id)
        .fetch_all(&mut **guard)
        .await
        .map_err(map_uow_err)?;

        rows.iter()
            .map(|row| {
                let contact_type: String = row.get("contact_type");
                Ok(Contact {
                    id: row.get::<Option<i64>, _>("id"),
                    reservation_id: row.get::<Option<i64>, _>("reservation_id"),
                    contact_type: from_db_str::<ContactType>(&contact_type).map_err(UnitOfWorkError::Backend)?,
                    full_name: row.get("full_name"),
                    email: row.get("email"),
                    phone: row.get("phone"),
                })
            })
            .collect()
    }

    async fn load_pricing_items(&self, reservation_id: i64) -> Result<Vec<PricingItem>, UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        let rows = sqlx::query(
            r"
            SELECT id, reservation_id, item_type, quantity, unit_price_public, unit_price_supplier
            FROM reservation_pricing_items
            WHERE reservation_id = $1
            ",
        )
        .bind(reservation_id)
        .fetch_all(&mut **guard)
        .await
        .map_err(map_uow_err)?;

        rows.iter()
            .map(|row| {
                let item_type: String = row.get("item_type");
                let quantity: i32 = row.get("quantity");
                Ok(PricingItem {
                    id: row.get::<Option<i64>, _>("id"),
                    reservation_id: row.get::<Option<i64>, _>("reservation_id"),
                    item_type: from_db_str::<PricingItemType>(&item_type).map_err(UnitOfWorkError::Backend)?,
                    quantity: quantity.unsigned_abs(),
                    unit_price_public: Money::from_cents(row.get("unit_price_public")),
                    unit_price_supplier: Money::from_cents(row.get("unit_price_supplier")),
                })
            })
            .collect()
    }

    fn row_to_reservation(row: &sqlx::postgres::PgRow) -> Result<Reservation, UnitOfWorkError> {
        let status: String = row.get("status");
        let payment_status: String = row.get("payment_status");

        let totals = Totals {
            public_price_total: Money::from_cents(row.get("public_price_total")),
            supplier_cost_total: Money::from_cents(row.get("supplier_cost_total")),
            discount_total: Money::from_cents(row.get("discount_total")),
            taxes_total: Money::from_cents(row.get("taxes_total")),
            fees_total: Money::from_cents(row.get("fees_total")),
            commission_total: Money::from_cents(row.get("commission_total")),
            cashback_earned_amount: Money::from_cents(row.get("cashback_earned_amount")),
        };

        let attribution = MarketingAttribution {
            sales_channel_id: row.get("sales_channel_id"),
            traffic_source_id: row.get("traffic_source_id"),
            marketing_campaign_id: row.get("marketing_campaign_id"),
            affiliate_id: row.get("affiliate_id"),
            booking_device: row.get("booking_device"),
            customer_ip: row.get("customer_ip"),
            customer_user_agent: row.get("customer_user_agent"),
            utm_source: row.get("utm_source"),
            utm_medium: row.get("utm_medium"),
            utm_campaign: row.get("utm_campaign"),
            utm_term: row.get("utm_term"),
            utm_content: row.get("utm_content"),
        };

        let snapshots = Snapshots {
            supplier_name: row.get("supplier_name_snapshot"),
            pickup_office_code: row.get("pickup_office_code_snapshot"),
            pickup_office_name: row.get("pickup_office_name_snapshot"),
            dropoff_office_code: row.get("dropoff_office_code_snapshot"),
            dropoff_office_name: row.get("dropoff_office_name_snapshot"),
            pickup_city_name: row.get("pickup_city_name_snapshot"),
            pickup_country_name: row.get("pickup_country_name_snapshot"),
            car_acriss_code: row.get("car_acriss_code_snapshot"),
            car_category_name: row.get("car_category_name_snapshot"),
        };

        Ok(Reservation::from_persisted(
            row.get("id"),
            row.get("reservation_code"),
            row.get("app_customer_id"),
            row.get("corporate_account_id"),
            row.get("created_by_crm_user_id"),
            row.get("supplier_id"),
            row.get("pickup_office_id"),
            row.get("dropoff_office_id"),
            row.get("car_category_id"),
            row.get("supplier_car_product_id"),
            row.get("pickup_datetime"),
            row.get("dropoff_datetime"),
            row.get("rental_days"),
            row.get("currency_code"),
            totals,
            from_db_str::<ReservationStatus>(&status).map_err(UnitOfWorkError::Backend)?,
            from_db_str(&payment_status).map_err(UnitOfWorkError::Backend)?,
            attribution,
            snapshots,
            row.get("created_at"),
            row.get("updated_at"),
            row.get("lock_version"),
            row.get("cancelled_at"),
            row.get("cancel_reason"),
            row.get("supplier_reservation_code"),
            row.get("supplier_confirmed_at"),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ))
    }

    async fn fetch_one_by(&self, column: &str, value: Param<'_>) -> Result<Option<Reservation>, UnitOfWorkError> {
        let query = format!(
            r"
            SELECT id, reservation_code, app_customer_id, corporate_account_id, created_by_crm_user_id,
                   supplier_id, pickup_office_id, dropoff_office_id, car_category_id, supplier_car_product_id,
                   pickup_datetime, dropoff_datetime, rental_days, currency_code,
                   public_price_total, supplier_cost_total, discount_total, taxes_total, fees_total,
                   commission_total, cashback_earned_amount, status, payment_status,
                   sales_channel_id, traffic_source_id, marketing_campaign_id, affiliate_id,
                   booking_device, customer_ip, customer_user_agent, utm_source, utm_medium,
                   utm_campaign, utm_term, utm_content,
                   supplier_name_snapshot, pickup_office_code_snapshot, pickup_office_name_snapshot,
                   dropoff_office_code_snapshot, dropoff_office_name_snapshot, pickup_city_name_snapshot,
                   pickup_country_name_snapshot, car_acriss_code_snapshot, car_category_name_snapshot,
                   created_at, updated_at, lock_version, cancelled_at, cancel_reason,
                   supplier_reservation_code, supplier_confirmed_at
            FROM reservations
            WHERE {column} = $1
            "
        );

        let mut guard = self.tx.lock().await;
        let row = match value {
            Param::Id(id) => sqlx::query(&query).bind(id).fetch_optional(&mut **guard).await,
            Param::Code(code) => sqlx::query(&query).bind(code).fetch_optional(&mut **guard).await,
        }
        .map_err(map_uow_err)?;
        drop(guard);

        match row {
            Some(row) => {
                let mut reservation = Self::row_to_reservation(&row)?;
                let id = reservation.id.unwrap_or_default();
                reservation.drivers = self.load_drivers(id).await?;
                reservation.contacts = self.load_contacts(id).await?;
                reservation.pricing_items = self.load_pricing_items(id).await?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }
}

enum Param<'a> {
    Id(i64),
    Code(&'a str),
}

impl ReservationRepo for PgReservationRepo {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_one_by("id", Param::Id(id)).await })
    }

    fn get_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_one_by("reservation_code", Param::Code(code)).await })
    }

    fn exists_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(r#"SELECT EXISTS(SELECT 1 FROM reservations WHERE reservation_code = $1) AS "exists""#)
                .bind(code)
                .fetch_one(&mut **guard)
                .await
                .map_err(map_uow_err)?;
            Ok(row.get("exists"))
        })
    }

    fn save<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(
                r"
                INSERT INTO reservations (
                    reservation_code, app_customer_id, corporate_account_id, created_by_crm_user_id,
                    supplier_id, pickup_office_id, dropoff_office_id, car_category_id, supplier_car_product_id,
                    pickup_datetime, dropoff_datetime, rental_days, currency_code,
                    public_price_total, supplier_cost_total, discount_total, taxes_total, fees_total,
                    commission_total, cashback_earned_amount, status, payment_status,
                    sales_channel_id, traffic_source_id, marketing_campaign_id, affiliate_id,
                    booking_device, customer_ip, customer_user_agent, utm_source, utm_medium,
                    utm_campaign, utm_term, utm_content,
                    supplier_name_snapshot, pickup_office_code_snapshot, pickup_office_name_snapshot,
                    dropoff_office_code_snapshot, dropoff_office_name_snapshot, pickup_city_name_snapshot,
                    pickup_country_name_snapshot, car_acriss_code_snapshot, car_category_name_snapshot,
                    supplier_reservation_code, supplier_confirmed_at
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34, $35, $36, $37, $38,
                    $39, $40, $41, $42, $43
                )
                RETURNING id
                ",
            )
            .bind(&reservation.reservation_code)
            .bind(reservation.app_customer_id)
            .bind(reservation.corporate_account_id)
            .bind(reservation.created_by_crm_user_id)
            .bind(reservation.supplier_id)
            .bind(reservation.pickup_office_id)
            .bind(reservation.dropoff_office_id)
            .bind(reservation.car_category_id)
            .bind(reservation.supplier_car_product_id)
            .bind(reservation.pickup_datetime)
            .bind(reservation.dropoff_datetime)
            .bind(reservation.rental_days)
            .bind(&reservation.currency_code)
            .bind(reservation.totals.public_price_total.cents())
            .bind(reservation.totals.supplier_cost_total.cents())
            .bind(reservation.totals.discount_total.cents())
            .bind(reservation.totals.taxes_total.cents())
            .bind(reservation.totals.fees_total.cents())
            .bind(reservation.totals.commission_total.cents())
            .bind(reservation.totals.cashback_earned_amount.cents())
            .bind(to_db_str(&reservation.status))
            .bind(to_db_str(&reservation.payment_status))
            .bind(reservation.attribution.sales_channel_id)
            .bind(reservation.attribution.traffic_source_id)
            .bind(reservation.attribution.marketing_campaign_id)
            .bind(reservation.attribution.affiliate_id)
            .bind(&reservation.attribution.booking_device)
            .bind(&reservation.attribution.customer_ip)
            .bind(&reservation.attribution.customer_user_agent)
            .bind(&reservation.attribution.utm_source)
            .bind(&reservation.attribution.utm_medium)
            .bind(&reservation.attribution.utm_campaign)
            .bind(&reservation.attribution.utm_term)
            .bind(&reservation.attribution.utm_content)
            .bind(&reservation.snapshots.supplier_name)
            .bind(&reservation.snapshots.pickup_office_code)
            .bind(&reservation.snapshots.pickup_office_name)
            .bind(&reservation.snapshots.dropoff_office_code)
            .bind(&reservation.snapshots.dropoff_office_name)
            .bind(&reservation.snapshots.pickup_city_name)
            .bind(&reservation.snapshots.pickup_country_name)
            .bind(&reservation.snapshots.car_acriss_code)
            .bind(&reservation.snapshots.car_category_name)
            .bind(&reservation.supplier_reservation_code)
            .bind(reservation.supplier_confirmed_at)
            .fetch_one(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            let id: i64 = row.get("id");
            drop(guard);

            for driver in &reservation.drivers {
                self.insert_driver(id, driver).await?;
            }
            for contact in &reservation.contacts {
                self.insert_contact(id, contact).await?;
            }
            for item in &reservation.pricing_items {
                self.insert_pricing_item(id, item).await?;
            }

            Ok(id)
        })
    }

    fn update<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let id = reservation.id.ok_or_else(|| UnitOfWorkError::NotFound {
                entity: "reservation".to_string(),
                id: "<none>".to_string(),
            })?;

            let mut guard = self.tx.lock().await;
            let result = sqlx::query(
                r"
                UPDATE reservations
                SET status = $2,
                    payment_status = $3,
                    supplier_reservation_code = $4,
                    supplier_confirmed_at = $5,
                    cancelled_at = $6,
                    cancel_reason = $7,
                    lock_version = lock_version + 1,
                    updated_at = now()
                WHERE id = $1 AND lock_version = $8
                ",
            )
            .bind(id)
            .bind(to_db_str(&reservation.status))
            .bind(to_db_str(&reservation.payment_status))
            .bind(&reservation.supplier_reservation_code)
            .bind(reservation.supplier_confirmed_at)
            .bind(reservation.cancelled_at)
            .bind(&reservation.cancel_reason)
            .bind(reservation.lock_version)
            .execute(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            if result.rows_affected() == 0 {
                return Err(UnitOfWorkError::OptimisticConcurrency {
                    entity: "reservation".to_string(),
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    fn list_by_customer<'a>(
        &'a mut self,
        app_customer_id: i64,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let rows = sqlx::query(
                r"
                SELECT id, reservation_code, app_customer_id, corporate_account_id, created_by_crm_user_id,
                       supplier_id, pickup_office_id, dropoff_office_id, car_category_id, supplier_car_product_id,
                       pickup_datetime, dropoff_datetime, rental_days, currency_code,
                       public_price_total, supplier_cost_total, discount_total, taxes_total, fees_total,
                       commission_total, cashback_earned_amount, status, payment_status,
                       sales_channel_id, traffic_source_id, marketing_campaign_id, affiliate_id,
                       booking_device, customer_ip, customer_user_agent, utm_source, utm_medium,
                       utm_campaign, utm_term, utm_content,
                       supplier_name_snapshot, pickup_office_code_snapshot, pickup_office_name_snapshot,
                       dropoff_office_code_snapshot, dropoff_office_name_snapshot, pickup_city_name_snapshot,
                       pickup_country_name_snapshot, car_acriss_code_snapshot, car_category_name_snapshot,
                       created_at, updated_at, lock_version, cancelled_at, cancel_reason,
                       supplier_reservation_code, supplier_confirmed_at
                FROM reservations
                WHERE app_customer_id = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                ",
            )
            .bind(app_customer_id)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            rows.iter().map(Self::row_to_reservation).collect()
        })
    }

    fn list_by_date_range<'a>(
        &'a mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let rows = sqlx::query(
                r"
                SELECT id, reservation_code, app_customer_id, corporate_account_id, created_by_crm_user_id,
                       supplier_id, pickup_office_id, dropoff_office_id, car_category_id, supplier_car_product_id,
                       pickup_datetime, dropoff_datetime, rental_days, currency_code,
                       public_price_total, supplier_cost_total, discount_total, taxes_total, fees_total,
                       commission_total, cashback_earned_amount, status, payment_status,
                       sales_channel_id, traffic_source_id, marketing_campaign_id, affiliate_id,
                       booking_device, customer_ip, customer_user_agent, utm_source, utm_medium,
                       utm_campaign, utm_term, utm_content,
                       supplier_name_snapshot, pickup_office_code_snapshot, pickup_office_name_snapshot,
                       dropoff_office_code_snapshot, dropoff_office_name_snapshot, pickup_city_name_snapshot,
                       pickup_country_name_snapshot, car_acriss_code_snapshot, car_category_name_snapshot,
                       created_at, updated_at, lock_version, cancelled_at, cancel_reason,
                       supplier_reservation_code, supplier_confirmed_at
                FROM reservations
                WHERE pickup_datetime >= $1 AND pickup_datetime < $2
                ORDER BY pickup_datetime ASC
                ",
            )
            .bind(from)
            .bind(to)
            .fetch_all(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            rows.iter().map(Self::row_to_reservation).collect()
        })
    }

    fn check_availability<'a>(
        &'a mut self,
        car_category_id: i64,
        supplier_id: i64,
        pickup: DateTime<Utc>,
        dropoff: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(
                r#"
                SELECT NOT EXISTS(
                    SELECT 1 FROM reservations
                    WHERE car_category_id = $1
                      AND supplier_id = $2
                      AND status IN ('PENDING', 'ON_REQUEST', 'CONFIRMED')
                      AND pickup_datetime < $4
                      AND dropoff_datetime > $3
                ) AS "available"
                "#,
            )
            .bind(car_category_id)
            .bind(supplier_id)
            .bind(pickup)
            .bind(dropoff)
            .fetch_one(&mut **guard)
            .await
            .map_err(map_uow_err)?;
            Ok(row.get("available"))
        })
    }

    fn list_paid_not_confirmed<'a>(
        &'a mut self,
        updated_before: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let rows = sqlx::query(
                r"
                SELECT id, reservation_code, app_customer_id, corporate_account_id, created_by_crm_user_id,
                       supplier_id, pickup_office_id, dropoff_office_id, car_category_id, supplier_car_product_id,
                       pickup_datetime, dropoff_datetime, rental_days, currency_code,
                       public_price_total, supplier_cost_total, discount_total, taxes_total, fees_total,
                       commission_total, cashback_earned_amount, status, payment_status,
                       sales_channel_id, traffic_source_id, marketing_campaign_id, affiliate_id,
                       booking_device, customer_ip, customer_user_agent, utm_source, utm_medium,
                       utm_campaign, utm_term, utm_content,
                       supplier_name_snapshot, pickup_office_code_snapshot, pickup_office_name_snapshot,
                       dropoff_office_code_snapshot, dropoff_office_name_snapshot, pickup_city_name_snapshot,
                       pickup_country_name_snapshot, car_acriss_code_snapshot, car_category_name_snapshot,
                       created_at, updated_at, lock_version, cancelled_at, cancel_reason,
                       supplier_reservation_code, supplier_confirmed_at
                FROM reservations
                WHERE payment_status = 'PAID'
                  AND status IN ('PENDING', 'ON_REQUEST')
                  AND updated_at < $1
                ORDER BY updated_at ASC
                ",
            )
            .bind(updated_before)
            .fetch_all(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            rows.iter().map(Self::row_to_reservation).collect()
        })
    }
}

impl PgReservationRepo {
    async fn insert_driver(&self, reservation_id: i64, driver: &Driver) -> Result<(), UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        sqlx::query(
            r"
            INSERT INTO reservation_drivers (
                reservation_id, app_customer_id, is_primary_driver, first_name, last_name,
                email, phone, date_of_birth, driver_license_number, driver_license_country
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(reservation_id)
        .bind(driver.app_customer_id)
        .bind(driver.is_primary_driver)
        .bind(&driver.first_name)
        .bind(&driver.last_name)
        .bind(&driver.email)
        .bind(&driver.phone)
        .bind(driver.date_of_birth)
        .bind(&driver.driver_license_number)
        .bind(&driver.driver_license_country)
        .execute(&mut **guard)
        .await
        .map_err(map_uow_err)?;
        Ok(())
    }

    async fn insert_contact(&self, reservation_id: i64, contact: &Contact) -> Result<(), UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        sqlx::query(
            r"
            INSERT INTO reservation_contacts (reservation_id, contact_type, full_name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(reservation_id)
        .bind(to_db_str(&contact.contact_type))
        .bind(&contact.full_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .execute(&mut **guard)
        .await
        .map_err(map_uow_err)?;
        Ok(())
    }

    async fn insert_pricing_item(&self, reservation_id: i64, item: &PricingItem) -> Result<(), UnitOfWorkError> {
        let mut guard = self.tx.lock().await;
        sqlx::query(
            r"
            INSERT INTO reservation_pricing_items (
                reservation_id, item_type, quantity, unit_price_public, unit_price_supplier
            ) VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(reservation_id)
        .bind(to_db_str(&item.item_type))
        .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
        .bind(item.unit_price_public.cents())
        .bind(item.unit_price_supplier.cents())
        .execute(&mut **guard)
        .await
        .map_err(map_uow_err)?;
        Ok(())
    }
}
