//! Rental pricing arithmetic (C3).
//!
//! Every function here is pure and takes its inputs by value. Rounding
//! always happens last, at the cent boundary, half-up — matching the
//! `Decimal.quantize(ROUND_HALF_UP)` calls of the system this was modeled on.

use crate::money::Money;
use chrono::{DateTime, Utc};

/// Number of calendar days a rental spans, rounded up, minimum one day.
///
/// Any leftover time-of-day past a whole number of days counts as an
/// additional day, the same way a one-hour-late dropoff still bills a
/// full extra day.
#[must_use]
pub fn rental_days(pickup: DateTime<Utc>, dropoff: DateTime<Utc>) -> i64 {
    let delta = dropoff - pickup;
    let whole_days = delta.num_days();
    let remainder = delta - chrono::Duration::days(whole_days);
    let days = if remainder.num_seconds() > 0 {
        whole_days + 1
    } else {
        whole_days
    };
    days.max(1)
}

/// Public price after applying a markup percentage to the supplier cost.
#[must_use]
pub fn public_price(supplier_cost: Money, markup_percentage: f64) -> Money {
    supplier_cost.marked_up_by(markup_percentage)
}

/// Commission: the non-negative difference between public price and
/// supplier cost.
#[must_use]
pub fn commission(public_price: Money, supplier_cost: Money) -> Money {
    public_price.saturating_sub(supplier_cost).at_least_zero()
}

/// The kind of discount applied to a price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountType {
    /// `discount_value` is a percentage of `original_price`.
    Percent,
    /// `discount_value` is an absolute amount.
    FixedAmount,
}

/// Result of applying a discount: the discounted price and the discount
/// amount actually applied (after any cap).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discounted {
    /// Price after the discount.
    pub final_price: Money,
    /// The discount amount actually subtracted.
    pub discount_amount: Money,
}

/// Apply a discount to `original_price`, clamped to `max_discount` (if any)
/// and to `original_price` itself — a discount can never exceed the price
/// it discounts or drive it negative.
#[must_use]
pub fn apply_discount(
    original_price: Money,
    discount_type: DiscountType,
    discount_value: Money,
    max_discount: Option<Money>,
) -> Discounted {
    let raw = match discount_type {
        DiscountType::Percent => original_price.percent_of_hundredths(discount_value.cents()),
        DiscountType::FixedAmount => discount_value,
    };
    let capped = match max_discount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    };
    let discount_amount = if capped > original_price {
        original_price
    } else {
        capped
    };
    Discounted {
        final_price: original_price.saturating_sub(discount_amount),
        discount_amount,
    }
}

/// Tax amount on a base price at `tax_rate` percent.
#[must_use]
pub fn taxes(base_price: Money, tax_rate: f64) -> Money {
    base_price.percent_of(tax_rate)
}

/// A single billable extra: unit price and quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtraLine {
    /// Price of one unit of the extra.
    pub unit_price: Money,
    /// Number of units.
    pub quantity: u32,
}

/// Total price including a base amount and any number of extra line items.
#[must_use]
pub fn total_with_extras(base_price: Money, extras: &[ExtraLine]) -> Money {
    extras.iter().fold(base_price, |total, line| {
        total.saturating_add(Money::from_cents(line.unit_price.cents() * i64::from(line.quantity)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn rental_days_rounds_up_partial_day() {
        let pickup = dt(2025, 1, 8, 10);
        let dropoff = dt(2025, 1, 10, 14);
        assert_eq!(rental_days(pickup, dropoff), 3);
    }

    #[test]
    fn rental_days_exact_whole_days_has_no_extra() {
        let pickup = dt(2025, 1, 8, 10);
        let dropoff = dt(2025, 1, 10, 10);
        assert_eq!(rental_days(pickup, dropoff), 2);
    }

    #[test]
    fn rental_days_minimum_is_one() {
        let pickup = dt(2025, 1, 8, 10);
        let dropoff = dt(2025, 1, 8, 11);
        assert_eq!(rental_days(pickup, dropoff), 1);
    }

    #[test]
    fn public_price_applies_markup() {
        let cost = Money::from_cents(10_000);
        assert_eq!(public_price(cost, 15.0), Money::from_cents(11_500));
    }

    #[test]
    fn commission_is_never_negative() {
        let public = Money::from_cents(100);
        let cost = Money::from_cents(500);
        assert_eq!(commission(public, cost), Money::ZERO);
    }

    #[test]
    fn percent_discount_matches_reference() {
        let result = apply_discount(
            Money::from_cents(10_000),
            DiscountType::Percent,
            Money::from_cents(1000),
            None,
        );
        assert_eq!(result.final_price, Money::from_cents(9_000));
        assert_eq!(result.discount_amount, Money::from_cents(1_000));
    }

    #[test]
    fn discount_is_capped_by_max() {
        let result = apply_discount(
            Money::from_cents(10_000),
            DiscountType::Percent,
            Money::from_cents(5000),
            Some(Money::from_cents(1_000)),
        );
        assert_eq!(result.discount_amount, Money::from_cents(1_000));
        assert_eq!(result.final_price, Money::from_cents(9_000));
    }

    #[test]
    fn discount_never_exceeds_original_price() {
        let result = apply_discount(
            Money::from_cents(100),
            DiscountType::FixedAmount,
            Money::from_cents(500),
            None,
        );
        assert_eq!(result.discount_amount, Money::from_cents(100));
        assert_eq!(result.final_price, Money::ZERO);
    }

    #[test]
    fn total_with_extras_sums_lines() {
        let base = Money::from_cents(10_000);
        let extras = [
            ExtraLine { unit_price: Money::from_cents(1_000), quantity: 2 },
            ExtraLine { unit_price: Money::from_cents(500), quantity: 1 },
        ];
        assert_eq!(total_with_extras(base, &extras), Money::from_cents(12_500));
    }
}
