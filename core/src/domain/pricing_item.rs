//! Pricing line item child entity.

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// The kind of a pricing line item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingItemType {
    /// The base rental rate.
    BaseRate,
    /// A tax line.
    Tax,
    /// A fee line.
    Fee,
    /// A paid extra (child seat, GPS, etc).
    Extra,
    /// Insurance coverage.
    Insurance,
    /// A discount line (negative contribution to the total).
    Discount,
    /// Anything not covered above.
    Other,
}

/// A single billable line on a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingItem {
    /// Surrogate id, absent until persisted.
    pub id: Option<i64>,
    /// Owning reservation id, absent until the reservation itself is persisted.
    pub reservation_id: Option<i64>,
    /// What kind of line this is.
    pub item_type: PricingItemType,
    /// Quantity (whole units; e.g. number of rental days for `BASE_RATE`).
    pub quantity: u32,
    /// Unit price at public (customer-facing) rate.
    pub unit_price_public: Money,
    /// Unit price at supplier cost.
    pub unit_price_supplier: Money,
}

impl PricingItem {
    /// Construct a line item with its totals computed from quantity and
    /// unit prices.
    #[must_use]
    pub fn new(
        item_type: PricingItemType,
        quantity: u32,
        unit_price_public: Money,
        unit_price_supplier: Money,
    ) -> Self {
        Self {
            id: None,
            reservation_id: None,
            item_type,
            quantity,
            unit_price_public,
            unit_price_supplier,
        }
    }

    /// Quantity times public unit price.
    #[must_use]
    pub fn total_price_public(&self) -> Money {
        Money::from_cents(self.unit_price_public.cents() * i64::from(self.quantity))
    }

    /// Quantity times supplier unit price.
    #[must_use]
    pub fn total_price_supplier(&self) -> Money {
        Money::from_cents(self.unit_price_supplier.cents() * i64::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_multiply_quantity_by_unit_price() {
        let item = PricingItem::new(
            PricingItemType::BaseRate,
            3,
            Money::from_cents(5_000),
            Money::from_cents(3_500),
        );
        assert_eq!(item.total_price_public(), Money::from_cents(15_000));
        assert_eq!(item.total_price_supplier(), Money::from_cents(10_500));
    }
}
