//! Bounded item price.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lowest price an item may be listed at.
pub const ITEM_MIN_PRICE: i64 = 100;

/// Highest price an item may be listed at.
pub const ITEM_MAX_PRICE: i64 = 1_000_000;

/// An item price in marketplace currency units.
///
/// Construction enforces the configured bounds, so a `Price` held anywhere
/// in the system is known to be valid. Raw integers appear only at the SQL
/// and JSON boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// Creates a price, rejecting values outside the configured bounds.
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if !(ITEM_MIN_PRICE..=ITEM_MAX_PRICE).contains(&value) {
            return Err(DomainError::price_out_of_range());
        }
        Ok(Self(value))
    }

    /// Returns the raw amount.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Price {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_prices_within_bounds() {
        assert_eq!(Price::new(ITEM_MIN_PRICE).unwrap().get(), ITEM_MIN_PRICE);
        assert_eq!(Price::new(500).unwrap().get(), 500);
        assert_eq!(Price::new(ITEM_MAX_PRICE).unwrap().get(), ITEM_MAX_PRICE);
    }

    #[test]
    fn rejects_prices_outside_bounds() {
        assert!(Price::new(ITEM_MIN_PRICE - 1).is_err());
        assert!(Price::new(0).is_err());
        assert!(Price::new(-500).is_err());
        assert!(Price::new(ITEM_MAX_PRICE + 1).is_err());
    }

    #[test]
    fn serialization_roundtrip() {
        let price = Price::new(1250).unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "1250");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn deserialization_enforces_bounds() {
        assert!(serde_json::from_str::<Price>("5").is_err());
    }
}
