//! Domain error types.

use thiserror::Error;

use crate::price::{ITEM_MAX_PRICE, ITEM_MIN_PRICE};

/// Errors that can occur in pure domain logic.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A status string from the database or a remote service did not match
    /// any known variant.
    #[error("unknown {entity} status: {value}")]
    UnknownStatus { entity: &'static str, value: String },

    /// An entity was asked to move to a status its machine does not permit.
    #[error("illegal {entity} status transition: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// The evidence/shipping status pair is not one of the legal
    /// combinations.
    #[error("inconsistent statuses: evidence {evidence}, shipping {shipping}")]
    InconsistentStatuses {
        evidence: &'static str,
        shipping: &'static str,
    },

    /// An item price outside the configured bounds.
    #[error("price must be between {min} and {max}")]
    PriceOutOfRange { min: i64, max: i64 },
}

impl DomainError {
    /// Builds the out-of-range error with the configured bounds.
    pub fn price_out_of_range() -> Self {
        DomainError::PriceOutOfRange {
            min: ITEM_MIN_PRICE,
            max: ITEM_MAX_PRICE,
        }
    }
}
