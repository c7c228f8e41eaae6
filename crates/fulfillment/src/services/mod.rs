//! External service contracts: trait, HTTP client, and in-memory stub per
//! collaborator.
//!
//! Every call is a single attempt with a bounded timeout; there is no retry,
//! backoff, or circuit breaker. A failed call fails the enclosing saga step
//! and the coordinator rolls the whole transaction back.

pub mod category;
pub mod payment;
pub mod shipment;

use thiserror::Error;

pub use category::{CategoryDirectory, StaticCategories};
pub use payment::{AuthorizationStatus, HttpPaymentClient, PaymentClient, StubPaymentClient};
pub use shipment::{HttpShipmentClient, Reservation, ShipmentClient, StubShipmentClient};

/// A remote service could not be asked, or answered nonsense.
///
/// Distinct from a negative answer: a declined payment or a carrier that is
/// not ready are domain results, not adapter errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport failure or timeout before a response arrived.
    #[error("{service} service request failed: {reason}")]
    Transport {
        service: &'static str,
        reason: String,
    },

    /// The service answered with a non-2xx status.
    #[error("{service} service returned status {status}")]
    Status { service: &'static str, status: u16 },

    /// The response body could not be decoded.
    #[error("{service} service returned a malformed response: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
}

impl AdapterError {
    pub(crate) fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        AdapterError::Transport {
            service,
            reason: err.to_string(),
        }
    }

    pub(crate) fn malformed(service: &'static str, err: impl std::fmt::Display) -> Self {
        AdapterError::Malformed {
            service,
            reason: err.to_string(),
        }
    }
}
