//! Fulfillment error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

use crate::services::AdapterError;

/// Why the payment service declined an authorization.
///
/// Both cases are answers from the service, never transport problems; a
/// service that could not be asked surfaces as [`AdapterError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDeclineReason {
    /// The service answered `invalid`: the card details are wrong.
    CardInvalid,
    /// The service answered `fail`: the card balance is insufficient.
    InsufficientFunds,
}

impl std::fmt::Display for PaymentDeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentDeclineReason::CardInvalid => write!(f, "card information is invalid"),
            PaymentDeclineReason::InsufficientFunds => write!(f, "card balance is insufficient"),
        }
    }
}

/// Errors that can occur during fulfillment operations.
///
/// Every variant maps to a rolled-back transaction; no operation leaves
/// partial state behind.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Item not found.
    #[error("item not found")]
    ItemNotFound,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Transaction evidence not found.
    #[error("transaction evidence not found")]
    EvidenceNotFound,

    /// Shipping record not found.
    #[error("shipping not found")]
    ShippingNotFound,

    /// The item's category does not exist in the catalog.
    #[error("category not found")]
    CategoryNotFound,

    /// The actor is not the seller or buyer of record.
    #[error("forbidden")]
    Forbidden,

    /// The item is not purchasable in its current status.
    #[error("item is not for sale")]
    ItemNotAvailable,

    /// A seller tried to buy their own listing.
    #[error("cannot buy your own item")]
    SelfPurchase,

    /// The evidence is not in the wait-shipping stage.
    #[error("item is not waiting for shipping")]
    NotWaitingForShipping,

    /// The evidence is not in the wait-done stage.
    #[error("item is not waiting for completion")]
    NotWaitingForCompletion,

    /// Handoff confirmed before a pickup was ever reserved.
    #[error("shipping not requested")]
    ShippingNotRequested,

    /// The carrier does not report the parcel as picked up yet.
    #[error("carrier is not shipping the parcel yet")]
    CarrierNotYetShipping,

    /// The carrier still reports the parcel in transit.
    #[error("item is still shipping")]
    StillInTransit,

    /// The shipment already reached its terminal state.
    #[error("item has already arrived")]
    AlreadyArrived,

    /// The carrier does not report the parcel as delivered yet.
    #[error("carrier has not delivered the parcel yet")]
    NotYetDelivered,

    /// The payment service answered, and the answer was no.
    #[error("payment declined: {reason}")]
    PaymentDeclined { reason: PaymentDeclineReason },

    /// Only a for-sale item may be edited.
    #[error("only items on sale can be edited")]
    ItemNotEditable,

    /// The seller bumped too recently.
    #[error("bump not allowed yet")]
    BumpTooSoon,

    /// A required listing field was empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// Domain rule violation (illegal transition, price bounds).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence gateway failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An external service could not be asked.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
