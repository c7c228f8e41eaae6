//! Purchase and fulfillment coordination for the marketplace.
//!
//! The coordinator drives the four-step flow that moves an item from
//! for-sale to sold (purchase, pickup reservation, carrier handoff, delivery
//! confirmation), plus the local listing operations. Each operation runs in
//! one gateway transaction with row locks held across the remote calls, and
//! rolls back in full on any failure.

pub mod coordinator;
pub mod error;
pub mod listing;
pub mod services;

pub use coordinator::{FulfillmentCoordinator, PickupReservation};
pub use error::{FulfillmentError, PaymentDeclineReason, Result};
pub use listing::{BUMP_COOLDOWN_SECONDS, NewListing};
pub use services::{
    AdapterError, AuthorizationStatus, CategoryDirectory, HttpPaymentClient, HttpShipmentClient,
    PaymentClient, Reservation, ShipmentClient, StaticCategories, StubPaymentClient,
    StubShipmentClient,
};
