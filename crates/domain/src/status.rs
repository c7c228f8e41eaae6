//! Status machines for items, transaction evidence, and shippings.
//!
//! These transition tables are the single source of truth for what the
//! fulfillment coordinator may do to a row. The coordinator's own control
//! flow should never attempt an illegal transition; the tables exist so
//! that if it ever does, the attempt is rejected instead of persisted.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The sale status of an item.
///
/// Transitions:
/// ```text
/// ForSale ──┬──► Trading ──► Sold
///           ├──► Stopped ──► ForSale
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Listed and purchasable.
    ForSale,

    /// A purchase is in flight; evidence and shipping rows exist.
    Trading,

    /// Delivery confirmed (terminal state).
    Sold,

    /// Taken off the market by the seller; may be re-listed.
    Stopped,

    /// Withdrawn for good (terminal state).
    Cancelled,
}

impl ItemStatus {
    /// Returns true if a buyer may purchase the item in this status.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ItemStatus::ForSale)
    }

    /// Returns true if the seller may edit the listing in this status.
    pub fn can_edit(&self) -> bool {
        matches!(self, ItemStatus::ForSale)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Sold | ItemStatus::Cancelled)
    }

    /// Returns true if the machine permits moving from `self` to `to`.
    pub fn can_transition(&self, to: ItemStatus) -> bool {
        matches!(
            (self, to),
            (ItemStatus::ForSale, ItemStatus::Trading)
                | (ItemStatus::Trading, ItemStatus::Sold)
                | (ItemStatus::ForSale, ItemStatus::Stopped)
                | (ItemStatus::Stopped, ItemStatus::ForSale)
                | (ItemStatus::ForSale, ItemStatus::Cancelled)
        )
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::ForSale => "for_sale",
            ItemStatus::Trading => "trading",
            ItemStatus::Sold => "sold",
            ItemStatus::Stopped => "stopped",
            ItemStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "for_sale" => Ok(ItemStatus::ForSale),
            "trading" => Ok(ItemStatus::Trading),
            "sold" => Ok(ItemStatus::Sold),
            "stopped" => Ok(ItemStatus::Stopped),
            "cancelled" => Ok(ItemStatus::Cancelled),
            other => Err(DomainError::UnknownStatus {
                entity: "item",
                value: other.to_string(),
            }),
        }
    }
}

/// The status of a transaction evidence record.
///
/// Moves forward only:
/// ```text
/// WaitShipping ──► WaitDone ──► Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    /// Purchase committed; waiting for the seller to hand the parcel over.
    WaitShipping,

    /// Parcel is with the carrier; waiting for the buyer's confirmation.
    WaitDone,

    /// Trade closed (terminal state).
    Done,
}

impl EvidenceStatus {
    /// Position in the forward-only progression.
    fn rank(&self) -> u8 {
        match self {
            EvidenceStatus::WaitShipping => 0,
            EvidenceStatus::WaitDone => 1,
            EvidenceStatus::Done => 2,
        }
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EvidenceStatus::Done)
    }

    /// Returns true if the machine permits moving from `self` to `to`.
    ///
    /// Only single forward steps are legal; the status never regresses and
    /// never skips a stage.
    pub fn can_transition(&self, to: EvidenceStatus) -> bool {
        to.rank() == self.rank() + 1
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStatus::WaitShipping => "wait_shipping",
            EvidenceStatus::WaitDone => "wait_done",
            EvidenceStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for EvidenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EvidenceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait_shipping" => Ok(EvidenceStatus::WaitShipping),
            "wait_done" => Ok(EvidenceStatus::WaitDone),
            "done" => Ok(EvidenceStatus::Done),
            other => Err(DomainError::UnknownStatus {
                entity: "transaction evidence",
                value: other.to_string(),
            }),
        }
    }
}

/// The status of a shipping record, and also the status vocabulary the
/// carrier reports for a reservation.
///
/// Moves forward only:
/// ```text
/// Initial ──► WaitPickup ──► Shipping ──► Done
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    /// Reservation exists; no pickup requested yet. The label is empty.
    Initial,

    /// Pickup requested; the label image is stored.
    WaitPickup,

    /// The carrier has the parcel.
    Shipping,

    /// Delivered (terminal state).
    Done,
}

impl ShippingStatus {
    /// Position in the forward-only progression.
    fn rank(&self) -> u8 {
        match self {
            ShippingStatus::Initial => 0,
            ShippingStatus::WaitPickup => 1,
            ShippingStatus::Shipping => 2,
            ShippingStatus::Done => 3,
        }
    }

    /// Returns true if the label image must be present in this status.
    pub fn has_label(&self) -> bool {
        self.rank() >= ShippingStatus::WaitPickup.rank()
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShippingStatus::Done)
    }

    /// Returns true if the machine permits moving from `self` to `to`.
    ///
    /// Only single forward steps are legal.
    pub fn can_transition(&self, to: ShippingStatus) -> bool {
        to.rank() == self.rank() + 1
    }

    /// Returns the status name as stored in the database and reported by
    /// the carrier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::Initial => "initial",
            ShippingStatus::WaitPickup => "wait_pickup",
            ShippingStatus::Shipping => "shipping",
            ShippingStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShippingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(ShippingStatus::Initial),
            "wait_pickup" => Ok(ShippingStatus::WaitPickup),
            "shipping" => Ok(ShippingStatus::Shipping),
            "done" => Ok(ShippingStatus::Done),
            other => Err(DomainError::UnknownStatus {
                entity: "shipping",
                value: other.to_string(),
            }),
        }
    }
}

/// Returns true if an evidence/shipping status pair is one of the
/// combinations the fulfillment flow can legally persist.
///
/// Shipping may only be waiting for pickup while the evidence is still
/// waiting for shipping, and may only be in transit or delivered once the
/// evidence has advanced past it.
pub fn statuses_consistent(evidence: EvidenceStatus, shipping: ShippingStatus) -> bool {
    matches!(
        (evidence, shipping),
        (EvidenceStatus::WaitShipping, ShippingStatus::Initial)
            | (EvidenceStatus::WaitShipping, ShippingStatus::WaitPickup)
            | (EvidenceStatus::WaitDone, ShippingStatus::Shipping)
            | (EvidenceStatus::WaitDone, ShippingStatus::Done)
            | (EvidenceStatus::Done, ShippingStatus::Done)
    )
}
