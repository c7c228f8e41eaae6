//! The four persisted entities.
//!
//! These are plain rows as the persistence gateway sees them. Cross-component
//! communication passes copies or ids; nothing here is shared by reference.
//! The snapshot fields on [`TransactionEvidence`] and [`Shipping`] are
//! captured at purchase time and never refreshed from the live item.

use chrono::{DateTime, Utc};
use common::{CategoryId, ItemId, TransactionEvidenceId, UserId};
use serde::{Deserialize, Serialize};

use crate::price::Price;
use crate::status::{EvidenceStatus, ItemStatus, ShippingStatus};

/// A marketplace account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub account_name: String,
    pub address: String,
    /// Bumped when the user lists an item and again when a sale completes.
    pub num_sell_items: i64,
    pub last_bump: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub account_name: String,
    pub address: String,
}

/// A listed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub seller_id: UserId,
    /// Unset until a purchase moves the item to [`ItemStatus::Trading`].
    pub buyer_id: Option<UserId>,
    pub status: ItemStatus,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_name: String,
    pub category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an item row; status starts at
/// [`ItemStatus::ForSale`] with no buyer.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub seller_id: UserId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_name: String,
    pub category_id: CategoryId,
}

/// Record of a purchase, 1:1 with the purchased item.
///
/// The `item_*` fields are a denormalized snapshot taken when the purchase
/// committed. Display paths read the snapshot, not the live item, so a later
/// price edit cannot rewrite trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvidence {
    pub id: TransactionEvidenceId,
    pub seller_id: UserId,
    pub buyer_id: UserId,
    pub status: EvidenceStatus,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_price: Price,
    pub item_description: String,
    pub item_category_id: CategoryId,
    pub item_root_category_id: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an evidence row; status starts at
/// [`EvidenceStatus::WaitShipping`].
#[derive(Debug, Clone)]
pub struct NewTransactionEvidence {
    pub seller_id: UserId,
    pub buyer_id: UserId,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_price: Price,
    pub item_description: String,
    pub item_category_id: CategoryId,
    pub item_root_category_id: CategoryId,
}

/// Address pair for a carrier reservation.
///
/// Also the wire shape of the carrier's create-reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddresses {
    pub to_address: String,
    pub to_name: String,
    pub from_address: String,
    pub from_name: String,
}

/// The shipment record for a trade, keyed by its evidence id (1:1).
///
/// `img_binary` holds the carrier's pickup label and is empty until the
/// status reaches [`ShippingStatus::WaitPickup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipping {
    pub transaction_evidence_id: TransactionEvidenceId,
    pub status: ShippingStatus,
    pub item_id: ItemId,
    pub item_name: String,
    pub reserve_id: String,
    /// Carrier-reported reservation time, unix seconds.
    pub reserve_time: i64,
    pub to_address: String,
    pub to_name: String,
    pub from_address: String,
    pub from_name: String,
    #[serde(skip)]
    pub img_binary: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipping {
    /// The address snapshot taken at purchase time, in carrier wire shape.
    pub fn addresses(&self) -> ShippingAddresses {
        ShippingAddresses {
            to_address: self.to_address.clone(),
            to_name: self.to_name.clone(),
            from_address: self.from_address.clone(),
            from_name: self.from_name.clone(),
        }
    }
}
