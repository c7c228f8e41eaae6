//! Listing operations: sell, price edit, bump.
//!
//! Local-only transactions. Validation happens before any lock is acquired;
//! the price bound is enforced by `Price` itself, so an out-of-range value
//! never reaches this module.

use chrono::{TimeDelta, Utc};
use common::{CategoryId, ItemId, UserId};
use domain::{Item, NewItem, Price};
use store::{MarketStore, MarketTx};

use crate::coordinator::FulfillmentCoordinator;
use crate::error::{FulfillmentError, Result};
use crate::services::{CategoryDirectory, PaymentClient, ShipmentClient};

/// How long a seller must wait between bumps.
pub const BUMP_COOLDOWN_SECONDS: i64 = 3;

/// A new listing as submitted by a seller.
///
/// The image is uploaded by the boundary; only its resolved name arrives
/// here.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: CategoryId,
    pub image_name: String,
}

impl<S, P, Sh, C> FulfillmentCoordinator<S, P, Sh, C>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    /// Lists a new item for sale.
    ///
    /// Bumps the seller's listing counter and bump timestamp in the same
    /// transaction as the insert.
    #[tracing::instrument(skip(self, listing))]
    pub async fn list_item(&self, seller_id: UserId, listing: NewListing) -> Result<ItemId> {
        if listing.name.is_empty() {
            return Err(FulfillmentError::MissingField { field: "name" });
        }
        if listing.description.is_empty() {
            return Err(FulfillmentError::MissingField { field: "description" });
        }
        if listing.image_name.is_empty() {
            return Err(FulfillmentError::MissingField { field: "image" });
        }
        self.categories
            .category(listing.category_id)
            .await?
            .ok_or(FulfillmentError::CategoryNotFound)?;

        let mut tx = self.store.begin().await?;
        let result = async {
            let now = Utc::now();
            let mut seller = tx
                .user_for_update(seller_id)
                .await?
                .ok_or(FulfillmentError::UserNotFound)?;

            let item = tx
                .insert_item(NewItem {
                    seller_id,
                    name: listing.name,
                    price: listing.price,
                    description: listing.description,
                    image_name: listing.image_name,
                    category_id: listing.category_id,
                })
                .await?;

            seller.num_sell_items += 1;
            seller.last_bump = now;
            seller.updated_at = now;
            tx.update_user(&seller).await?;

            Ok(item.id)
        }
        .await;

        match result {
            Ok(item_id) => {
                tx.commit().await?;
                metrics::counter!("items_listed_total").increment(1);
                tracing::info!(%item_id, "item listed");
                Ok(item_id)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Changes the price of a listing. Seller-only, for-sale items only.
    #[tracing::instrument(skip(self))]
    pub async fn update_price(
        &self,
        seller_id: UserId,
        item_id: ItemId,
        price: Price,
    ) -> Result<Item> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let mut item = tx
                .item_for_update(item_id)
                .await?
                .ok_or(FulfillmentError::ItemNotFound)?;
            if item.seller_id != seller_id {
                return Err(FulfillmentError::Forbidden);
            }
            if !item.status.can_edit() {
                return Err(FulfillmentError::ItemNotEditable);
            }

            item.price = price;
            item.updated_at = Utc::now();
            tx.update_item(&item).await?;
            Ok(item)
        }
        .await;

        match result {
            Ok(item) => {
                tx.commit().await?;
                Ok(item)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Re-lists an item at the top of the catalog by refreshing its
    /// creation time. Seller-only, rate-limited per seller.
    #[tracing::instrument(skip(self))]
    pub async fn bump(&self, seller_id: UserId, item_id: ItemId) -> Result<Item> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let now = Utc::now();
            let mut item = tx
                .item_for_update(item_id)
                .await?
                .ok_or(FulfillmentError::ItemNotFound)?;
            if item.seller_id != seller_id {
                return Err(FulfillmentError::Forbidden);
            }

            let mut seller = tx
                .user_for_update(seller_id)
                .await?
                .ok_or(FulfillmentError::UserNotFound)?;
            if seller.last_bump + TimeDelta::seconds(BUMP_COOLDOWN_SECONDS) > now {
                return Err(FulfillmentError::BumpTooSoon);
            }

            item.created_at = now;
            item.updated_at = now;
            tx.update_item(&item).await?;

            seller.last_bump = now;
            seller.updated_at = now;
            tx.update_user(&seller).await?;

            Ok(item)
        }
        .await;

        match result {
            Ok(item) => {
                tx.commit().await?;
                Ok(item)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }
}
