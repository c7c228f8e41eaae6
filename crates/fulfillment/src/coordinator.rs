//! The fulfillment coordinator.
//!
//! Four operations move an item from for-sale to sold: `purchase`,
//! `reserve_pickup`, `confirm_handoff`, `confirm_delivery`. Each runs inside
//! exactly one gateway transaction and acquires row locks in the fixed order
//! Item, User(s), TransactionEvidence, Shipping. Remote calls happen while
//! the locks are held, so any failure after the first write still reverts
//! the item to a purchasable state; the adapter timeout bounds how long the
//! locks can be pinned by a hung service.
//!
//! No operation retries a remote call. Every failure path rolls the
//! transaction back and leaves persisted state exactly as it was, so callers
//! may retry the whole operation.

use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{ItemId, TransactionEvidenceId, UserId};
use domain::{
    DomainError, EvidenceStatus, Item, ItemStatus, NewTransactionEvidence, Shipping,
    ShippingAddresses, ShippingStatus, TransactionEvidence, statuses_consistent,
};
use store::{MarketStore, MarketTx};

use crate::error::{FulfillmentError, PaymentDeclineReason, Result};
use crate::services::{AuthorizationStatus, CategoryDirectory, PaymentClient, ShipmentClient};

/// Result of a successful pickup reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupReservation {
    /// Where the seller can fetch the stored label image.
    pub label_path: String,
    /// The carrier reservation backing the pickup.
    pub reserve_id: String,
}

/// Orchestrates the purchase/fulfillment flow against the gateway and the
/// two external services.
pub struct FulfillmentCoordinator<S, P, Sh, C> {
    pub(crate) store: S,
    pub(crate) payment: P,
    pub(crate) shipment: Sh,
    pub(crate) categories: C,
    pub(crate) shop_id: String,
}

fn advance_item(item: &mut Item, to: ItemStatus, now: DateTime<Utc>) -> Result<()> {
    if !item.status.can_transition(to) {
        return Err(DomainError::IllegalTransition {
            entity: "item",
            from: item.status.as_str(),
            to: to.as_str(),
        }
        .into());
    }
    item.status = to;
    item.updated_at = now;
    Ok(())
}

fn advance_evidence(
    evidence: &mut TransactionEvidence,
    to: EvidenceStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    if !evidence.status.can_transition(to) {
        return Err(DomainError::IllegalTransition {
            entity: "transaction evidence",
            from: evidence.status.as_str(),
            to: to.as_str(),
        }
        .into());
    }
    evidence.status = to;
    evidence.updated_at = now;
    Ok(())
}

fn advance_shipping(shipping: &mut Shipping, to: ShippingStatus, now: DateTime<Utc>) -> Result<()> {
    if !shipping.status.can_transition(to) {
        return Err(DomainError::IllegalTransition {
            entity: "shipping",
            from: shipping.status.as_str(),
            to: to.as_str(),
        }
        .into());
    }
    shipping.status = to;
    shipping.updated_at = now;
    Ok(())
}

fn check_pair(evidence: EvidenceStatus, shipping: ShippingStatus) -> Result<()> {
    if !statuses_consistent(evidence, shipping) {
        return Err(DomainError::InconsistentStatuses {
            evidence: evidence.as_str(),
            shipping: shipping.as_str(),
        }
        .into());
    }
    Ok(())
}

impl<S, P, Sh, C> FulfillmentCoordinator<S, P, Sh, C>
where
    S: MarketStore,
    P: PaymentClient,
    Sh: ShipmentClient,
    C: CategoryDirectory,
{
    /// Creates a coordinator over the given gateway and service clients.
    pub fn new(store: S, payment: P, shipment: Sh, categories: C, shop_id: impl Into<String>) -> Self {
        Self {
            store,
            payment,
            shipment,
            categories,
            shop_id: shop_id.into(),
        }
    }

    /// Buys an item.
    ///
    /// Flips the item to trading, records the evidence with its item
    /// snapshot, reserves a shipment slot, authorizes the payment, and
    /// records the shipping row. The reservation comes before the payment so
    /// money is only authorized once a slot is known to exist; any failure
    /// rolls everything back and the item stays purchasable.
    #[tracing::instrument(skip(self, card_token))]
    pub async fn purchase(
        &self,
        buyer_id: UserId,
        item_id: ItemId,
        card_token: &str,
    ) -> Result<TransactionEvidenceId> {
        metrics::counter!("purchase_total").increment(1);
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let result = match self
            .purchase_steps(&mut tx, buyer_id, item_id, card_token)
            .await
        {
            Ok(evidence_id) => {
                tx.commit().await?;
                Ok(evidence_id)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        };

        metrics::histogram!("fulfillment_duration_seconds", "operation" => "purchase")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(evidence_id) => {
                tracing::info!(%evidence_id, "purchase committed");
            }
            Err(err) => {
                metrics::counter!("purchase_failed").increment(1);
                tracing::warn!(error = %err, "purchase rolled back");
            }
        }
        result
    }

    async fn purchase_steps(
        &self,
        tx: &mut S::Tx,
        buyer_id: UserId,
        item_id: ItemId,
        card_token: &str,
    ) -> Result<TransactionEvidenceId> {
        let now = Utc::now();

        let mut item = tx
            .item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::ItemNotFound)?;
        if !item.status.is_purchasable() {
            return Err(FulfillmentError::ItemNotAvailable);
        }
        if item.seller_id == buyer_id {
            return Err(FulfillmentError::SelfPurchase);
        }

        // Users lock in ascending id order so two concurrent purchases with
        // the roles swapped cannot invert the lock order.
        let seller_id = item.seller_id;
        let (first, second) = if buyer_id < seller_id {
            (buyer_id, seller_id)
        } else {
            (seller_id, buyer_id)
        };
        let first_user = tx
            .user_for_update(first)
            .await?
            .ok_or(FulfillmentError::UserNotFound)?;
        let second_user = tx
            .user_for_update(second)
            .await?
            .ok_or(FulfillmentError::UserNotFound)?;
        let (buyer, seller) = if first == buyer_id {
            (first_user, second_user)
        } else {
            (second_user, first_user)
        };

        advance_item(&mut item, ItemStatus::Trading, now)?;
        item.buyer_id = Some(buyer_id);
        tx.update_item(&item).await?;

        let category = self
            .categories
            .category(item.category_id)
            .await?
            .ok_or(FulfillmentError::CategoryNotFound)?;

        let evidence = tx
            .insert_evidence(NewTransactionEvidence {
                seller_id,
                buyer_id,
                item_id: item.id,
                item_name: item.name.clone(),
                item_price: item.price,
                item_description: item.description.clone(),
                item_category_id: category.id,
                item_root_category_id: category.root_id(),
            })
            .await?;

        let addresses = ShippingAddresses {
            to_address: buyer.address.clone(),
            to_name: buyer.account_name.clone(),
            from_address: seller.address.clone(),
            from_name: seller.account_name.clone(),
        };
        let reservation = self.shipment.create_reservation(&addresses).await?;

        match self
            .payment
            .authorize(&self.shop_id, card_token, item.price)
            .await?
        {
            AuthorizationStatus::Ok => {}
            AuthorizationStatus::Invalid => {
                return Err(FulfillmentError::PaymentDeclined {
                    reason: PaymentDeclineReason::CardInvalid,
                });
            }
            AuthorizationStatus::Fail => {
                return Err(FulfillmentError::PaymentDeclined {
                    reason: PaymentDeclineReason::InsufficientFunds,
                });
            }
        }

        tx.insert_shipping(Shipping {
            transaction_evidence_id: evidence.id,
            status: ShippingStatus::Initial,
            item_id: item.id,
            item_name: item.name.clone(),
            reserve_id: reservation.reserve_id,
            reserve_time: reservation.reserve_time,
            to_address: addresses.to_address,
            to_name: addresses.to_name,
            from_address: addresses.from_address,
            from_name: addresses.from_name,
            img_binary: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;

        Ok(evidence.id)
    }

    /// Reserves a carrier pickup for a purchased item and stores the label.
    ///
    /// Seller-only. The addresses come from the shipping row's snapshot, not
    /// from live user rows.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_pickup(
        &self,
        seller_id: UserId,
        item_id: ItemId,
    ) -> Result<PickupReservation> {
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let result = match self.reserve_pickup_steps(&mut tx, seller_id, item_id).await {
            Ok(reservation) => {
                tx.commit().await?;
                Ok(reservation)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        };

        metrics::histogram!("fulfillment_duration_seconds", "operation" => "reserve_pickup")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(reservation) => {
                tracing::info!(reserve_id = %reservation.reserve_id, "pickup reserved");
            }
            Err(err) => {
                metrics::counter!("reserve_pickup_failed").increment(1);
                tracing::warn!(error = %err, "pickup reservation rolled back");
            }
        }
        result
    }

    async fn reserve_pickup_steps(
        &self,
        tx: &mut S::Tx,
        seller_id: UserId,
        item_id: ItemId,
    ) -> Result<PickupReservation> {
        let now = Utc::now();

        let item = tx
            .item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::ItemNotFound)?;
        if item.seller_id != seller_id {
            return Err(FulfillmentError::Forbidden);
        }

        let evidence = tx
            .evidence_by_item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::EvidenceNotFound)?;
        if evidence.status != EvidenceStatus::WaitShipping {
            return Err(FulfillmentError::NotWaitingForShipping);
        }

        let mut shipping = tx
            .shipping_for_update(evidence.id)
            .await?
            .ok_or(FulfillmentError::ShippingNotFound)?;

        let reservation = self
            .shipment
            .create_reservation(&shipping.addresses())
            .await?;
        let label = self.shipment.request_handoff(&reservation.reserve_id).await?;

        advance_shipping(&mut shipping, ShippingStatus::WaitPickup, now)?;
        check_pair(evidence.status, shipping.status)?;
        shipping.reserve_id = reservation.reserve_id.clone();
        shipping.reserve_time = reservation.reserve_time;
        shipping.img_binary = label;
        tx.update_shipping(&shipping).await?;

        Ok(PickupReservation {
            label_path: format!("/transactions/{}.png", evidence.id),
            reserve_id: reservation.reserve_id,
        })
    }

    /// Confirms that the seller handed the parcel to the carrier.
    ///
    /// Branches on where the shipping record stands, cross-checks the
    /// carrier's own report, and advances the evidence to wait-done.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_handoff(
        &self,
        seller_id: UserId,
        item_id: ItemId,
    ) -> Result<TransactionEvidenceId> {
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let result = match self.confirm_handoff_steps(&mut tx, seller_id, item_id).await {
            Ok(evidence_id) => {
                tx.commit().await?;
                Ok(evidence_id)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        };

        metrics::histogram!("fulfillment_duration_seconds", "operation" => "confirm_handoff")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(evidence_id) => {
                tracing::info!(%evidence_id, "handoff confirmed");
            }
            Err(err) => {
                metrics::counter!("confirm_handoff_failed").increment(1);
                tracing::warn!(error = %err, "handoff confirmation rolled back");
            }
        }
        result
    }

    async fn confirm_handoff_steps(
        &self,
        tx: &mut S::Tx,
        seller_id: UserId,
        item_id: ItemId,
    ) -> Result<TransactionEvidenceId> {
        let now = Utc::now();

        let item = tx
            .item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::ItemNotFound)?;
        if item.seller_id != seller_id {
            return Err(FulfillmentError::Forbidden);
        }

        let mut evidence = tx
            .evidence_by_item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::EvidenceNotFound)?;
        if evidence.status != EvidenceStatus::WaitShipping {
            return Err(FulfillmentError::NotWaitingForShipping);
        }

        let mut shipping = tx
            .shipping_for_update(evidence.id)
            .await?
            .ok_or(FulfillmentError::ShippingNotFound)?;

        match shipping.status {
            ShippingStatus::Initial => return Err(FulfillmentError::ShippingNotRequested),
            ShippingStatus::WaitPickup => {
                let carrier = self.shipment.query_status(&shipping.reserve_id).await?;
                if !matches!(carrier, ShippingStatus::Shipping | ShippingStatus::Done) {
                    return Err(FulfillmentError::CarrierNotYetShipping);
                }
                advance_shipping(&mut shipping, ShippingStatus::Shipping, now)?;
            }
            ShippingStatus::Shipping => {
                match self.shipment.query_status(&shipping.reserve_id).await? {
                    ShippingStatus::Done => {
                        advance_shipping(&mut shipping, ShippingStatus::Done, now)?;
                    }
                    ShippingStatus::Shipping => return Err(FulfillmentError::StillInTransit),
                    _ => return Err(FulfillmentError::CarrierNotYetShipping),
                }
            }
            ShippingStatus::Done => return Err(FulfillmentError::AlreadyArrived),
        }

        advance_evidence(&mut evidence, EvidenceStatus::WaitDone, now)?;
        check_pair(evidence.status, shipping.status)?;
        tx.update_shipping(&shipping).await?;
        tx.update_evidence(&evidence).await?;

        Ok(evidence.id)
    }

    /// Confirms that the buyer received the parcel and closes the trade.
    ///
    /// Buyer-only on both the item and the evidence. The carrier must report
    /// the shipment delivered; then shipping, evidence, and item all reach
    /// their terminal states and the seller's sale counter advances, in the
    /// same transaction.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_delivery(
        &self,
        buyer_id: UserId,
        item_id: ItemId,
    ) -> Result<TransactionEvidenceId> {
        let started = Instant::now();

        let mut tx = self.store.begin().await?;
        let result = match self.confirm_delivery_steps(&mut tx, buyer_id, item_id).await {
            Ok(evidence_id) => {
                tx.commit().await?;
                Ok(evidence_id)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        };

        metrics::histogram!("fulfillment_duration_seconds", "operation" => "confirm_delivery")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(evidence_id) => {
                metrics::counter!("trades_completed_total").increment(1);
                tracing::info!(%evidence_id, "trade completed");
            }
            Err(err) => {
                metrics::counter!("confirm_delivery_failed").increment(1);
                tracing::warn!(error = %err, "delivery confirmation rolled back");
            }
        }
        result
    }

    async fn confirm_delivery_steps(
        &self,
        tx: &mut S::Tx,
        buyer_id: UserId,
        item_id: ItemId,
    ) -> Result<TransactionEvidenceId> {
        let now = Utc::now();

        let mut item = tx
            .item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::ItemNotFound)?;
        if item.buyer_id != Some(buyer_id) {
            return Err(FulfillmentError::Forbidden);
        }

        let mut seller = tx
            .user_for_update(item.seller_id)
            .await?
            .ok_or(FulfillmentError::UserNotFound)?;

        let mut evidence = tx
            .evidence_by_item_for_update(item_id)
            .await?
            .ok_or(FulfillmentError::EvidenceNotFound)?;
        if evidence.buyer_id != buyer_id {
            return Err(FulfillmentError::Forbidden);
        }
        if evidence.status != EvidenceStatus::WaitDone {
            return Err(FulfillmentError::NotWaitingForCompletion);
        }

        let mut shipping = tx
            .shipping_for_update(evidence.id)
            .await?
            .ok_or(FulfillmentError::ShippingNotFound)?;

        let carrier = self.shipment.query_status(&shipping.reserve_id).await?;
        if carrier != ShippingStatus::Done {
            return Err(FulfillmentError::NotYetDelivered);
        }

        // Shipping may already be terminal if the handoff confirmation saw
        // the carrier finish; the advance is skipped, not re-applied.
        if shipping.status != ShippingStatus::Done {
            advance_shipping(&mut shipping, ShippingStatus::Done, now)?;
            tx.update_shipping(&shipping).await?;
        }

        advance_evidence(&mut evidence, EvidenceStatus::Done, now)?;
        check_pair(evidence.status, shipping.status)?;
        advance_item(&mut item, ItemStatus::Sold, now)?;
        tx.update_evidence(&evidence).await?;
        tx.update_item(&item).await?;

        seller.num_sell_items += 1;
        seller.updated_at = now;
        tx.update_user(&seller).await?;

        Ok(evidence.id)
    }
}
