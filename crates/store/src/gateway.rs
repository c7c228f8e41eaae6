use async_trait::async_trait;
use common::{ItemId, TransactionEvidenceId, UserId};
use domain::{
    Item, NewItem, NewTransactionEvidence, NewUser, Shipping, TransactionEvidence, User,
};

use crate::Result;

/// Entry point to the persistence layer.
///
/// `begin` opens the one transaction a coordinator operation runs inside.
/// The unlocked reads are for display paths; anything that will be written
/// must instead be loaded through the transaction's `*_for_update` methods.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MarketStore: Send + Sync {
    type Tx: MarketTx + 'static;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Reads an item without locking it.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Reads a user without locking it.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Reads a transaction evidence without locking it.
    async fn get_evidence(&self, id: TransactionEvidenceId)
    -> Result<Option<TransactionEvidence>>;

    /// Reads a shipping record without locking it.
    async fn get_shipping(&self, id: TransactionEvidenceId) -> Result<Option<Shipping>>;
}

/// One open transaction.
///
/// Every `*_for_update` read acquires a row lock that is held until the
/// transaction commits or rolls back. Callers must acquire locks in the
/// fixed order Item, User(s), TransactionEvidence, Shipping; the gateway
/// does not enforce the order, it only provides the locks.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait MarketTx: Send {
    /// Loads an item and locks its row.
    async fn item_for_update(&mut self, id: ItemId) -> Result<Option<Item>>;

    /// Loads a user and locks its row.
    async fn user_for_update(&mut self, id: UserId) -> Result<Option<User>>;

    /// Loads the evidence for an item (1:1) and locks its row.
    async fn evidence_by_item_for_update(
        &mut self,
        item_id: ItemId,
    ) -> Result<Option<TransactionEvidence>>;

    /// Loads the shipping record for an evidence (1:1) and locks its row.
    async fn shipping_for_update(
        &mut self,
        id: TransactionEvidenceId,
    ) -> Result<Option<Shipping>>;

    /// Inserts a user row and returns it with its assigned id.
    async fn insert_user(&mut self, user: NewUser) -> Result<User>;

    /// Inserts an item row as for-sale and returns it with its assigned id.
    async fn insert_item(&mut self, item: NewItem) -> Result<Item>;

    /// Inserts an evidence row as wait-shipping and returns it with its
    /// assigned id.
    async fn insert_evidence(
        &mut self,
        evidence: NewTransactionEvidence,
    ) -> Result<TransactionEvidence>;

    /// Inserts a shipping row. The key is the evidence id, so the caller
    /// supplies the full row.
    async fn insert_shipping(&mut self, shipping: Shipping) -> Result<()>;

    /// Writes an item row back in full.
    async fn update_item(&mut self, item: &Item) -> Result<()>;

    /// Writes a user row back in full.
    async fn update_user(&mut self, user: &User) -> Result<()>;

    /// Writes an evidence row back in full.
    async fn update_evidence(&mut self, evidence: &TransactionEvidence) -> Result<()>;

    /// Writes a shipping row back in full.
    async fn update_shipping(&mut self, shipping: &Shipping) -> Result<()>;

    /// Commits the transaction, publishing every write and releasing the
    /// row locks.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back, discarding every write.
    async fn rollback(self) -> Result<()>;
}
