use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, TransactionEvidenceId, UserId};
use domain::{
    Item, ItemStatus, NewItem, NewTransactionEvidence, NewUser, Shipping, TransactionEvidence,
    User,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::gateway::{MarketStore, MarketTx};
use crate::Result;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<i64, User>,
    items: HashMap<i64, Item>,
    evidences: HashMap<i64, TransactionEvidence>,
    shippings: HashMap<i64, Shipping>,
    next_user_id: i64,
    next_item_id: i64,
    next_evidence_id: i64,
}

/// In-memory gateway implementation for testing.
///
/// A transaction holds the single table mutex for its whole lifetime, so
/// transactions are fully serialized. That is the coarsest possible row
/// lock, and it gives concurrent callers exactly the blocking behavior the
/// PostgreSQL gateway's `FOR UPDATE` locks produce on a contended row.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A staged transaction over [`InMemoryStore`].
///
/// Writes land on a private copy of the tables; `commit` publishes the copy,
/// dropping the transaction discards it.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    stage: Tables,
}

#[async_trait]
impl MarketStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let stage = guard.clone();
        Ok(InMemoryTx { guard, stage })
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.tables.lock().await.items.get(&id.get()).cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id.get()).cloned())
    }

    async fn get_evidence(
        &self,
        id: TransactionEvidenceId,
    ) -> Result<Option<TransactionEvidence>> {
        Ok(self.tables.lock().await.evidences.get(&id.get()).cloned())
    }

    async fn get_shipping(&self, id: TransactionEvidenceId) -> Result<Option<Shipping>> {
        Ok(self.tables.lock().await.shippings.get(&id.get()).cloned())
    }
}

#[async_trait]
impl MarketTx for InMemoryTx {
    async fn item_for_update(&mut self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.stage.items.get(&id.get()).cloned())
    }

    async fn user_for_update(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.stage.users.get(&id.get()).cloned())
    }

    async fn evidence_by_item_for_update(
        &mut self,
        item_id: ItemId,
    ) -> Result<Option<TransactionEvidence>> {
        Ok(self
            .stage
            .evidences
            .values()
            .find(|evidence| evidence.item_id == item_id)
            .cloned())
    }

    async fn shipping_for_update(
        &mut self,
        id: TransactionEvidenceId,
    ) -> Result<Option<Shipping>> {
        Ok(self.stage.shippings.get(&id.get()).cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        self.stage.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(self.stage.next_user_id),
            account_name: user.account_name,
            address: user.address,
            num_sell_items: 0,
            last_bump: DateTime::<Utc>::UNIX_EPOCH,
            created_at: now,
            updated_at: now,
        };
        self.stage.users.insert(user.id.get(), user.clone());
        Ok(user)
    }

    async fn insert_item(&mut self, item: NewItem) -> Result<Item> {
        self.stage.next_item_id += 1;
        let now = Utc::now();
        let item = Item {
            id: ItemId::new(self.stage.next_item_id),
            seller_id: item.seller_id,
            buyer_id: None,
            status: ItemStatus::ForSale,
            name: item.name,
            price: item.price,
            description: item.description,
            image_name: item.image_name,
            category_id: item.category_id,
            created_at: now,
            updated_at: now,
        };
        self.stage.items.insert(item.id.get(), item.clone());
        Ok(item)
    }

    async fn insert_evidence(
        &mut self,
        evidence: NewTransactionEvidence,
    ) -> Result<TransactionEvidence> {
        self.stage.next_evidence_id += 1;
        let now = Utc::now();
        let evidence = TransactionEvidence {
            id: TransactionEvidenceId::new(self.stage.next_evidence_id),
            seller_id: evidence.seller_id,
            buyer_id: evidence.buyer_id,
            status: domain::EvidenceStatus::WaitShipping,
            item_id: evidence.item_id,
            item_name: evidence.item_name,
            item_price: evidence.item_price,
            item_description: evidence.item_description,
            item_category_id: evidence.item_category_id,
            item_root_category_id: evidence.item_root_category_id,
            created_at: now,
            updated_at: now,
        };
        self.stage.evidences.insert(evidence.id.get(), evidence.clone());
        Ok(evidence)
    }

    async fn insert_shipping(&mut self, shipping: Shipping) -> Result<()> {
        self.stage
            .shippings
            .insert(shipping.transaction_evidence_id.get(), shipping);
        Ok(())
    }

    async fn update_item(&mut self, item: &Item) -> Result<()> {
        self.stage.items.insert(item.id.get(), item.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<()> {
        self.stage.users.insert(user.id.get(), user.clone());
        Ok(())
    }

    async fn update_evidence(&mut self, evidence: &TransactionEvidence) -> Result<()> {
        self.stage.evidences.insert(evidence.id.get(), evidence.clone());
        Ok(())
    }

    async fn update_shipping(&mut self, shipping: &Shipping) -> Result<()> {
        self.stage
            .shippings
            .insert(shipping.transaction_evidence_id.get(), shipping.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.stage;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use domain::Price;

    use super::*;

    async fn seed_user(store: &InMemoryStore, name: &str) -> User {
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .insert_user(NewUser {
                account_name: name.to_string(),
                address: format!("{name} street 1"),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        user
    }

    #[tokio::test]
    async fn commit_publishes_writes() {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller").await;

        let mut tx = store.begin().await.unwrap();
        let item = tx
            .insert_item(NewItem {
                seller_id: seller.id,
                name: "lamp".to_string(),
                price: Price::new(500).unwrap(),
                description: "desk lamp".to_string(),
                image_name: "lamp.jpg".to_string(),
                category_id: common::CategoryId::new(10),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let found = store.get_item(item.id).await.unwrap().unwrap();
        assert_eq!(found.name, "lamp");
        assert_eq!(found.status, ItemStatus::ForSale);
        assert!(found.buyer_id.is_none());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller").await;

        let mut tx = store.begin().await.unwrap();
        let item = tx
            .insert_item(NewItem {
                seller_id: seller.id,
                name: "lamp".to_string(),
                price: Price::new(500).unwrap(),
                description: "desk lamp".to_string(),
                image_name: "lamp.jpg".to_string(),
                category_id: common::CategoryId::new(10),
            })
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(store.get_item(item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(NewUser {
                account_name: "ghost".to_string(),
                address: "nowhere".to_string(),
            })
            .await
            .unwrap();
            // dropped without commit
        }
        assert!(store.get_user(UserId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transactions_are_serialized() {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller").await;

        let mut first = store.begin().await.unwrap();
        let mut locked = first.user_for_update(seller.id).await.unwrap().unwrap();
        locked.num_sell_items += 1;
        first.update_user(&locked).await.unwrap();

        // A second transaction must not start until the first finishes.
        let store2 = store.clone();
        let contender = tokio::spawn(async move {
            let mut tx = store2.begin().await.unwrap();
            let user = tx.user_for_update(seller.id).await.unwrap().unwrap();
            tx.commit().await.unwrap();
            user.num_sell_items
        });

        tokio::task::yield_now().await;
        first.commit().await.unwrap();

        // The contender observes the committed write, never the stage.
        assert_eq!(contender.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn evidence_lookup_by_item() {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller").await;
        let buyer = seed_user(&store, "buyer").await;

        let mut tx = store.begin().await.unwrap();
        let item = tx
            .insert_item(NewItem {
                seller_id: seller.id,
                name: "lamp".to_string(),
                price: Price::new(500).unwrap(),
                description: "desk lamp".to_string(),
                image_name: "lamp.jpg".to_string(),
                category_id: common::CategoryId::new(10),
            })
            .await
            .unwrap();
        let evidence = tx
            .insert_evidence(NewTransactionEvidence {
                seller_id: seller.id,
                buyer_id: buyer.id,
                item_id: item.id,
                item_name: item.name.clone(),
                item_price: item.price,
                item_description: item.description.clone(),
                item_category_id: item.category_id,
                item_root_category_id: common::CategoryId::new(1),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let found = tx
            .evidence_by_item_for_update(item.id)
            .await
            .unwrap()
            .unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(found.id, evidence.id);
        assert_eq!(found.buyer_id, buyer.id);
    }
}
