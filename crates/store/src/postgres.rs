use async_trait::async_trait;
use common::{CategoryId, ItemId, TransactionEvidenceId, UserId};
use domain::{
    EvidenceStatus, Item, ItemStatus, NewItem, NewTransactionEvidence, NewUser, Price, Shipping,
    TransactionEvidence, User,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::gateway::{MarketStore, MarketTx};
use crate::Result;

/// PostgreSQL-backed gateway implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL gateway.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// One open `sqlx` transaction. Dropping it without committing rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        account_name: row.try_get("account_name")?,
        address: row.try_get("address")?,
        num_sell_items: row.try_get("num_sell_items")?,
        last_bump: row.try_get("last_bump")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<Item> {
    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        seller_id: UserId::new(row.try_get("seller_id")?),
        buyer_id: row.try_get::<Option<i64>, _>("buyer_id")?.map(UserId::new),
        status: row.try_get::<String, _>("status")?.parse::<ItemStatus>()?,
        name: row.try_get("name")?,
        price: Price::new(row.try_get("price")?)?,
        description: row.try_get("description")?,
        image_name: row.try_get("image_name")?,
        category_id: CategoryId::new(row.try_get("category_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_evidence(row: &PgRow) -> Result<TransactionEvidence> {
    Ok(TransactionEvidence {
        id: TransactionEvidenceId::new(row.try_get("id")?),
        seller_id: UserId::new(row.try_get("seller_id")?),
        buyer_id: UserId::new(row.try_get("buyer_id")?),
        status: row
            .try_get::<String, _>("status")?
            .parse::<EvidenceStatus>()?,
        item_id: ItemId::new(row.try_get("item_id")?),
        item_name: row.try_get("item_name")?,
        item_price: Price::new(row.try_get("item_price")?)?,
        item_description: row.try_get("item_description")?,
        item_category_id: CategoryId::new(row.try_get("item_category_id")?),
        item_root_category_id: CategoryId::new(row.try_get("item_root_category_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_shipping(row: &PgRow) -> Result<Shipping> {
    Ok(Shipping {
        transaction_evidence_id: TransactionEvidenceId::new(
            row.try_get("transaction_evidence_id")?,
        ),
        status: row
            .try_get::<String, _>("status")?
            .parse::<domain::ShippingStatus>()?,
        item_id: ItemId::new(row.try_get("item_id")?),
        item_name: row.try_get("item_name")?,
        reserve_id: row.try_get("reserve_id")?,
        reserve_time: row.try_get("reserve_time")?,
        to_address: row.try_get("to_address")?,
        to_name: row.try_get("to_name")?,
        from_address: row.try_get("from_address")?,
        from_name: row.try_get("from_name")?,
        img_binary: row.try_get("img_binary")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MarketStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTx { tx })
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT * FROM items WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_evidence(
        &self,
        id: TransactionEvidenceId,
    ) -> Result<Option<TransactionEvidence>> {
        let row = sqlx::query("SELECT * FROM transaction_evidences WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_evidence).transpose()
    }

    async fn get_shipping(&self, id: TransactionEvidenceId) -> Result<Option<Shipping>> {
        let row = sqlx::query("SELECT * FROM shippings WHERE transaction_evidence_id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shipping).transpose()
    }
}

#[async_trait]
impl MarketTx for PostgresTx {
    async fn item_for_update(&mut self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT * FROM items WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn user_for_update(&mut self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn evidence_by_item_for_update(
        &mut self,
        item_id: ItemId,
    ) -> Result<Option<TransactionEvidence>> {
        let row =
            sqlx::query("SELECT * FROM transaction_evidences WHERE item_id = $1 FOR UPDATE")
                .bind(item_id.get())
                .fetch_optional(&mut *self.tx)
                .await?;
        row.as_ref().map(row_to_evidence).transpose()
    }

    async fn shipping_for_update(
        &mut self,
        id: TransactionEvidenceId,
    ) -> Result<Option<Shipping>> {
        let row =
            sqlx::query("SELECT * FROM shippings WHERE transaction_evidence_id = $1 FOR UPDATE")
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?;
        row.as_ref().map(row_to_shipping).transpose()
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (account_name, address)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&user.account_name)
        .bind(&user.address)
        .fetch_one(&mut *self.tx)
        .await?;
        row_to_user(&row)
    }

    async fn insert_item(&mut self, item: NewItem) -> Result<Item> {
        let row = sqlx::query(
            r#"
            INSERT INTO items (seller_id, status, name, price, description, image_name, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(item.seller_id.get())
        .bind(ItemStatus::ForSale.as_str())
        .bind(&item.name)
        .bind(item.price.get())
        .bind(&item.description)
        .bind(&item.image_name)
        .bind(item.category_id.get())
        .fetch_one(&mut *self.tx)
        .await?;
        row_to_item(&row)
    }

    async fn insert_evidence(
        &mut self,
        evidence: NewTransactionEvidence,
    ) -> Result<TransactionEvidence> {
        let row = sqlx::query(
            r#"
            INSERT INTO transaction_evidences
                (seller_id, buyer_id, status, item_id, item_name, item_price,
                 item_description, item_category_id, item_root_category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(evidence.seller_id.get())
        .bind(evidence.buyer_id.get())
        .bind(EvidenceStatus::WaitShipping.as_str())
        .bind(evidence.item_id.get())
        .bind(&evidence.item_name)
        .bind(evidence.item_price.get())
        .bind(&evidence.item_description)
        .bind(evidence.item_category_id.get())
        .bind(evidence.item_root_category_id.get())
        .fetch_one(&mut *self.tx)
        .await?;
        row_to_evidence(&row)
    }

    async fn insert_shipping(&mut self, shipping: Shipping) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shippings
                (transaction_evidence_id, status, item_id, item_name, reserve_id,
                 reserve_time, to_address, to_name, from_address, from_name,
                 img_binary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(shipping.transaction_evidence_id.get())
        .bind(shipping.status.as_str())
        .bind(shipping.item_id.get())
        .bind(&shipping.item_name)
        .bind(&shipping.reserve_id)
        .bind(shipping.reserve_time)
        .bind(&shipping.to_address)
        .bind(&shipping.to_name)
        .bind(&shipping.from_address)
        .bind(&shipping.from_name)
        .bind(&shipping.img_binary)
        .bind(shipping.created_at)
        .bind(shipping.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_item(&mut self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE items
            SET seller_id = $2, buyer_id = $3, status = $4, name = $5, price = $6,
                description = $7, image_name = $8, category_id = $9,
                created_at = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(item.id.get())
        .bind(item.seller_id.get())
        .bind(item.buyer_id.map(|id| id.get()))
        .bind(item.status.as_str())
        .bind(&item.name)
        .bind(item.price.get())
        .bind(&item.description)
        .bind(&item.image_name)
        .bind(item.category_id.get())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET account_name = $2, address = $3, num_sell_items = $4,
                last_bump = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.get())
        .bind(&user.account_name)
        .bind(&user.address)
        .bind(user.num_sell_items)
        .bind(user.last_bump)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_evidence(&mut self, evidence: &TransactionEvidence) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transaction_evidences
            SET status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(evidence.id.get())
        .bind(evidence.status.as_str())
        .bind(evidence.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_shipping(&mut self, shipping: &Shipping) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE shippings
            SET status = $2, reserve_id = $3, reserve_time = $4, img_binary = $5,
                updated_at = $6
            WHERE transaction_evidence_id = $1
            "#,
        )
        .bind(shipping.transaction_evidence_id.get())
        .bind(shipping.status.as_str())
        .bind(&shipping.reserve_id)
        .bind(shipping.reserve_time)
        .bind(&shipping.img_binary)
        .bind(shipping.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
