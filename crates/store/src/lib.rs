//! Persistence gateway for the marketplace.
//!
//! All mutation goes through a [`MarketTx`]: one explicit transaction per
//! coordinator operation, with `SELECT ... FOR UPDATE` row locks on every
//! row the operation intends to write. Unlocked reads on [`MarketStore`]
//! exist for display paths only.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use gateway::{MarketStore, MarketTx};
pub use memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PostgresStore, PostgresTx};
