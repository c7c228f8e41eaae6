//! Shared identifier types used across the marketplace crates.

mod types;

pub use types::{CategoryId, ItemId, TransactionEvidenceId, UserId};
