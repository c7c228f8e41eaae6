use serde::{Deserialize, Serialize};

/// Unique identifier for a user row.
///
/// Wraps the database-assigned key to provide type safety and prevent
/// mixing up user ids with other integer-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a raw database key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying key.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for an item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wraps a raw database key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying key.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ItemId> for i64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

/// Unique identifier for a transaction evidence row.
///
/// The shipping record is keyed by this id as well (1:1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionEvidenceId(i64);

impl TransactionEvidenceId {
    /// Wraps a raw database key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying key.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TransactionEvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TransactionEvidenceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TransactionEvidenceId> for i64 {
    fn from(id: TransactionEvidenceId) -> Self {
        id.0
    }
}

/// Identifier of a category in the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    /// Wraps a raw catalog key.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying key.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CategoryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<CategoryId> for i64 {
    fn from(id: CategoryId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_preserve_value() {
        let id = ItemId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(ItemId::from(42), id);
    }

    #[test]
    fn id_display_uses_raw_key() {
        assert_eq!(UserId::new(7).to_string(), "7");
        assert_eq!(TransactionEvidenceId::new(7).to_string(), "7");
    }

    #[test]
    fn id_serialization_is_transparent() {
        let id = UserId::new(99);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "99");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
