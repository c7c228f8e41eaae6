use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped back into a domain type (unknown
    /// status string, out-of-bounds price).
    #[error("corrupt row: {0}")]
    Corrupt(#[from] DomainError),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, StoreError>;
