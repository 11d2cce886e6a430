use crate::domain::order::OrderStatus;
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors surfaced by persistence adapters.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("rocksdb error: {0}")]
    Rocks(#[from] rocksdb::Error),
    #[error("storage error: {0}")]
    Other(String),
}

/// Errors returned by the public engine operations.
///
/// Every variant is recovered at the operation boundary. `Storage` is the one
/// class a caller should treat as a 5xx-equivalent: the business checks
/// passed but the atomic commit failed.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Forbidden(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("illegal status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("insufficient wallet balance")]
    InsufficientFunds,
    #[error("webhook rejected: {0}")]
    Signature(String),
    #[error("dispute already resolved")]
    AlreadyResolved,
    #[error("withdrawal already decided")]
    AlreadyDecided,
    #[error("milestone already completed")]
    MilestoneAlreadyCompleted,
    #[error("milestone amounts ({budgeted}) would exceed order amount ({order_amount})")]
    MilestoneBudgetExceeded {
        budgeted: Decimal,
        order_amount: Decimal,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
