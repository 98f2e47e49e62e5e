//! Domain Error Types
//!
//! Errors raised by the chart-of-accounts repository.

use thiserror::Error;

use crate::store::StoreError;

/// Errors from repository operations
#[derive(Debug, Error)]
pub enum DomainError {
    /// Entity ids are used as key segments and may not contain a separator
    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    /// Account saved into a chart that does not exist for this user
    #[error("Chart of accounts not found: {0}")]
    ChartNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
