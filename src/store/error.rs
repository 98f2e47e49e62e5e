//! Storage Errors

use std::path::PathBuf;

/// Errors raised by a key-value store operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The handle was used outside of a lease
    #[error("No caller identity bound to store handle")]
    NoIdentity,

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Errors raised while loading a backend or constructing a store handle
#[derive(Debug, thiserror::Error)]
pub enum BackendInitError {
    #[error("Failed to open storage plugin {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Storage plugin {path} does not export {symbol}: {source}")]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("Storage plugin ABI mismatch: expected version {expected}, found {found}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("Invalid backend settings: {0}")]
    InvalidSettings(String),

    #[error("Backend initialization failed: {0}")]
    Factory(String),
}

impl BackendInitError {
    pub fn factory(err: impl std::fmt::Display) -> Self {
        Self::Factory(err.to_string())
    }
}
