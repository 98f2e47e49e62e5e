//! Storage Backend Provider
//!
//! The key-value store interface every backend implements, and the factory
//! capability the resource pool uses to build one store per pooled handle.

mod error;
pub mod memory;
pub mod plugin;

use async_trait::async_trait;

use crate::domain::IdentitySlot;

pub use error::{BackendInitError, StoreError};
pub use memory::{MemoryStore, MemoryStoreFactory};
pub use plugin::{NewKeyValueStoreFn, PluginStoreFactory, COA_STORE_PLUGIN_ABI_VERSION};

/// Backend-specific settings, loaded once at startup and never mutated
pub type BackendSettings = serde_json::Map<String, serde_json::Value>;

/// Minimal persistence interface over string keys and byte values.
///
/// Implementations scope every key to the identity currently bound in the
/// slot they were created with.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, ordered by key
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Builds key-value stores for the resource pool.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    async fn create(
        &self,
        settings: &BackendSettings,
        slot: IdentitySlot,
    ) -> Result<Box<dyn KeyValueStore>, BackendInitError>;
}
