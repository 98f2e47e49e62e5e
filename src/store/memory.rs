//! In-process key-value backend.
//!
//! All stores built by one factory share a single ordered map. Keys are
//! namespaced by the identity bound in each store's slot, so a handle leased
//! to one caller never sees another caller's records.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::IdentitySlot;

use super::{BackendInitError, BackendSettings, KeyValueStore, StoreError, StoreFactory};

/// Separates the identity namespace from the caller-visible key
const NAMESPACE_SEPARATOR: char = '\u{1f}';

type SharedMap = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStoreFactory {
    data: SharedMap,
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle over the shared map that reads its namespace from `slot`
    pub fn store(&self, slot: IdentitySlot) -> MemoryStore {
        MemoryStore {
            data: self.data.clone(),
            slot,
        }
    }

    /// Number of records across all callers
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }
}

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(
        &self,
        _settings: &BackendSettings,
        slot: IdentitySlot,
    ) -> Result<Box<dyn KeyValueStore>, BackendInitError> {
        Ok(Box::new(self.store(slot)))
    }
}

pub struct MemoryStore {
    data: SharedMap,
    slot: IdentitySlot,
}

impl MemoryStore {
    fn namespace(&self) -> Result<String, StoreError> {
        let identity = self.slot.current().ok_or(StoreError::NoIdentity)?;
        Ok(format!("{}{}", identity.as_str(), NAMESPACE_SEPARATOR))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let full = self.namespace()? + key;
        Ok(self.data.read().await.get(&full).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let full = self.namespace()? + key;
        self.data.write().await.insert(full, value);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let namespace = self.namespace()?;
        let start = format!("{}{}", namespace, prefix);
        let map = self.data.read().await;

        Ok(map
            .range(start.clone()..)
            .take_while(|(k, _)| k.starts_with(&start))
            .map(|(k, v)| (k[namespace.len()..].to_string(), v.clone()))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let full = self.namespace()? + key;
        Ok(self.data.write().await.remove(&full).is_some())
    }
}
