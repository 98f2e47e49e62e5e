//! Storage plugin serving every store from one in-process map.

use std::sync::OnceLock;

use coa_server::domain::IdentitySlot;
use coa_server::store::{BackendInitError, BackendSettings, KeyValueStore, MemoryStoreFactory};

fn shared() -> &'static MemoryStoreFactory {
    static FACTORY: OnceLock<MemoryStoreFactory> = OnceLock::new();
    FACTORY.get_or_init(MemoryStoreFactory::new)
}

fn new_store(
    settings: &BackendSettings,
    slot: IdentitySlot,
) -> Result<Box<dyn KeyValueStore>, BackendInitError> {
    if let Some(reason) = settings.get("reject") {
        return Err(BackendInitError::InvalidSettings(reason.to_string()));
    }
    Ok(Box::new(shared().store(slot)))
}

coa_server::export_store_plugin!(new_store);
