//! Dynamically loaded storage backends.
//!
//! A plugin is a `cdylib` built against this crate that exports two symbols:
//! `COA_STORE_PLUGIN_ABI` (a `u32` equal to [`COA_STORE_PLUGIN_ABI_VERSION`])
//! and `NewKeyValueStore` (a [`NewKeyValueStoreFn`]). Use
//! [`export_store_plugin!`](crate::export_store_plugin) to declare both.
//!
//! The plugin must be compiled with the same toolchain and the same version of
//! this crate as the server, since trait objects cross the library boundary.

use std::path::Path;

use async_trait::async_trait;
use libloading::Library;

use crate::domain::IdentitySlot;

use super::{BackendInitError, BackendSettings, KeyValueStore, StoreFactory};

/// Bumped whenever [`KeyValueStore`] or [`NewKeyValueStoreFn`] changes shape
pub const COA_STORE_PLUGIN_ABI_VERSION: u32 = 1;

pub const FACTORY_SYMBOL: &str = "NewKeyValueStore";
pub const ABI_SYMBOL: &str = "COA_STORE_PLUGIN_ABI";

/// Signature of the factory a plugin exports
pub type NewKeyValueStoreFn =
    fn(&BackendSettings, IdentitySlot) -> Result<Box<dyn KeyValueStore>, BackendInitError>;

/// Store factory resolved from a dynamic library at startup.
///
/// The exported factory is synchronous and may block (dialing a database,
/// reading files), so every call runs on tokio's blocking pool.
pub struct PluginStoreFactory {
    new_store: NewKeyValueStoreFn,
}

impl PluginStoreFactory {
    /// Open the library, check its ABI version and resolve the factory.
    ///
    /// The library is never unloaded: stores it creates carry vtables that
    /// live inside it, and those stores outlive any single owner.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackendInitError> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: opening runs the library's initialisers. The plugin path
        // comes from operator configuration and is trusted.
        let library = unsafe { Library::new(&path) }.map_err(|source| BackendInitError::Open {
            path: path.clone(),
            source,
        })?;
        let library: &'static Library = Box::leak(Box::new(library));

        // SAFETY: the symbol is declared by `export_store_plugin!` as a `u32` static.
        let abi = unsafe { library.get::<*const u32>(ABI_SYMBOL.as_bytes()) }.map_err(
            |source| BackendInitError::MissingSymbol {
                path: path.clone(),
                symbol: ABI_SYMBOL,
                source,
            },
        )?;
        let found = unsafe { **abi };
        if found != COA_STORE_PLUGIN_ABI_VERSION {
            return Err(BackendInitError::AbiMismatch {
                expected: COA_STORE_PLUGIN_ABI_VERSION,
                found,
            });
        }

        // SAFETY: the ABI version check above guarantees the exported function
        // was declared with the current `NewKeyValueStoreFn` signature.
        let new_store = unsafe { library.get::<NewKeyValueStoreFn>(FACTORY_SYMBOL.as_bytes()) }
            .map_err(|source| BackendInitError::MissingSymbol {
                path: path.clone(),
                symbol: FACTORY_SYMBOL,
                source,
            })?;
        let new_store = *new_store;

        tracing::info!(path = %path.display(), "Loaded storage plugin");

        Ok(Self { new_store })
    }
}

#[async_trait]
impl StoreFactory for PluginStoreFactory {
    fn name(&self) -> &str {
        "plugin"
    }

    async fn create(
        &self,
        settings: &BackendSettings,
        slot: IdentitySlot,
    ) -> Result<Box<dyn KeyValueStore>, BackendInitError> {
        let new_store = self.new_store;
        let settings = settings.clone();

        tokio::task::spawn_blocking(move || new_store(&settings, slot))
            .await
            .map_err(BackendInitError::factory)?
    }
}

/// Export the symbols a storage plugin needs.
///
/// ```ignore
/// fn new_store(
///     settings: &coa_server::store::BackendSettings,
///     slot: coa_server::domain::IdentitySlot,
/// ) -> Result<Box<dyn coa_server::store::KeyValueStore>, coa_server::store::BackendInitError> {
///     todo!()
/// }
///
/// coa_server::export_store_plugin!(new_store);
/// ```
#[macro_export]
macro_rules! export_store_plugin {
    ($factory:path) => {
        #[no_mangle]
        pub static COA_STORE_PLUGIN_ABI: u32 = $crate::store::COA_STORE_PLUGIN_ABI_VERSION;

        #[no_mangle]
        #[allow(non_snake_case)]
        pub fn NewKeyValueStore(
            settings: &$crate::store::BackendSettings,
            slot: $crate::domain::IdentitySlot,
        ) -> ::std::result::Result<
            ::std::boxed::Box<dyn $crate::store::KeyValueStore>,
            $crate::store::BackendInitError,
        > {
            $factory(settings, slot)
        }

        const _: $crate::store::NewKeyValueStoreFn = NewKeyValueStore;
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_rejected() {
        let err = PluginStoreFactory::load("/nonexistent/libcoa_store_missing.so")
            .err()
            .unwrap();
        assert!(matches!(err, BackendInitError::Open { .. }));
        assert!(err.to_string().contains("libcoa_store_missing.so"));
    }

    mod exported {
        use crate::domain::IdentitySlot;
        use crate::store::{BackendInitError, BackendSettings, KeyValueStore};

        fn failing_store(
            settings: &BackendSettings,
            _slot: IdentitySlot,
        ) -> Result<Box<dyn KeyValueStore>, BackendInitError> {
            Err(BackendInitError::InvalidSettings(format!(
                "{} keys",
                settings.len()
            )))
        }

        crate::export_store_plugin!(failing_store);
    }

    #[test]
    fn test_exported_symbols() {
        assert_eq!(exported::COA_STORE_PLUGIN_ABI, COA_STORE_PLUGIN_ABI_VERSION);

        let err = exported::NewKeyValueStore(&BackendSettings::new(), IdentitySlot::new())
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Invalid backend settings: 0 keys");
    }
}
