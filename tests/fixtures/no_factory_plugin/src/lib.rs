//! Plugin that declares the current interface but no store factory.

#[no_mangle]
pub static COA_STORE_PLUGIN_ABI: u32 = coa_server::store::COA_STORE_PLUGIN_ABI_VERSION;
