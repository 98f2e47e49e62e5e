//! Plugin built against a newer store interface than the server's.

#[no_mangle]
pub static COA_STORE_PLUGIN_ABI: u32 = coa_server::store::COA_STORE_PLUGIN_ABI_VERSION + 1;
