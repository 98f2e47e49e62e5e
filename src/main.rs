//! coa_server - chart of accounts HTTP front end
//!
//! Authenticates callers with OpenID Connect identity tokens and stores
//! charts of accounts through a pluggable key-value backend.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coa_server::auth::{Authenticator, OidcVerifier};
use coa_server::config::{BackendKind, CoaStoreConfig, ConfigError};
use coa_server::pool::RepositoryPool;
use coa_server::store::{MemoryStoreFactory, PluginStoreFactory, StoreFactory};
use coa_server::{api, AppContext, Config};

const DEFAULT_CONFIG_FILE: &str = "coa.toml";

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coa_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// First CLI argument, then `CONFIG_PATH`, then `coa.toml` if present
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("CONFIG_PATH"))
        .map(PathBuf::from)
        .or_else(|| {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            default.exists().then(|| default.to_path_buf())
        })
}

/// Resolve the storage backend. Any failure here is fatal.
fn build_store_factory(config: &CoaStoreConfig) -> Result<Arc<dyn StoreFactory>, anyhow::Error> {
    match config.backend {
        BackendKind::Memory => {
            tracing::warn!("Using in-memory storage backend; data is lost on restart");
            Ok(Arc::new(MemoryStoreFactory::new()))
        }
        BackendKind::Plugin => {
            let path = config
                .plugin_file
                .as_ref()
                .ok_or(ConfigError::MissingValue("coa_store.plugin_file"))?;
            Ok(Arc::new(PluginStoreFactory::load(path)?))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    let Some(path) = config_path() else {
        let program = std::env::args().next().unwrap_or_else(|| "coa_server".to_string());
        let program = Path::new(&program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(program);
        eprintln!("usage: {} settings", program);
        return Ok(());
    };

    // Load configuration
    let mut config = Config::load(&path)?;
    config.apply_env_overrides()?;
    let addr: SocketAddr = config.bind_addr().parse()?;

    tracing::info!(config = %path.display(), "Starting coa_server");

    let factory = build_store_factory(&config.coa_store)?;

    tracing::info!(provider = %config.openid.provider, "Discovering identity provider...");
    let verifier = OidcVerifier::discover(&config.openid.provider, config.openid.client_id.clone())
        .await
        .context("identity provider discovery failed")?;

    let pool = RepositoryPool::with_max_idle(
        factory,
        config.coa_store.settings.clone(),
        config.coa_store.max_idle,
    );
    let ctx = AppContext::new(Authenticator::new(Arc::new(verifier)), pool);

    tracing::info!(backend = ctx.pool.backend_name(), "Storage backend ready");
    tracing::info!("Listening on http://{}", addr);

    let app = api::build_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down. Goodbye!");

    Ok(())
}

/// Resolves once the process is asked to stop; in-flight requests then drain
async fn shutdown_signal() {
    let signal = wait_for_signal().await;
    tracing::info!(signal, "Shutting down, draining in-flight requests");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            name = ctrl_c() => name,
            _ = sigterm.recv() => "SIGTERM",
        },
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGTERM, only Ctrl+C stops the server");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
