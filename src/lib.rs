//! coa_server Library
//!
//! Re-exports modules for the server binary, integration tests and storage
//! plugins.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod domain;
mod error;
pub mod pool;
pub mod store;

pub use config::Config;
pub use context::AppContext;
pub use domain::{Account, CallerIdentity, ChartOfAccounts, CoaRepository, DomainError};
pub use error::{AppError, AppResult};
