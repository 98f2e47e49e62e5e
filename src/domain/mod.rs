//! Domain module
//!
//! Entities, caller identity and the repository the request pipeline calls into.

pub mod entities;
pub mod error;
pub mod identity;
pub mod repository;

pub use entities::{Account, ChartOfAccounts};
pub use error::DomainError;
pub use identity::{CallerIdentity, IdentitySlot};
pub use repository::CoaRepository;
