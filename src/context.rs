//! Application context
//!
//! Process-wide collaborators built once at startup and shared by every
//! request as router state.

use crate::auth::Authenticator;
use crate::pool::RepositoryPool;

#[derive(Clone)]
pub struct AppContext {
    pub authenticator: Authenticator,
    pub pool: RepositoryPool,
}

impl AppContext {
    pub fn new(authenticator: Authenticator, pool: RepositoryPool) -> Self {
        Self {
            authenticator,
            pool,
        }
    }
}
