//! Resource Pool
//!
//! Reusable repositories, each wrapping one store handle from the
//! configured backend. A repository is lent to exactly one request at a time
//! through a [`Lease`], which rebinds the caller identity on checkout and
//! returns the repository to the pool when dropped.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{CallerIdentity, CoaRepository, IdentitySlot};
use crate::store::{BackendInitError, BackendSettings, StoreFactory};

/// Idle repositories kept for reuse when no limit is configured
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Errors that can occur while leasing a repository
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Storage backend unavailable: {0}")]
    Backend(#[from] BackendInitError),
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub created: u64,
    pub acquired: u64,
    pub released: u64,
    pub discarded: u64,
    pub idle: usize,
}

impl PoolStats {
    /// Leases currently held by requests
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

struct PooledRepository {
    repository: CoaRepository,
    slot: IdentitySlot,
}

struct PoolInner {
    factory: Arc<dyn StoreFactory>,
    settings: BackendSettings,
    max_idle: usize,
    idle: Mutex<Vec<PooledRepository>>,
    created: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<PooledRepository>> {
        // The list is only pushed and popped, so a poisoned lock is still consistent
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, pooled: PooledRepository) {
        pooled.slot.clear();

        let mut idle = self.idle();
        if idle.len() < self.max_idle {
            idle.push(pooled);
        } else {
            drop(idle);
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(max_idle = self.max_idle, "Idle pool full, discarding repository");
        }
        self.released.fetch_add(1, Ordering::Release);
    }
}

/// Concurrency-safe pool of repositories. Cloning shares the same pool.
#[derive(Clone)]
pub struct RepositoryPool {
    inner: Arc<PoolInner>,
}

impl RepositoryPool {
    pub fn new(factory: Arc<dyn StoreFactory>, settings: BackendSettings) -> Self {
        Self::with_max_idle(factory, settings, DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(
        factory: Arc<dyn StoreFactory>,
        settings: BackendSettings,
        max_idle: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory,
                settings,
                max_idle,
                idle: Mutex::new(Vec::new()),
                created: AtomicU64::new(0),
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Lease a repository bound to `identity`.
    ///
    /// Reuses an idle repository when one is available, otherwise builds a
    /// new store through the backend factory.
    pub async fn acquire(&self, identity: CallerIdentity) -> Result<Lease, PoolError> {
        let reused = self.inner.idle().pop();
        let pooled = match reused {
            Some(pooled) => pooled,
            None => self.create().await?,
        };

        pooled.slot.bind(identity.clone());
        self.inner.acquired.fetch_add(1, Ordering::Relaxed);

        Ok(Lease {
            pooled: Some(pooled),
            identity,
            pool: self.inner.clone(),
        })
    }

    /// Counters are read without a common lock. `released` is read before
    /// `acquired` so a snapshot never shows more releases than acquisitions.
    pub fn stats(&self) -> PoolStats {
        let released = self.inner.released.load(Ordering::Acquire);
        PoolStats {
            created: self.inner.created.load(Ordering::Relaxed),
            acquired: self.inner.acquired.load(Ordering::Acquire),
            released,
            discarded: self.inner.discarded.load(Ordering::Relaxed),
            idle: self.inner.idle().len(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.inner.factory.name()
    }

    async fn create(&self) -> Result<PooledRepository, PoolError> {
        let slot = IdentitySlot::new();
        let store = match self
            .inner
            .factory
            .create(&self.inner.settings, slot.clone())
            .await
        {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(backend = self.backend_name(), error = %e, "Failed to create store handle");
                return Err(e.into());
            }
        };

        let created = self.inner.created.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(backend = self.backend_name(), created, "Created store handle");

        Ok(PooledRepository {
            repository: CoaRepository::new(store),
            slot,
        })
    }
}

/// Exclusive checkout of a pooled repository.
///
/// A lease cannot be cloned, so the repository it holds is used by one
/// request only. Dropping the lease clears the identity and returns the
/// repository to the pool.
pub struct Lease {
    pooled: Option<PooledRepository>,
    identity: CallerIdentity,
    pool: Arc<PoolInner>,
}

impl Lease {
    /// Caller this lease was issued to
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Identity the underlying store currently sees
    pub fn bound_identity(&self) -> Option<Arc<CallerIdentity>> {
        self.pooled().slot.current()
    }

    fn pooled(&self) -> &PooledRepository {
        self.pooled.as_ref().expect("lease used after release")
    }
}

impl Deref for Lease {
    type Target = CoaRepository;

    fn deref(&self) -> &CoaRepository {
        &self.pooled().repository
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.pool.release(pooled);
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
