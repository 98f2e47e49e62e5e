//! Caller Identity
//!
//! The verified identity of the user behind a request, and the slot through
//! which a pooled store handle learns whose data it is serving.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

/// Verified, unique identifier of the authenticated caller (an email address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallerIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity slot shared between a pooled repository and the store it wraps.
///
/// Only the pool writes to the slot (on lease and on release). Stores read
/// it on every operation to scope keys to the current caller.
#[derive(Debug, Clone, Default)]
pub struct IdentitySlot {
    inner: Arc<ArcSwapOption<CallerIdentity>>,
}

impl IdentitySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity bound by the current lease, if any
    pub fn current(&self) -> Option<Arc<CallerIdentity>> {
        self.inner.load_full()
    }

    pub(crate) fn bind(&self, identity: CallerIdentity) {
        self.inner.store(Some(Arc::new(identity)));
    }

    pub(crate) fn clear(&self) {
        self.inner.store(None);
    }
}
