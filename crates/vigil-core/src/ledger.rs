//! Dedup ledger.
//!
//! Records which `(resource, transition kind)` pairs have already been
//! notified so that a re-poll reporting the same transition, or a second
//! observer watching the same resource, stays silent. Entries never expire;
//! they are dropped only by [`Ledger::reset`] (logout, test teardown) or
//! [`Ledger::forget_resource`] (the resource was deleted and acknowledged).
//!
//! The ledger is a cheap clonable handle; all clones share one set. It is
//! created by the composition root and handed to every observer.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::transition::TransitionKind;
use crate::types::ResourceId;

/// Ledger key: a resource id paired with a transition kind.
///
/// Displays as `"<id>:<Kind>"`, e.g. `"runtime-123:EnteredError"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub resource_id: ResourceId,
    pub kind: TransitionKind,
}

impl LedgerKey {
    pub fn new(resource_id: impl Into<ResourceId>, kind: TransitionKind) -> Self {
        Self {
            resource_id: resource_id.into(),
            kind,
        }
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_id, self.kind)
    }
}

/// Shared set of already-notified transitions.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Arc<Mutex<HashSet<LedgerKey>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section is a single set operation; poisoning is ignored.
    fn entries(&self) -> MutexGuard<'_, HashSet<LedgerKey>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn has(&self, key: &LedgerKey) -> bool {
        self.entries().contains(key)
    }

    /// Record a key. Adding a key that is already present is a no-op.
    pub fn add(&self, key: LedgerKey) {
        self.entries().insert(key);
    }

    /// Atomically record `key`, returning true if it was not present.
    ///
    /// Two observers racing on the same transition both call this; exactly one
    /// gets `true` and emits.
    pub fn claim(&self, key: LedgerKey) -> bool {
        self.entries().insert(key)
    }

    /// Drop every entry for a resource.
    pub fn forget_resource(&self, resource_id: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key| key.resource_id != resource_id);
        before - entries.len()
    }

    /// Clear the ledger (session reset).
    pub fn reset(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
