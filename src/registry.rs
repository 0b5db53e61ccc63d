//! The process-wide adapter cache, one entry per backend identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::StorageAdapter;
use crate::identity::BackendKind;

/// Keyed store of constructed adapters.
///
/// Created at application start and shared by handle: cloning a registry
/// shares the underlying store. At most one adapter is ever constructed per
/// identity for the life of the process; entries are never evicted or
/// replaced.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: RwLock<HashMap<BackendKind, Arc<dyn StorageAdapter>>>,
    // Serializes first-time construction so a check-then-build race cannot
    // construct the same identity twice.
    build: Mutex<()>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapter bound to `kind`, if one has been constructed.
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn StorageAdapter>> {
        self.inner
            .entries
            .read()
            .expect("poisoned lock")
            .get(&kind)
            .cloned()
    }

    /// Bind `adapter` to `kind`.
    ///
    /// The first binding for an identity wins; later calls for the same
    /// identity leave the existing entry in place.
    pub fn insert(&self, kind: BackendKind, adapter: Arc<dyn StorageAdapter>) {
        self.inner
            .entries
            .write()
            .expect("poisoned lock")
            .entry(kind)
            .or_insert(adapter);
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.inner
            .entries
            .read()
            .expect("poisoned lock")
            .contains_key(&kind)
    }

    /// Number of bound identities.
    pub fn len(&self) -> usize {
        self.inner.entries.read().expect("poisoned lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the construction guard.
    ///
    /// Held by the resolver across probe and build so concurrent first-time
    /// resolutions construct exactly once. Construction is in-memory wrapper
    /// creation, so hold times stay short.
    pub(crate) fn build_guard(&self) -> MutexGuard<'_, ()> {
        self.inner.build.lock().expect("poisoned lock")
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.read().expect("poisoned lock");
        f.debug_struct("AdapterRegistry")
            .field("bound", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
