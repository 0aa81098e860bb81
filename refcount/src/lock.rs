//! Registry critical-section primitive

use spin::{Mutex, MutexGuard};

/// Mutual-exclusion domain shared by every object registered to one
/// registry.
///
/// Coarse by design: the targets this models run a handful of concurrent
/// contexts, and the section only ever protects a constant-time counter
/// update, so one lock per registry is enough. Contended entry busy-waits
/// for a bounded, short time.
pub struct DomainLock {
    inner: Mutex<()>,
}

impl DomainLock {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Enters the critical section until the guard is dropped.
    ///
    /// Callers must not invoke callbacks or block while holding the guard.
    pub fn enter(&self) -> DomainGuard<'_> {
        DomainGuard {
            _guard: self.inner.lock(),
        }
    }
}

impl Default for DomainLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for a [`DomainLock`] critical section.
pub struct DomainGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}
