//! Reference counter protocol and its two strategies

use core::sync::atomic::{AtomicU32, Ordering};

use crate::lock::DomainLock;

/// Counter storage shared by both strategies.
///
/// The locked strategy only performs plain atomic load/store on it, which
/// is all that cores without read-modify-write instructions provide.
pub type RefCount = AtomicU32;

/// Outcome of a single release on a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Count was already zero; nothing changed.
    AlreadyZero,
    /// Count decremented and live references remain.
    Remaining,
    /// This call performed the one-to-zero transition. Exactly one release
    /// per counter lifetime reports this.
    ReachedZero,
}

/// The refcount protocol both strategies must satisfy.
///
/// - `try_acquire` adds one reference and fails if the count is currently
///   zero; zero is a sink, so a failed acquire is final for that call.
/// - `release` removes one reference and never underflows.
///
/// Successful operations publish their memory effects with at least
/// acquire/release ordering, so a reference handed between contexts is
/// safe to use on arrival.
pub trait RefCountPolicy {
    fn try_acquire(count: &RefCount, lock: &DomainLock) -> bool;
    fn release(count: &RefCount, lock: &DomainLock) -> ReleaseOutcome;
}

/// Lock-free strategy for cores with compare-and-swap.
pub struct CasPolicy;

impl RefCountPolicy for CasPolicy {
    fn try_acquire(count: &RefCount, _lock: &DomainLock) -> bool {
        let mut observed = count.load(Ordering::Relaxed);
        loop {
            if observed == 0 {
                return false;
            }
            match count.compare_exchange_weak(
                observed,
                observed + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => observed = actual,
            }
        }
    }

    fn release(count: &RefCount, _lock: &DomainLock) -> ReleaseOutcome {
        let mut observed = count.load(Ordering::Relaxed);
        loop {
            if observed == 0 {
                return ReleaseOutcome::AlreadyZero;
            }
            // The winner of the 1 -> 0 exchange must also observe every
            // prior release, hence AcqRel on that transition.
            let success = if observed == 1 {
                Ordering::AcqRel
            } else {
                Ordering::Release
            };
            match count.compare_exchange_weak(observed, observed - 1, success, Ordering::Relaxed) {
                Ok(_) if observed == 1 => return ReleaseOutcome::ReachedZero,
                Ok(_) => return ReleaseOutcome::Remaining,
                Err(actual) => observed = actual,
            }
        }
    }
}

/// Critical-section strategy for cores without atomic read-modify-write.
///
/// Every counter in the registry shares the registry's one lock; the
/// section holds for a single load plus a single store.
pub struct LockedPolicy;

impl RefCountPolicy for LockedPolicy {
    fn try_acquire(count: &RefCount, lock: &DomainLock) -> bool {
        let _cs = lock.enter();
        let current = count.load(Ordering::Relaxed);
        if current == 0 {
            return false;
        }
        count.store(current + 1, Ordering::Relaxed);
        true
    }

    fn release(count: &RefCount, lock: &DomainLock) -> ReleaseOutcome {
        let _cs = lock.enter();
        match count.load(Ordering::Relaxed) {
            0 => ReleaseOutcome::AlreadyZero,
            1 => {
                count.store(0, Ordering::Relaxed);
                ReleaseOutcome::ReachedZero
            }
            current => {
                count.store(current - 1, Ordering::Relaxed);
                ReleaseOutcome::Remaining
            }
        }
    }
}
