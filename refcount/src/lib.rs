//! # Refcount
//!
//! This crate defines the reference-counting capability used by the object
//! engine, with two interchangeable strategies.
//!
//! ## Philosophy
//!
//! **Concurrency strategy is a hardware capability, not a value.**
//!
//! Some target cores have atomic compare-and-swap; some (Cortex-M0/M0+)
//! only have atomic load and store. Both kinds must run the same object
//! engine, so the counter protocol is a trait with one implementation per
//! capability, selected at build time by cargo feature and never at
//! runtime.
//!
//! ## Design Principles
//!
//! 1. **One contract, two strategies**: `CasPolicy` and `LockedPolicy`
//!    satisfy the same [`RefCountPolicy`] contract and are tested against
//!    the same properties
//! 2. **Zero is a sink**: once a counter reaches zero, no acquire may
//!    succeed on it again
//! 3. **Short critical sections**: the lock only ever protects a
//!    constant-time check-and-update; callbacks never run under it

pub mod lock;
pub mod policy;

pub use lock::{DomainGuard, DomainLock};
pub use policy::{CasPolicy, LockedPolicy, RefCount, RefCountPolicy, ReleaseOutcome};

/// Strategy selected for this build.
#[cfg(feature = "locked")]
pub type ActivePolicy = LockedPolicy;

/// Strategy selected for this build.
#[cfg(not(feature = "locked"))]
pub type ActivePolicy = CasPolicy;
