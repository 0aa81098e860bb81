//! # Engine Contract Tests
//!
//! This crate provides "golden" tests for the object engine's contracts
//! to ensure they don't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: the refcount and hierarchy protocols are
//!   written down as code
//! - **Testability first**: contract tests fail when observable behavior
//!   changes
//! - **Concurrency is part of the contract**: the zero-guard and net-zero
//!   properties are exercised under real thread interleavings
//!
//! ## Structure
//!
//! - `refcounting`: get/put protocol and the resurrection guard
//! - `hierarchy`: add/del sequencing, hook ordering, name contract
//! - `concurrency`: multi-thread net-zero and race-to-zero properties
//! - `diagnostics`: serde snapshots of diagnostic-facing types

pub mod concurrency;
pub mod diagnostics;
pub mod hierarchy;
pub mod refcounting;

/// Common fixtures for engine contract tests
pub mod test_helpers {
    use object_model::{Object, ObjectType};

    pub fn noop_release(_obj: &Object) {}

    /// A type with no hooks and a no-op release, for tests that only
    /// exercise counting.
    pub static PASSIVE_TYPE: ObjectType = ObjectType {
        name: "passive",
        release: noop_release,
        on_attach: None,
        on_child_attach: None,
        on_child_detach: None,
    };
}
