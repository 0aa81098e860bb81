//! # Object Model
//!
//! Reference-counted object lifecycle engine for embedded-style targets.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: every engine call takes a registry
//!   handle; there is no ambient global beyond the explicitly-initialized
//!   default registry
//! - **Zero is a sink**: once an object's count reaches zero it can never
//!   be revived; `get` fails instead of resurrecting
//! - **Mechanism not policy**: the engine stores one parent link and fires
//!   hooks; concrete types that need enumerable children keep that storage
//!   themselves behind the hook contract
//! - **No cycle collection**: a cycle through parent links is a caller
//!   error, never something the engine scans for
//!
//! ## Core Concepts
//!
//! - [`Object`]: the unit of sharing: count, parent link, type, flags,
//!   fixed-capacity name
//! - [`ObjectType`]: static descriptor with a mandatory `release` and
//!   optional attach/detach hooks
//! - [`Registry`]: a lock/allocation domain; all engine operations are
//!   methods on it
//! - [`setup`] / [`default_registry`]: one-time construction of the
//!   process-wide default registry

pub mod error;
pub mod name;
pub mod object;
pub mod registry;

pub use error::ObjectError;
pub use name::{ObjectName, OBJECT_NAME_CAPACITY};
pub use object::{Object, ObjectType};
pub use registry::{default_registry, setup, AllocFn, FreeFn, Registry};
