//! Object engine error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the object engine.
///
/// Every engine entry point returns a status instead of panicking; the
/// caller decides whether to retry, abandon, or propagate. The engine
/// itself never retries. The one exception is calling any entry point on
/// an object that was never initialized, which is a contract violation
/// and panics.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectError {
    /// Name format was empty or failed to render
    #[error("invalid object name format")]
    InvalidName,

    /// Registry allocator exhausted
    #[error("registry allocator exhausted")]
    NoMemory,

    /// Acquire attempted on an object whose count already reached zero
    #[error("object is no longer available")]
    NoResource,

    /// Attach attempted on an object that already has a parent
    #[error("object is already attached to a parent")]
    AlreadyAttached,

    /// Detach attempted on an object that has no parent
    #[error("object is not attached to a parent")]
    NotAttached,

    /// Default registry used before `setup()`
    #[error("default object registry is not initialized")]
    RegistryNotReady,
}
