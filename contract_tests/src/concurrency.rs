//! Concurrency contract tests
//!
//! The refcount primitives are the only operations designed for
//! concurrent use on one object; these tests exercise them from real
//! threads: matched get/put pairs must net to zero, and once the count
//! legitimately reaches zero no context may ever acquire again.
