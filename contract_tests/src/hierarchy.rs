//! Hierarchy protocol contract tests
//!
//! The full attach/detach sequence from the engine's contract: naming,
//! counted parent edge, hook ordering, and the unattached/attached state
//! machine.
