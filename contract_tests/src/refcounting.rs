//! Refcount protocol contract tests
//!
//! These tests define the stable get/put contract: counts start at one,
//! matched pairs restore the prior value, zero is a sink, and releases
//! never underflow.
