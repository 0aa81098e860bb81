//! Diagnostic serialization contract tests
//!
//! Error kinds and object names cross diagnostic boundaries serialized;
//! these snapshots pin the wire shape so it doesn't drift.
