//! Sync integration tests
//!
//! Full reconciliation runs against an in-memory registry client. The tests
//! are organized by concern.

pub mod fake_registry;
pub mod tag_registry;
