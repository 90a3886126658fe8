//! Store contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define the read and write contracts the archive engine consumes.
//! - Isolate SQLite query details from archive orchestration.
//!
//! # Invariants
//! - Stores assign every destination identity.
//! - Store APIs return semantic errors (`InvalidData`) in addition to DB
//!   transport errors.

pub mod sqlite_store;
pub mod store;
