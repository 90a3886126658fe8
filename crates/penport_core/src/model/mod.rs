//! Domain model for archived aggregates.
//!
//! # Responsibility
//! - Define the destination-side shapes of templates, project types and projects.
//! - Keep dynamic field documents and their schemas explicit and separate.
//!
//! # Invariants
//! - Aggregate roots own their nested collections.
//! - Destination identities are `uuid` values assigned by the store.

pub mod common;
pub mod fields;
pub mod format;
pub mod file;
pub mod project;
pub mod project_type;
pub mod template;
pub mod user;
