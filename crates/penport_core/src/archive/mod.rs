//! Archive engine: export aggregates to portable archives and import them
//! into a destination store.
//!
//! # Responsibility
//! - Map aggregates to versioned documents plus source-id-keyed attachments.
//! - Rebuild aggregates under fresh identities, reconciling dynamic field
//!   documents and resolving references leniently.
//!
//! # Invariants
//! - One archive imports atomically or not at all.
//! - Source ids never become destination identities.

pub mod bundle;
pub mod document;
pub mod error;
pub mod export;
pub mod import;
pub mod reconcile;
pub mod registry;
pub mod resolve;
pub mod tree;

pub use bundle::{archive_path, validate_filename, ArchiveBundle, FileBundler};
pub use error::{ArchiveError, ArchiveResult};
pub use export::Exporter;
pub use reconcile::{reconcile, UndefinedFieldPolicy};
pub use registry::{DocumentImporter, ImportContext, ImportedRoot, ImporterRegistry};
