//! Core engine for exporting and importing pentest projects, finding
//! templates and project types as portable archives.

pub mod archive;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use archive::{
    ArchiveBundle, ArchiveError, ArchiveResult, ImportedRoot, ImporterRegistry,
    UndefinedFieldPolicy,
};
pub use config::ArchiveOptions;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::format::{ArchiveKind, FormatTag};
pub use repo::sqlite_store::SqliteArchiveStore;
pub use repo::store::{DestinationStore, SourceStore, StoreError, StoreResult};
pub use service::archive_service::ArchiveService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
