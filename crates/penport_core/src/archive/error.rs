//! Failure taxonomy of the archive engine.
//!
//! # Invariants
//! - Every fatal variant names the entity kind and source-local id when one
//!   is known, so callers can point at the offending fragment.
//! - Unresolvable references are not errors and have no variant here.

use crate::repo::store::StoreError;
use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Document format tag does not belong to the invoked importer.
    #[error("format mismatch: expected {expected}, found `{found}`")]
    FormatMismatch { expected: String, found: String },

    /// Structurally invalid fragment.
    #[error("invalid {kind} `{id}`: {message}")]
    Validation {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// Attachment name would escape its archive directory.
    #[error("invalid attachment name `{}`", .name.escape_default())]
    InvalidFilename { name: String },

    /// Notebook pages do not form a forest.
    #[error("invalid notebook hierarchy: {message}")]
    InvalidHierarchy { message: String },

    /// Archive lacks the bytes for a referenced attachment.
    #[error("{kind} `{id}` references missing archive entry `{path}`")]
    MissingAttachment {
        kind: &'static str,
        id: String,
        path: String,
    },

    /// Archive entry is not a well-formed document.
    #[error("malformed document `{path}`: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Export requested for an entity the source store does not have.
    #[error("{kind} not found: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error("archive container error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ArchiveError {
    pub(crate) fn validation(
        kind: &'static str,
        id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            kind,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Archive defects the caller can fix by supplying a different archive
    /// or request, as opposed to store and environment failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::FormatMismatch { .. }
                | Self::Validation { .. }
                | Self::InvalidFilename { .. }
                | Self::InvalidHierarchy { .. }
                | Self::MissingAttachment { .. }
                | Self::MalformedDocument { .. }
                | Self::UnknownEntity { .. }
                | Self::Archive(_)
        )
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FormatMismatch { .. } => "FORMAT_MISMATCH",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::InvalidFilename { .. } => "INVALID_FILENAME",
            Self::InvalidHierarchy { .. } => "INVALID_HIERARCHY",
            Self::MissingAttachment { .. } => "MISSING_ATTACHMENT",
            Self::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            Self::UnknownEntity { .. } => "UNKNOWN_ENTITY",
            Self::Archive(_) => "ARCHIVE_CONTAINER_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}
