//! Per-call options for export and import operations.

use crate::model::user::UserId;

/// Options recognized by every exporter and importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// When false, project notebooks and project files are left out of both
    /// export and import.
    pub export_all: bool,
    /// Recorded as uploader on every attachment created by an import.
    pub uploaded_by: Option<UserId>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            export_all: true,
            uploaded_by: None,
        }
    }
}

impl ArchiveOptions {
    /// Options for partial exports meant to be shared outside the team.
    pub fn shareable() -> Self {
        Self {
            export_all: false,
            ..Self::default()
        }
    }

    pub fn with_uploaded_by(mut self, user_id: UserId) -> Self {
        self.uploaded_by = Some(user_id);
        self
    }
}
