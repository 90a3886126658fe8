//! Store contracts consumed by the archive engine.
//!
//! # Responsibility
//! - `DestinationStore`: create aggregates, bulk-create owned rows, look up
//!   references, and run a creation sequence as one atomic unit.
//! - `SourceStore`: load complete aggregates for export.
//!
//! # Invariants
//! - Stores assign every destination identity; drafts never carry one.
//! - Bulk creates that link rows to each other (notebook pages) receive the
//!   links as indexes into the same batch, parents before children.
//! - A failed `atomically` closure leaves no rows behind.

use crate::db::DbError;
use crate::model::common::{Language, ReviewStatus, SourceKind};
use crate::model::fields::{FieldDocument, FieldSchema};
use crate::model::file::{AttachmentKind, AttachmentOwner, FileId};
use crate::model::project::{FindingRowId, ImportedMember, NotebookPageId, Project, ProjectId};
use crate::model::project_type::{ProjectType, ProjectTypeId, SectionDefinition};
use crate::model::template::{FindingTemplate, TemplateId};
use crate::model::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    /// Connection schema is not at the expected migrated version.
    #[error("archive store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data or a draft cannot be converted.
    #[error("invalid store data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub tags: Vec<String>,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub translations: Vec<TranslationDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationDraft {
    pub is_main: bool,
    pub language: Language,
    pub status: ReviewStatus,
    pub data: FieldDocument,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTypeDraft {
    pub name: String,
    pub language: Language,
    pub report_fields: FieldSchema,
    pub report_sections: Vec<SectionDefinition>,
    pub finding_fields: FieldSchema,
    pub finding_field_order: Vec<String>,
    pub finding_ordering: Value,
    pub report_template: String,
    pub report_styles: String,
    pub report_preview_data: FieldDocument,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub project_type_id: ProjectTypeId,
    pub override_finding_order: bool,
    pub report_data: FieldDocument,
    pub imported_members: Vec<ImportedMember>,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    pub user_id: UserId,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDraft {
    pub section_id: String,
    pub assignee: Option<UserId>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindingDraft {
    pub finding_id: String,
    pub assignee: Option<UserId>,
    pub template_id: Option<TemplateId>,
    pub status: ReviewStatus,
    pub order: i64,
    pub data: FieldDocument,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPageDraft {
    pub note_id: String,
    /// Index of the parent draft within the same batch; must be lower than
    /// this draft's own index.
    pub parent_index: Option<usize>,
    pub title: String,
    pub text: String,
    pub checked: Option<bool>,
    pub icon_emoji: Option<String>,
    pub status_emoji: Option<String>,
    pub assignee: Option<UserId>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDraft {
    pub name: String,
    pub name_hash: String,
    pub content: Vec<u8>,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Write side used by importers.
pub trait DestinationStore {
    /// Runs `work` as one atomic unit: commits when it returns `Ok`, discards
    /// everything it created when it returns `Err`.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;

    fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;
    fn template_exists(&self, id: TemplateId) -> StoreResult<bool>;

    /// Creates a template together with all of its translations.
    fn create_template(&self, draft: &TemplateDraft) -> StoreResult<TemplateId>;
    fn create_project_type(&self, draft: &ProjectTypeDraft) -> StoreResult<ProjectTypeId>;
    fn link_project_type(
        &self,
        project_type_id: ProjectTypeId,
        project_id: ProjectId,
    ) -> StoreResult<()>;
    fn create_project(&self, draft: &ProjectDraft) -> StoreResult<ProjectId>;
    fn add_members(&self, project_id: ProjectId, members: &[MemberDraft]) -> StoreResult<()>;
    fn create_sections(&self, project_id: ProjectId, sections: &[SectionDraft])
        -> StoreResult<()>;
    fn create_findings(
        &self,
        project_id: ProjectId,
        findings: &[FindingDraft],
    ) -> StoreResult<Vec<FindingRowId>>;
    /// Creates pages in slice order, resolving `parent_index` to the identity
    /// assigned to that earlier draft.
    fn create_notebook_pages(
        &self,
        project_id: ProjectId,
        pages: &[NotebookPageDraft],
    ) -> StoreResult<Vec<NotebookPageId>>;
    fn create_files(
        &self,
        owner: AttachmentOwner,
        kind: AttachmentKind,
        files: &[FileDraft],
    ) -> StoreResult<Vec<FileId>>;
}

/// Read side used by exporters.
pub trait SourceStore {
    fn load_template(&self, id: TemplateId) -> StoreResult<Option<FindingTemplate>>;
    fn load_project_type(&self, id: ProjectTypeId) -> StoreResult<Option<ProjectType>>;
    fn load_project(&self, id: ProjectId) -> StoreResult<Option<Project>>;
}
