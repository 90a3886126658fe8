//! Pentest project aggregate and the entities it owns.
//!
//! # Invariants
//! - Sections, findings, notebook pages and attachments never outlive their project.
//! - A notebook page's `parent_id` always points at a page of the same project.
//! - `finding_id`, `section_id` and `note_id` are unique within one project.

use crate::model::common::{Language, ReviewStatus, SourceKind};
use crate::model::fields::FieldDocument;
use crate::model::file::UploadedFile;
use crate::model::project_type::ProjectType;
use crate::model::template::TemplateId;
use crate::model::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type ProjectId = Uuid;
pub type FindingRowId = Uuid;
pub type NotebookPageId = Uuid;

/// Snapshot of a member whose account does not exist in this system.
pub type ImportedMember = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub language: Language,
    pub tags: Vec<String>,
    pub project_type: ProjectType,
    pub override_finding_order: bool,
    pub report_data: FieldDocument,
    pub members: Vec<ProjectMember>,
    pub imported_members: Vec<ImportedMember>,
    pub sections: Vec<ReportSection>,
    pub findings: Vec<Finding>,
    pub notes: Vec<NotebookPage>,
    pub images: Vec<UploadedFile>,
    pub files: Vec<UploadedFile>,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member backed by a local user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMember {
    pub user: User,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub section_id: String,
    pub assignee: Option<UserId>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub id: FindingRowId,
    pub finding_id: String,
    pub assignee: Option<UserId>,
    pub template_id: Option<TemplateId>,
    pub status: ReviewStatus,
    pub order: i64,
    pub data: FieldDocument,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPage {
    pub id: NotebookPageId,
    pub note_id: String,
    pub parent_id: Option<NotebookPageId>,
    pub title: String,
    pub text: String,
    pub checked: Option<bool>,
    pub icon_emoji: Option<String>,
    pub status_emoji: Option<String>,
    pub assignee: Option<UserId>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
}
