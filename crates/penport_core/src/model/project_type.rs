//! Project type aggregate: the field schemas and report design a project uses.

use crate::model::common::{Language, SourceKind};
use crate::model::fields::{FieldDocument, FieldSchema};
use crate::model::file::UploadedFile;
use crate::model::project::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type ProjectTypeId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectType {
    pub id: ProjectTypeId,
    pub name: String,
    pub language: Language,
    pub report_fields: FieldSchema,
    pub report_sections: Vec<SectionDefinition>,
    pub finding_fields: FieldSchema,
    pub finding_field_order: Vec<String>,
    /// Sort keys for findings, opaque to the archive engine.
    pub finding_ordering: Value,
    pub report_template: String,
    pub report_styles: String,
    pub report_preview_data: FieldDocument,
    pub source: SourceKind,
    /// Project this type was imported alongside, if any.
    pub linked_project: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assets: Vec<UploadedFile>,
}

/// Report section declared by a project type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub id: String,
    /// Label, field list and other layout attributes, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SectionDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}
