//! Finding template aggregate.
//!
//! # Invariants
//! - A template has exactly one main translation.
//! - Translation languages are unique within one template.

use crate::model::common::{Language, ReviewStatus, SourceKind};
use crate::model::fields::FieldDocument;
use crate::model::file::UploadedFile;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type TemplateId = Uuid;
pub type TranslationId = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct FindingTemplate {
    pub id: TemplateId,
    pub tags: Vec<String>,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub translations: Vec<TemplateTranslation>,
    pub images: Vec<UploadedFile>,
}

impl FindingTemplate {
    pub fn main_translation(&self) -> Option<&TemplateTranslation> {
        self.translations.iter().find(|translation| translation.is_main)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTranslation {
    pub id: TranslationId,
    pub is_main: bool,
    pub language: Language,
    pub status: ReviewStatus,
    pub data: FieldDocument,
    pub created_at: DateTime<Utc>,
}
