//! Uploaded attachments and their polymorphic owners.
//!
//! # Invariants
//! - An attachment belongs to exactly one owner and one kind slot.
//! - `name_hash` is always derived from `name`, never taken from input.

use crate::model::project::ProjectId;
use crate::model::project_type::ProjectTypeId;
use crate::model::template::TemplateId;
use crate::model::user::UserId;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type FileId = Uuid;

/// Entity that owns an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentOwner {
    Project(ProjectId),
    ProjectType(ProjectTypeId),
    Template(TemplateId),
}

impl AttachmentOwner {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::ProjectType(_) => "project_type",
            Self::Template(_) => "template",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Project(id) | Self::ProjectType(id) | Self::Template(id) => *id,
        }
    }
}

/// Attachment slot on an owner; also the archive directory suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Images,
    Files,
    Assets,
}

impl AttachmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Files => "files",
            Self::Assets => "assets",
        }
    }
}

impl Display for AttachmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub name_hash: String,
    pub content: Vec<u8>,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Lookup key for an attachment name: lowercase hex SHA-256.
pub fn hash_name(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}
