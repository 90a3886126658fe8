//! Serde shapes of archived documents.
//!
//! Fragments mirror the archive layout one to one. Ids inside fragments are
//! source-local: they only link fragments and attachment paths within one
//! archive and are never persisted as destination identities.

use crate::model::common::{Language, ReviewStatus};
use crate::model::fields::{FieldDocument, FieldSchema};
use crate::model::project::ImportedMember;
use crate::model::project_type::SectionDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Source-local identifier of a fragment.
///
/// Archives written by older exporters use integer ids, newer ones use
/// strings; both are accepted and normalized to a string. The id is part of
/// attachment paths, so path separators and NUL are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "SourceIdRepr", into = "String")]
pub struct SourceId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceIdRepr {
    Text(String),
    Number(i64),
}

impl SourceId {
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.is_empty() {
            return Err("source id must not be empty".to_string());
        }
        if value.contains(['/', '\\', '\0']) {
            return Err(format!(
                "source id `{}` must not contain path separators or NUL",
                value.escape_default()
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<SourceIdRepr> for SourceId {
    type Error = String;

    fn try_from(value: SourceIdRepr) -> Result<Self, Self::Error> {
        match value {
            SourceIdRepr::Text(text) => Self::new(text),
            SourceIdRepr::Number(number) => Self::new(number.to_string()),
        }
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0
    }
}

impl From<uuid::Uuid> for SourceId {
    fn from(value: uuid::Uuid) -> Self {
        Self(value.to_string())
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of a referenced record (user, template, member account).
///
/// Any string or integer is accepted and kept in its archived form.
/// References only ever resolve to an existing destination record, so
/// unlike [`SourceId`] the value is never part of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefId {
    Number(serde_json::Number),
    Text(String),
}

impl RefId {
    /// Destination identity named by this reference, if it is one.
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            Self::Text(text) => uuid::Uuid::parse_str(text).ok(),
            Self::Number(_) => None,
        }
    }
}

impl From<uuid::Uuid> for RefId {
    fn from(value: uuid::Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl Display for RefId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => Display::fmt(number, f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Reference to a user: a bare id or an object carrying one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(RefId),
    Object { id: RefId },
}

impl UserRef {
    pub fn id(&self) -> &RefId {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

/// Attachment entry; bytes live at `{owner-id}-{kind}/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub name: String,
}

/// Legacy single-language template (`templates/v1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateV1Fragment {
    pub format: String,
    pub id: SourceId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub language: Language,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub data: FieldDocument,
}

/// Multilingual template (`templates/v2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateV2Fragment {
    pub format: String,
    pub id: SourceId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub translations: Vec<TranslationFragment>,
    #[serde(default)]
    pub images: Vec<FileFragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SourceId>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_main: bool,
    pub language: Language,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub data: FieldDocument,
}

/// Project type (`projecttypes/v1`), standalone or nested in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTypeFragment {
    pub format: String,
    pub id: SourceId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    pub name: String,
    pub language: Language,
    #[serde(default)]
    pub report_fields: FieldSchema,
    #[serde(default)]
    pub report_sections: Vec<SectionDefinition>,
    #[serde(default)]
    pub finding_fields: FieldSchema,
    #[serde(default)]
    pub finding_field_order: Vec<String>,
    #[serde(default = "empty_list")]
    pub finding_ordering: Value,
    #[serde(default)]
    pub report_template: String,
    #[serde(default)]
    pub report_styles: String,
    #[serde(default)]
    pub report_preview_data: FieldDocument,
    #[serde(default)]
    pub assets: Vec<FileFragment>,
}

/// Project member. Descriptive attributes travel so that a member whose
/// account is unknown at the destination stays visibly attributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RefId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemberFragment {
    /// Inline snapshot stored for members without a local account.
    pub fn snapshot(&self) -> ImportedMember {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFragment {
    pub id: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingFragment {
    pub id: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub template: Option<RefId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub data: FieldDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookPageFragment {
    pub id: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
    #[serde(default)]
    pub status_emoji: Option<String>,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub order: i64,
    /// `id` of the parent page in the same archive.
    #[serde(default)]
    pub parent: Option<String>,
}

/// Pentest project (`projects/v1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFragment {
    pub format: String,
    pub id: SourceId,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    pub name: String,
    pub language: Language,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "pentesters")]
    pub members: Vec<MemberFragment>,
    pub project_type: ProjectTypeFragment,
    #[serde(default)]
    pub override_finding_order: bool,
    #[serde(default)]
    pub report_data: FieldDocument,
    #[serde(default)]
    pub sections: Vec<SectionFragment>,
    #[serde(default)]
    pub findings: Vec<FindingFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<NotebookPageFragment>>,
    #[serde(default)]
    pub images: Vec<FileFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileFragment>>,
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Reads the `format` tag of a raw document without decoding the rest.
pub fn document_format(document: &Value) -> Option<&str> {
    document.get("format").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::{
        document_format, MemberFragment, ProjectFragment, RefId, SourceId, TemplateV1Fragment,
        UserRef,
    };
    use crate::model::common::ReviewStatus;
    use serde_json::json;

    #[test]
    fn source_id_accepts_numbers_and_strings() {
        let numeric: SourceId = serde_json::from_value(json!(7)).expect("numeric id");
        let text: SourceId = serde_json::from_value(json!("7")).expect("string id");
        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_value(&numeric).expect("serialize"), json!("7"));
    }

    #[test]
    fn source_id_rejects_path_characters() {
        for raw in ["", "../7", "a\\b", "a\u{0}b"] {
            assert!(
                serde_json::from_value::<SourceId>(json!(raw)).is_err(),
                "`{}` should be rejected",
                raw.escape_default()
            );
        }
    }

    #[test]
    fn user_ref_accepts_bare_id_and_object() {
        let bare: UserRef = serde_json::from_value(json!("u1")).expect("bare id");
        let object: UserRef =
            serde_json::from_value(json!({"id": "u1", "username": "alice"})).expect("object");
        assert_eq!(bare.id(), object.id());
    }

    #[test]
    fn reference_ids_accept_any_string_or_integer() {
        for raw in [json!(""), json!("a/b"), json!(12)] {
            let reference: UserRef = serde_json::from_value(raw.clone()).expect("reference");
            assert_eq!(reference.id().as_uuid(), None);
            assert_eq!(serde_json::to_value(&reference).expect("serialize"), raw);
        }
        let id = uuid::Uuid::new_v4();
        assert_eq!(RefId::from(id).as_uuid(), Some(id));
    }

    #[test]
    fn member_snapshot_keeps_integer_id() {
        let member: MemberFragment =
            serde_json::from_value(json!({"id": 5, "name": "Dana", "roles": []})).expect("member");
        let snapshot = member.snapshot();
        assert_eq!(snapshot.get("id"), Some(&json!(5)));
        assert_eq!(snapshot.get("name"), Some(&json!("Dana")));
    }

    #[test]
    fn template_v1_defaults_status() {
        let fragment: TemplateV1Fragment = serde_json::from_value(json!({
            "format": "templates/v1",
            "id": 3,
            "language": "en-US",
            "data": {"title": "XSS"}
        }))
        .expect("v1 template should decode");
        assert_eq!(fragment.status, ReviewStatus::InProgress);
        assert!(fragment.tags.is_empty());
    }

    #[test]
    fn project_accepts_pentesters_alias() {
        let fragment: ProjectFragment = serde_json::from_value(json!({
            "format": "projects/v1",
            "id": "p1",
            "name": "Acme",
            "language": "de-DE",
            "pentesters": [{"id": "u1", "name": "Alice", "roles": ["lead"]}],
            "project_type": {
                "format": "projecttypes/v1",
                "id": "pt1",
                "name": "Default",
                "language": "de-DE"
            }
        }))
        .expect("project should decode");
        assert_eq!(fragment.members.len(), 1);
        assert!(fragment.notes.is_none());
        assert!(fragment.files.is_none());
        assert_eq!(document_format(&json!({"format": "projects/v1"})), Some("projects/v1"));
    }

    #[test]
    fn member_snapshot_keeps_unknown_attributes() {
        let member: MemberFragment = serde_json::from_value(json!({
            "id": "u9",
            "email": "x@example.com",
            "color": "red",
            "roles": ["reviewer"]
        }))
        .expect("member should decode");
        let snapshot = member.snapshot();
        assert_eq!(snapshot.get("email"), Some(&json!("x@example.com")));
        assert_eq!(snapshot.get("color"), Some(&json!("red")));
        assert_eq!(snapshot.get("roles"), Some(&json!(["reviewer"])));
    }
}
