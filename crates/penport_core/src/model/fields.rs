//! User-customizable field schemas and the documents they describe.
//!
//! A [`FieldSchema`] maps field ids to [`FieldDefinition`]s. Definitions of
//! type `object` nest another schema under `properties`; definitions of type
//! `list` describe their elements under `items`. Every other type is a scalar
//! as far as reconciliation is concerned, so schemas written by newer
//! versions with unknown scalar types still load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Dynamic field document: field id -> value.
pub type FieldDocument = Map<String, Value>;

/// Declared field set of a project type (report or finding fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: BTreeMap<String, FieldDefinition>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by callers assembling schemas in code.
    pub fn with_field(mut self, id: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(id.into(), definition);
        self
    }

    pub fn get(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fields.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldDefinition)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Structural role of a field during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Object,
    List,
    Scalar,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Type name as written in the schema (`string`, `markdown`, `object`, ...).
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Nested fields for `object` definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<FieldSchema>,
    /// Element definition for `list` definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldDefinition>>,
    /// Presentation attributes (label, required, choices, ...) kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDefinition {
    pub fn scalar(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            default: None,
            properties: None,
            items: None,
            extra: Map::new(),
        }
    }

    pub fn object(properties: FieldSchema) -> Self {
        Self {
            properties: Some(properties),
            ..Self::scalar("object")
        }
    }

    pub fn list(items: FieldDefinition) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::scalar("list")
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn shape(&self) -> FieldShape {
        match self.field_type.as_str() {
            "object" => FieldShape::Object,
            "list" => FieldShape::List,
            _ => FieldShape::Scalar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldDefinition, FieldSchema, FieldShape};
    use serde_json::json;

    #[test]
    fn schema_deserializes_nested_definitions_and_keeps_presentation_attributes() {
        let schema: FieldSchema = serde_json::from_value(json!({
            "title": {"type": "string", "label": "Title", "default": "n/a"},
            "affected": {"type": "list", "items": {"type": "string"}},
            "scope": {"type": "object", "properties": {"host": {"type": "string"}}},
            "rating": {"type": "cvss4"}
        }))
        .unwrap();

        let title = schema.get("title").unwrap();
        assert_eq!(title.shape(), FieldShape::Scalar);
        assert_eq!(title.extra.get("label"), Some(&json!("Title")));
        assert_eq!(title.default, Some(json!("n/a")));
        assert_eq!(schema.get("affected").unwrap().shape(), FieldShape::List);
        assert_eq!(schema.get("scope").unwrap().shape(), FieldShape::Object);
        assert_eq!(schema.get("rating").unwrap().shape(), FieldShape::Scalar);

        let encoded = serde_json::to_value(&schema).unwrap();
        assert_eq!(encoded["title"]["label"], json!("Title"));
        assert_eq!(encoded["scope"]["properties"]["host"]["type"], json!("string"));
    }

    #[test]
    fn builder_produces_expected_shapes() {
        let schema = FieldSchema::new()
            .with_field("a", FieldDefinition::scalar("number"))
            .with_field(
                "b",
                FieldDefinition::list(FieldDefinition::scalar("string")),
            );
        assert_eq!(schema.len(), 2);
        assert!(schema.contains("b"));
        assert!(!schema.contains("z"));
    }
}
