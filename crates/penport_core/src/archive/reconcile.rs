//! Normalizes dynamic field documents against a field schema.
//!
//! # Invariants
//! - Output contains every field the schema declares.
//! - Values are never coerced: a present value is kept as is, even when its
//!   JSON type disagrees with the declared field type.
//! - `null` counts as undefined.
//! - Reconciliation is pure; inputs are never mutated.

use crate::model::fields::{FieldDefinition, FieldDocument, FieldSchema, FieldShape};
use serde_json::{Map, Value};

/// What to put in place of a declared field the document does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedFieldPolicy {
    /// Store `null`. Used by every importer.
    #[default]
    FillNull,
    /// Store the declared default, or an empty list for list fields.
    FillDefault,
}

/// Returns `document` restricted to (or extended beyond, with
/// `include_unknown`) the fields declared by `schema`.
///
/// Object fields are descended into; list items are reconciled against the
/// list's item definition. `include_unknown` applies at every object level.
pub fn reconcile(
    document: &FieldDocument,
    schema: &FieldSchema,
    policy: UndefinedFieldPolicy,
    include_unknown: bool,
) -> FieldDocument {
    let mut out = Map::new();
    for (field_id, definition) in schema.iter() {
        let value = reconcile_value(document.get(field_id), definition, policy, include_unknown);
        out.insert(field_id.clone(), value);
    }

    if include_unknown {
        for (field_id, value) in document {
            if !schema.contains(field_id) {
                out.insert(field_id.clone(), value.clone());
            }
        }
    }
    out
}

fn reconcile_value(
    value: Option<&Value>,
    definition: &FieldDefinition,
    policy: UndefinedFieldPolicy,
    include_unknown: bool,
) -> Value {
    let value = value.filter(|value| !value.is_null());

    match definition.shape() {
        FieldShape::Object => {
            let undeclared = FieldSchema::new();
            let properties = definition.properties.as_ref().unwrap_or(&undeclared);
            match value {
                Some(Value::Object(nested)) => {
                    Value::Object(reconcile(nested, properties, policy, include_unknown))
                }
                Some(other) => other.clone(),
                None => Value::Object(reconcile(
                    &Map::new(),
                    properties,
                    policy,
                    include_unknown,
                )),
            }
        }
        FieldShape::List => match value {
            Some(Value::Array(items)) => {
                let Some(item_definition) = definition.items.as_deref() else {
                    return Value::Array(items.clone());
                };
                Value::Array(
                    items
                        .iter()
                        .map(|item| {
                            reconcile_value(Some(item), item_definition, policy, include_unknown)
                        })
                        .collect(),
                )
            }
            Some(other) => other.clone(),
            None => match policy {
                UndefinedFieldPolicy::FillNull => Value::Null,
                UndefinedFieldPolicy::FillDefault => definition
                    .default
                    .clone()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
            },
        },
        FieldShape::Scalar => match value {
            Some(present) => present.clone(),
            None => undefined_scalar(definition, policy),
        },
    }
}

fn undefined_scalar(definition: &FieldDefinition, policy: UndefinedFieldPolicy) -> Value {
    match policy {
        UndefinedFieldPolicy::FillNull => Value::Null,
        UndefinedFieldPolicy::FillDefault => definition.default.clone().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::{reconcile, UndefinedFieldPolicy};
    use crate::model::fields::{FieldDefinition, FieldDocument, FieldSchema};
    use serde_json::{json, Value};

    fn doc(value: Value) -> FieldDocument {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn ab_schema() -> FieldSchema {
        FieldSchema::new()
            .with_field("a", FieldDefinition::scalar("number"))
            .with_field("b", FieldDefinition::scalar("string"))
    }

    #[test]
    fn fills_missing_declared_fields_with_null() {
        let out = reconcile(
            &doc(json!({"a": 1})),
            &ab_schema(),
            UndefinedFieldPolicy::FillNull,
            true,
        );
        assert_eq!(Value::Object(out), json!({"a": 1, "b": null}));
    }

    #[test]
    fn include_unknown_controls_undeclared_fields() {
        let input = doc(json!({"a": 1, "z": 9}));

        let kept = reconcile(&input, &ab_schema(), UndefinedFieldPolicy::FillNull, true);
        assert_eq!(kept.get("z"), Some(&json!(9)));

        let dropped = reconcile(&input, &ab_schema(), UndefinedFieldPolicy::FillNull, false);
        assert!(dropped.get("z").is_none());
        assert_eq!(Value::Object(dropped), json!({"a": 1, "b": null}));
    }

    #[test]
    fn does_not_coerce_mismatched_values() {
        let out = reconcile(
            &doc(json!({"a": "not a number", "b": 5})),
            &ab_schema(),
            UndefinedFieldPolicy::FillNull,
            false,
        );
        assert_eq!(Value::Object(out), json!({"a": "not a number", "b": 5}));
    }

    #[test]
    fn descends_into_objects_and_list_items() {
        let schema = FieldSchema::new()
            .with_field(
                "scope",
                FieldDefinition::object(
                    FieldSchema::new().with_field("host", FieldDefinition::scalar("string")),
                ),
            )
            .with_field(
                "affected",
                FieldDefinition::list(FieldDefinition::object(
                    FieldSchema::new()
                        .with_field("url", FieldDefinition::scalar("string"))
                        .with_field("port", FieldDefinition::scalar("number")),
                )),
            );

        let out = reconcile(
            &doc(json!({
                "scope": {"extra": true},
                "affected": [{"url": "https://a"}, {"port": 443, "note": "x"}]
            })),
            &schema,
            UndefinedFieldPolicy::FillNull,
            true,
        );

        assert_eq!(
            Value::Object(out),
            json!({
                "scope": {"host": null, "extra": true},
                "affected": [
                    {"url": "https://a", "port": null},
                    {"url": null, "port": 443, "note": "x"}
                ]
            })
        );
    }

    #[test]
    fn missing_object_is_filled_structurally() {
        let schema = FieldSchema::new().with_field(
            "scope",
            FieldDefinition::object(
                FieldSchema::new().with_field("host", FieldDefinition::scalar("string")),
            ),
        );
        let out = reconcile(
            &FieldDocument::new(),
            &schema,
            UndefinedFieldPolicy::FillNull,
            false,
        );
        assert_eq!(Value::Object(out), json!({"scope": {"host": null}}));
    }

    #[test]
    fn fill_default_uses_declared_defaults() {
        let schema = FieldSchema::new()
            .with_field(
                "title",
                FieldDefinition::scalar("string").with_default(json!("Untitled")),
            )
            .with_field("score", FieldDefinition::scalar("number"))
            .with_field("refs", FieldDefinition::list(FieldDefinition::scalar("string")));

        let out = reconcile(
            &doc(json!({"score": null})),
            &schema,
            UndefinedFieldPolicy::FillDefault,
            false,
        );
        assert_eq!(
            Value::Object(out),
            json!({"title": "Untitled", "score": null, "refs": []})
        );
    }
}
