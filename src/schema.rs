//! Declared output shapes for schema-mode generation
//!
//! A shape is sent to the backend alongside the prompt and the returned JSON is
//! checked against the same declaration before it is turned into a typed value.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// JSON kind of a declared field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Array(Box<FieldKind>),
    Object(ObjectSchema),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: Option<&'static str>,
    pub required: bool,
}

/// An object shape: ordered fields with types and required-ness
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    fields: Vec<Field>,
}

impl ObjectSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field
    #[must_use]
    pub fn required(mut self, name: &'static str, kind: FieldKind, description: Option<&'static str>) -> Self {
        self.fields.push(Field {
            name,
            kind,
            description,
            required: true,
        });
        self
    }

    /// Add an optional field
    #[must_use]
    pub fn optional(mut self, name: &'static str, kind: FieldKind, description: Option<&'static str>) -> Self {
        self.fields.push(Field {
            name,
            kind,
            description,
            required: false,
        });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Render in the backend's response-schema dialect
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = field.kind.to_json();
            if let (Some(description), Some(object)) = (field.description, property.as_object_mut()) {
                object.insert("description".to_string(), Value::String(description.to_string()));
            }
            properties.insert(field.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }

    /// Check that `value` is an object conforming to this shape.
    ///
    /// Returns a description of the first violation found, using a dotted path.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> std::result::Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{path}: expected an object, got {}", kind_name(value)))?;

        for field in &self.fields {
            let field_path = format!("{path}.{}", field.name);
            match object.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(format!("{field_path}: required field is missing"));
                }
                None | Some(Value::Null) => {}
                Some(inner) => field.kind.validate_at(inner, &field_path)?,
            }
        }
        Ok(())
    }
}

impl FieldKind {
    fn to_json(&self) -> Value {
        match self {
            FieldKind::String => json!({ "type": "STRING" }),
            FieldKind::Array(item) => json!({ "type": "ARRAY", "items": item.to_json() }),
            FieldKind::Object(schema) => schema.to_json(),
        }
    }

    fn validate_at(&self, value: &Value, path: &str) -> std::result::Result<(), String> {
        match (self, value) {
            (FieldKind::String, Value::String(_)) => Ok(()),
            (FieldKind::Array(item), Value::Array(values)) => {
                for (index, element) in values.iter().enumerate() {
                    item.validate_at(element, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            (FieldKind::Object(schema), _) => schema.validate_at(value, path),
            (FieldKind::String, other) => Err(format!("{path}: expected a string, got {}", kind_name(other))),
            (FieldKind::Array(_), other) => Err(format!("{path}: expected an array, got {}", kind_name(other))),
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A type that can be requested in schema mode
pub trait Structured: DeserializeOwned {
    fn schema() -> ObjectSchema;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_schema() -> ObjectSchema {
        ObjectSchema::new()
            .required("label", FieldKind::String, None)
            .required("value", FieldKind::String, None)
    }

    fn sample_schema() -> ObjectSchema {
        ObjectSchema::new()
            .required("summary", FieldKind::String, Some("A brief summary."))
            .required("facts", FieldKind::Array(Box::new(FieldKind::Object(pair_schema()))), None)
            .optional("note", FieldKind::String, None)
    }

    #[test]
    fn test_renders_backend_dialect() {
        let rendered = sample_schema().to_json();
        assert_eq!(rendered["type"], "OBJECT");
        assert_eq!(rendered["properties"]["summary"]["type"], "STRING");
        assert_eq!(rendered["properties"]["summary"]["description"], "A brief summary.");
        assert_eq!(rendered["properties"]["facts"]["type"], "ARRAY");
        assert_eq!(rendered["properties"]["facts"]["items"]["type"], "OBJECT");
        assert_eq!(rendered["properties"]["facts"]["items"]["required"], json!(["label", "value"]));
        assert_eq!(rendered["required"], json!(["summary", "facts"]));
    }

    #[test]
    fn test_accepts_conforming_value() {
        let value = json!({
            "summary": "A mausoleum",
            "facts": [{"label": "Built", "value": "1653"}],
            "extra": 42
        });
        assert!(sample_schema().validate(&value).is_ok());
    }

    #[test]
    fn test_rejects_missing_required_field() {
        let err = sample_schema().validate(&json!({"summary": "x"})).unwrap_err();
        assert_eq!(err, "$.facts: required field is missing");
    }

    #[test]
    fn test_rejects_null_required_field() {
        let err = sample_schema()
            .validate(&json!({"summary": null, "facts": []}))
            .unwrap_err();
        assert!(err.starts_with("$.summary"));
    }

    #[test]
    fn test_rejects_wrong_type_in_nested_item() {
        let value = json!({
            "summary": "x",
            "facts": [{"label": "Built", "value": "1653"}, {"label": "Height", "value": 73}]
        });
        let err = sample_schema().validate(&value).unwrap_err();
        assert_eq!(err, "$.facts[1].value: expected a string, got a number");
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = sample_schema().validate(&json!(["summary"])).unwrap_err();
        assert!(err.contains("expected an object"));
    }

    #[test]
    fn test_optional_field_may_be_absent_but_not_mistyped() {
        let schema = sample_schema();
        assert!(schema.validate(&json!({"summary": "x", "facts": []})).is_ok());
        assert!(schema.validate(&json!({"summary": "x", "facts": [], "note": true})).is_err());
    }
}
