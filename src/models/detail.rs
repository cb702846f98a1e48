//! Descriptive content about a landmark

use serde::{Deserialize, Serialize};

use crate::schema::{FieldKind, ObjectSchema, Structured};

/// A labelled fact, e.g. ("Built", "1632-1653")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFact {
    pub label: String,
    pub value: String,
}

/// Detailed information about one landmark, produced fresh per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkDetail {
    pub summary: String,
    pub architecture: String,
    pub key_facts: Vec<KeyFact>,
    /// Guidelines for visitors
    pub guidelines: String,
    /// Preservation precautions
    pub precautions: String,
}

impl Structured for LandmarkDetail {
    fn schema() -> ObjectSchema {
        let key_fact = ObjectSchema::new()
            .required("label", FieldKind::String, None)
            .required("value", FieldKind::String, None);

        ObjectSchema::new()
            .required("summary", FieldKind::String, Some("A brief summary of the monument."))
            .required(
                "architecture",
                FieldKind::String,
                Some("Details about the architectural style."),
            )
            .required(
                "keyFacts",
                FieldKind::Array(Box::new(FieldKind::Object(key_fact))),
                Some("A list of key facts, each with a label and value."),
            )
            .required("guidelines", FieldKind::String, Some("Guidelines for visitors."))
            .required(
                "precautions",
                FieldKind::String,
                Some("Preservation precautions to be aware of."),
            )
    }
}
