//! Output schemas for schema-validated tasks.
//!
//! A schema is a fixed set of required string fields. Validation recovers a
//! JSON object from the raw output and checks every field is a non-empty
//! string.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::BLOG_RECORD_FIELDS;
use crate::utilities::converter::recover_json_object;

/// Name of the built-in blog record schema.
pub const BLOG_RECORD_SCHEMA: &str = "blog_record";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no JSON object found in the output")]
    NoJson,

    #[error("missing or empty required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    /// Schema name as referenced from task definitions.
    pub name: String,
    /// Required string fields, in prompt order.
    pub fields: Vec<String>,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// The four-field blog record.
    pub fn blog_record() -> Self {
        Self::new(BLOG_RECORD_SCHEMA, &BLOG_RECORD_FIELDS)
    }

    /// Look up a built-in schema by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            BLOG_RECORD_SCHEMA => Some(Self::blog_record()),
            _ => None,
        }
    }

    /// Instruction appended to the prompt of a task declaring this schema.
    pub fn instructions(&self) -> String {
        let example = self
            .fields
            .iter()
            .map(|f| format!("  \"{f}\": \"...\""))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "Return ONLY a valid JSON object with exactly these string fields, all non-empty:\n{{\n{example}\n}}"
        )
    }

    /// Validate raw output and return the object restricted to the schema's
    /// fields.
    pub fn validate(&self, raw: &str) -> Result<Map<String, Value>, SchemaError> {
        let object = match recover_json_object(raw) {
            Some(Value::Object(map)) => map,
            _ => return Err(SchemaError::NoJson),
        };
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !matches!(object.get(f.as_str()), Some(Value::String(s)) if !s.trim().is_empty()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingFields(missing));
        }
        Ok(self
            .fields
            .iter()
            .filter_map(|f| object.get(f).map(|v| (f.clone(), v.clone())))
            .collect())
    }
}
