//! Validation schema contract and a minimal object schema.
//!
//! The resource engine never interprets a schema. It only calls
//! [`ValidationSchema::validate`] and reports the field errors it gets back.

use std::fmt::Debug;

use serde_json::Value;

use crate::error::FieldError;
use crate::storage::Row;

/// Validates raw input into a clean row.
pub trait ValidationSchema: Send + Sync + Debug {
    /// Validate a full record, returning every violated field on failure.
    fn validate(&self, input: &Value) -> Result<Row, Vec<FieldError>>;

    /// Validate a partial record (update patch).
    ///
    /// Defaults to full validation; schemas override this to relax
    /// required fields.
    fn validate_partial(&self, input: &Value) -> Result<Row, Vec<FieldError>> {
        self.validate(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
            FieldKind::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            FieldKind::String => "must be a string",
            FieldKind::Integer => "must be an integer",
            FieldKind::Number => "must be a number",
            FieldKind::Boolean => "must be a boolean",
            FieldKind::Object => "must be an object",
            FieldKind::Array => "must be an array",
            FieldKind::Any => "is invalid",
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// Object schema with typed, optionally required fields.
///
/// Unknown keys are stripped. Optional fields accept `null`.
///
/// ```rust
/// use bondkit::{FieldKind, ObjectSchema, ValidationSchema};
/// use serde_json::json;
///
/// let schema = ObjectSchema::new()
///     .required("title", FieldKind::String)
///     .optional("count", FieldKind::Integer);
///
/// assert!(schema.validate(&json!({ "title": "x" })).is_ok());
/// assert_eq!(schema.validate(&json!({})).unwrap_err()[0].field, "title");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldSpec>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    fn check(&self, input: &Value, partial: bool) -> Result<Row, Vec<FieldError>> {
        let Some(object) = input.as_object() else {
            return Err(vec![FieldError::new("$", "must be an object")]);
        };

        let mut row = Row::new();
        let mut errors = Vec::new();
        for field in &self.fields {
            match object.get(&field.name) {
                None if field.required && !partial => {
                    errors.push(FieldError::new(&field.name, "is required"));
                }
                None => {}
                Some(Value::Null) if field.required => {
                    errors.push(FieldError::new(&field.name, "is required"));
                }
                Some(Value::Null) => {
                    row.insert(field.name.clone(), Value::Null);
                }
                Some(value) if field.kind.accepts(value) => {
                    row.insert(field.name.clone(), value.clone());
                }
                Some(_) => errors.push(FieldError::new(&field.name, field.kind.describe())),
            }
        }

        if errors.is_empty() {
            Ok(row)
        } else {
            Err(errors)
        }
    }
}

impl ValidationSchema for ObjectSchema {
    fn validate(&self, input: &Value) -> Result<Row, Vec<FieldError>> {
        self.check(input, false)
    }

    fn validate_partial(&self, input: &Value) -> Result<Row, Vec<FieldError>> {
        self.check(input, true)
    }
}
