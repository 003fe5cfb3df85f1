//! Typed access to command payloads.
//!
//! A payload is the JSON object a client sends with a command. Handlers pull
//! the fields they declare through the accessors below; a missing field or a
//! field of the wrong JSON type is always an error, never a default.
//! Values are not coerced: `"2"` is not an integer and `2.5` is not an integer.

use std::fmt;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

/// The JSON shape a handler expects for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    String,
    Boolean,
    Array,
    Object,
    /// Any one of the listed shapes.
    OneOf(&'static [FieldType]),
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::OneOf(_) => "one of",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::OneOf(options) => {
                let names: Vec<&str> = options.iter().map(FieldType::as_str).collect();
                write!(f, "{}", names.join(" or "))
            }
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    #[error("missing required field '{field}'")]
    Missing { field: String },
    #[error("field '{field}' must be {expected}, got {found}")]
    WrongType {
        field: String,
        expected: FieldType,
        found: &'static str,
    },
    #[error("field '{field}' is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl PayloadError {
    /// Name of the offending field, if the error concerns a single field.
    pub fn field(&self) -> Option<&str> {
        match self {
            PayloadError::NotAnObject { .. } => None,
            PayloadError::Missing { field }
            | PayloadError::WrongType { field, .. }
            | PayloadError::InvalidValue { field, .. } => Some(field),
        }
    }

    /// The shape the handler expected, when the error is a type mismatch.
    pub fn expected(&self) -> Option<FieldType> {
        match self {
            PayloadError::WrongType { expected, .. } => Some(*expected),
            _ => None,
        }
    }

    pub fn wrong_type(field: &str, expected: FieldType, value: &Value) -> Self {
        PayloadError::WrongType {
            field: field.to_string(),
            expected,
            found: json_type_name(value),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PayloadError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Name of the JSON type of `value`, distinguishing integers from other numbers.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The untyped body of a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    /// Wrap a request body. Anything other than a JSON object is rejected.
    pub fn new(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(PayloadError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get_value(&self, field: &str) -> Result<&Value, PayloadError> {
        self.fields.get(field).ok_or_else(|| PayloadError::Missing {
            field: field.to_string(),
        })
    }

    pub fn get_int(&self, field: &str) -> Result<i64, PayloadError> {
        let value = self.get_value(field)?;
        match value {
            Value::Number(n) if n.is_i64() => n
                .as_i64()
                .ok_or_else(|| PayloadError::invalid(field, "integer out of range")),
            Value::Number(n) if n.is_u64() => Err(PayloadError::invalid(
                field,
                format!("integer {} does not fit in 64 signed bits", n),
            )),
            other => Err(PayloadError::wrong_type(field, FieldType::Integer, other)),
        }
    }

    pub fn get_string(&self, field: &str) -> Result<&str, PayloadError> {
        let value = self.get_value(field)?;
        value
            .as_str()
            .ok_or_else(|| PayloadError::wrong_type(field, FieldType::String, value))
    }

    pub fn get_bool(&self, field: &str) -> Result<bool, PayloadError> {
        let value = self.get_value(field)?;
        value
            .as_bool()
            .ok_or_else(|| PayloadError::wrong_type(field, FieldType::Boolean, value))
    }

    pub fn get_array(&self, field: &str) -> Result<&[Value], PayloadError> {
        let value = self.get_value(field)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| PayloadError::wrong_type(field, FieldType::Array, value))
    }

    /// Like `get_string`, but every element of the array must be a string.
    pub fn get_string_array(&self, field: &str) -> Result<Vec<&str>, PayloadError> {
        self.get_array(field)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().ok_or_else(|| PayloadError::WrongType {
                    field: format!("{}[{}]", field, i),
                    expected: FieldType::String,
                    found: json_type_name(item),
                })
            })
            .collect()
    }

    /// `Ok(None)` only when the field is absent; a present field must still
    /// have the right type.
    pub fn opt_bool(&self, field: &str) -> Result<Option<bool>, PayloadError> {
        self.optional(field, Self::get_bool)
    }

    fn optional<'a, T>(
        &'a self,
        field: &str,
        get: impl FnOnce(&'a Self, &str) -> Result<T, PayloadError>,
    ) -> Result<Option<T>, PayloadError> {
        if self.contains(field) {
            get(self, field).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl TryFrom<Value> for Payload {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Payload::new(value)
    }
}
