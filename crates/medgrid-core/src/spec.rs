//! Caller-facing resource description and resolution types.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// A typed field value inside a [`ResourceSpec`] or [`ResolvedResource`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Json(Value),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Error raised when a spec field is absent or carries the wrong type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("missing required field '{0}'")]
    Missing(String),

    #[error("field '{0}' is not a {1}")]
    WrongType(String, &'static str),
}

/// Caller-supplied description of the desired remote resource.
///
/// A flat, insertion-ordered mapping from field name to typed value. It holds
/// both the immutable identity fields (set once, never changed after
/// creation) and the mutable descriptive ones. A spec is constructed once per
/// operation invocation and discarded after use.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    fields: IndexMap<String, FieldValue>,
}

impl ResourceSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Required string field.
    pub fn get_str(&self, name: &str) -> Result<&str, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Str(s)) => Ok(s),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "string")),
            None => Err(SpecError::Missing(name.to_string())),
        }
    }

    /// Optional string field; present-but-wrongly-typed is still an error.
    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "string")),
            None => Ok(None),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Bool(b)) => Ok(*b),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "bool")),
            None => Err(SpecError::Missing(name.to_string())),
        }
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "bool")),
            None => Ok(None),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Int(i)) => Ok(*i),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "integer")),
            None => Err(SpecError::Missing(name.to_string())),
        }
    }

    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Int(i)) => Ok(Some(*i)),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "integer")),
            None => Ok(None),
        }
    }

    pub fn get_json(&self, name: &str) -> Result<&Value, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Json(v)) => Ok(v),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "json")),
            None => Err(SpecError::Missing(name.to_string())),
        }
    }

    pub fn opt_json(&self, name: &str) -> Result<Option<&Value>, SpecError> {
        match self.fields.get(name) {
            Some(FieldValue::Json(v)) => Ok(Some(v)),
            Some(_) => Err(SpecError::WrongType(name.to_string(), "json")),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The server's view of a created or adopted resource: the durable identity
/// plus the attribute values the caller writes back to its own state.
///
/// Attribute values come from the server response and may differ in casing or
/// formatting from what was requested. Once resolved, read and delete
/// reference the resource by identity only.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub id: String,
    pub attributes: IndexMap<String, FieldValue>,
}

impl ResolvedResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name)
    }

    /// String attribute, if present and a string.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(FieldValue::Str(s)) => Some(s),
            _ => None,
        }
    }
}
