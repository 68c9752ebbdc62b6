// src/validation.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::operation_name;
use crate::model::ParseModel;
use crate::resource::Resource;

/// The field used for errors that do not belong to a specific attribute.
pub const BASE_FIELD: &str = "base";

/// A single `(field, message)` validation error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// An error attached to the object as a whole.
    pub fn base(message: impl Into<String>) -> Self {
        Self::new(BASE_FIELD, message)
    }

    /// Returns `true` if the error is not tied to a specific field.
    pub fn is_base(&self) -> bool {
        self.field == BASE_FIELD
    }

    /// Human readable form: `"title can't be blank"`, or just the message for base errors.
    pub fn full_message(&self) -> String {
        if self.is_base() {
            self.message.clone()
        } else {
            format!("{} {}", self.field, self.message)
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_message())
    }
}

/// Ordered list of validation errors collected on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Messages recorded against `field`, in insertion order.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.errors.iter().map(FieldError::full_message).collect()
    }

    /// Records `"can't be blank"` unless `field` holds a non-empty value.
    ///
    /// Missing, `null`, empty strings, empty arrays and pending deletions count as blank.
    pub fn require_presence<M: ParseModel>(&mut self, resource: &Resource<M>, field: &str) {
        let blank = match resource.get_value(field) {
            None | Some(Value::Null) => true,
            Some(value) if operation_name(value) == Some("Delete") => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        };
        if blank {
            self.add(field, "can't be blank");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages().join("; "))
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
