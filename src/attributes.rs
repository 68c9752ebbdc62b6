//! Persisted attributes with a pending write overlay.
//!
//! [`AttributeStore`] keeps the last server-confirmed state of an object apart from the
//! fields changed locally since. Reads see pending values first; writes only ever touch
//! the pending map; a successful round trip folds the pending map into the persisted one.

use serde_json::{json, Map, Value};

use crate::error::ParseError;

/// Fields assigned by the server. They never enter the pending map.
pub const RESERVED_FIELDS: &[&str] = &["objectId", "createdAt", "updatedAt"];

pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// Returns the `__op` name if `value` is a Parse field operation such as
/// `{"__op": "Increment", "amount": 1}`.
pub(crate) fn operation_name(value: &Value) -> Option<&str> {
    value.as_object()?.get("__op")?.as_str()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    persisted: Map<String, Value>,
    pending: Map<String, Value>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding server-confirmed values and nothing pending.
    pub fn from_persisted(persisted: Map<String, Value>) -> Self {
        AttributeStore {
            persisted,
            pending: Map::new(),
        }
    }

    /// The pending value if there is one, otherwise the persisted value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.pending
            .get(field)
            .or_else(|| self.persisted.get(field))
    }

    /// Records a local change. Persisted state is left untouched.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Result<(), ParseError> {
        let field = field.into();
        if is_reserved(&field) {
            return Err(ParseError::ReservedField(field));
        }
        self.pending.insert(field, value);
        Ok(())
    }

    /// Queues removal of `field` on the server.
    pub fn unset(&mut self, field: impl Into<String>) -> Result<(), ParseError> {
        self.set(field, json!({ "__op": "Delete" }))
    }

    /// Queues an atomic increment. Negative amounts decrement.
    pub fn increment(&mut self, field: impl Into<String>, amount: i64) -> Result<(), ParseError> {
        self.set(field, json!({ "__op": "Increment", "amount": amount }))
    }

    /// Queues appending `items` to an array field.
    pub fn add_to_array(&mut self, field: impl Into<String>, items: Vec<Value>) -> Result<(), ParseError> {
        self.set(field, json!({ "__op": "Add", "objects": items }))
    }

    /// Folds a successful server response and the pending overlay into persisted state.
    ///
    /// Every key of `remote` is copied into persisted state first. Pending plain values then
    /// overwrite what is there, since they were part of the request that just succeeded.
    /// Pending operations resolve against the server: a `Delete` drops the key, any other
    /// operation keeps the value the server echoed back, or drops the key if none was sent.
    /// The pending map is empty afterwards.
    pub fn merge(&mut self, mut remote: Map<String, Value>) {
        let pending = std::mem::take(&mut self.pending);
        for (field, value) in pending {
            match operation_name(&value) {
                None => {
                    remote.insert(field, value);
                }
                Some("Delete") => {
                    remote.remove(&field);
                    self.persisted.remove(&field);
                }
                Some(op) => {
                    if !remote.contains_key(&field) {
                        log::debug!(
                            "Server did not echo '{}' after {} operation; dropping local copy",
                            field,
                            op
                        );
                        self.persisted.remove(&field);
                    }
                }
            }
        }

        for (field, value) in remote {
            self.persisted.insert(field, value);
        }
    }

    /// Empties both maps.
    pub fn reset(&mut self) {
        self.persisted.clear();
        self.pending.clear();
    }

    pub fn pending(&self) -> &Map<String, Value> {
        &self.pending
    }

    pub fn persisted(&self) -> &Map<String, Value> {
        &self.persisted
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Names of the fields with pending changes.
    pub fn changed_fields(&self) -> Vec<&str> {
        self.pending.keys().map(String::as_str).collect()
    }

    /// The merged view a reader would see through [`get`](Self::get).
    pub fn to_map(&self) -> Map<String, Value> {
        let mut merged = self.persisted.clone();
        for (field, value) in &self.pending {
            merged.insert(field.clone(), value.clone());
        }
        merged
    }
}
