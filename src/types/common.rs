use serde::{Deserialize, Serialize};

use crate::model::Persistable;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
enum PointerTag {
    Pointer,
}

/// A reference to another object: `{"__type": "Pointer", "className": .., "objectId": ..}`.
///
/// Reading a field with `resource.get::<Pointer>(..)` only succeeds for real pointers;
/// objects expanded by `include_object` have `__type: "Object"` and are read with
/// `get_included` instead.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    #[serde(rename = "__type")]
    tag: PointerTag,
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "objectId")]
    pub object_id: String,
}

impl Pointer {
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Pointer {
            tag: PointerTag::Pointer,
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    /// A pointer to object `object_id` of model `M`.
    pub fn to<M: Persistable>(object_id: impl Into<String>) -> Self {
        Self::new(M::CLASS_NAME, object_id)
    }

    /// Whether this pointer targets model `M`.
    pub fn is_for<M: Persistable>(&self) -> bool {
        self.class_name == M::CLASS_NAME
    }
}
