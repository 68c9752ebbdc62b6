// src/resource.rs

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::attributes::AttributeStore;
use crate::client::ParseClient;
use crate::error::{ParseError, ResourceError};
use crate::model::{Callback, ParseModel};
use crate::requests::RawResponse;
use crate::types::{ParseDate, Pointer};
use crate::validation::ValidationErrors;

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Never saved; no object id.
    New,
    /// Known to the backend under an object id.
    Persisted,
    /// Destroyed; every further lifecycle operation is refused.
    Destroyed,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::New => "new",
            ResourceState::Persisted => "persisted",
            ResourceState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// One object of the Parse class described by `M`.
///
/// A `Resource` tracks the attributes last confirmed by the server separately from the
/// ones changed locally, so `save` only sends what changed and a failed save leaves the
/// confirmed state alone. Lifecycle operations take `&mut self` and await a single
/// request each.
///
/// ```rust,no_run
/// use parse_resource::{parse_model, ParseClient, ParseConfig, Resource, Validatable};
///
/// parse_model! {
///     pub struct Post("Post") {
///         title: String,
///     }
/// }
/// impl Validatable for Post {}
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ParseClient::new(ParseConfig::new().app_id("app").master_key("key"))?;
///
/// let mut post = Resource::<Post>::new();
/// post.set_title("Hello")?;
/// post.save(&client).await?;
/// assert!(post.is_persisted());
///
/// post.destroy(&client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Resource<M> {
    object_id: Option<String>,
    created_at: Option<ParseDate>,
    updated_at: Option<ParseDate>,
    attributes: AttributeStore,
    errors: ValidationErrors,
    destroyed: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: ParseModel> Default for Resource<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ParseModel> Resource<M> {
    /// A fresh, unsaved instance with no attributes.
    pub fn new() -> Self {
        Resource {
            object_id: None,
            created_at: None,
            updated_at: None,
            attributes: AttributeStore::new(),
            errors: ValidationErrors::new(),
            destroyed: false,
            _model: PhantomData,
        }
    }

    /// A new instance whose pending attributes are the keys of `attributes`.
    ///
    /// Fails if `attributes` is not a JSON object or names a server-controlled field.
    pub fn with_attributes(attributes: Value) -> Result<Self, ParseError> {
        let Value::Object(fields) = attributes else {
            return Err(ParseError::InvalidInput(format!(
                "attributes for {} must be a JSON object",
                M::CLASS_NAME
            )));
        };
        let mut resource = Self::new();
        for (field, value) in fields {
            resource.attributes.set(field, value)?;
        }
        Ok(resource)
    }

    /// Rebuilds a persisted instance from a server payload.
    pub fn from_remote(mut payload: Map<String, Value>) -> Result<Self, ParseError> {
        let object_id = match payload.remove("objectId") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => {
                return Err(ParseError::UnexpectedResponse(format!(
                    "{} payload has no objectId",
                    M::CLASS_NAME
                )))
            }
        };

        let mut resource = Self::new();
        resource.object_id = Some(object_id);
        resource.absorb_timestamps(&mut payload);
        if resource.created_at.is_none() {
            log::warn!(
                "{} {:?} arrived without createdAt",
                M::CLASS_NAME,
                resource.object_id
            );
        }
        resource.attributes = AttributeStore::from_persisted(payload);
        Ok(resource)
    }

    pub fn id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    pub fn created_at(&self) -> Option<&ParseDate> {
        self.created_at.as_ref()
    }

    pub fn updated_at(&self) -> Option<&ParseDate> {
        self.updated_at.as_ref()
    }

    pub fn state(&self) -> ResourceState {
        if self.destroyed {
            ResourceState::Destroyed
        } else if self.object_id.is_some() {
            ResourceState::Persisted
        } else {
            ResourceState::New
        }
    }

    pub fn is_new(&self) -> bool {
        self.state() == ResourceState::New
    }

    pub fn is_persisted(&self) -> bool {
        self.state() == ResourceState::Persisted
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Errors recorded by the most recent validation or save attempt.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes.is_dirty()
    }

    pub fn changed_fields(&self) -> Vec<&str> {
        self.attributes.changed_fields()
    }

    /// Persisted attributes with pending changes laid over them.
    pub fn attributes(&self) -> Map<String, Value> {
        self.attributes.to_map()
    }

    pub fn pending_attributes(&self) -> &Map<String, Value> {
        self.attributes.pending()
    }

    pub fn persisted_attributes(&self) -> &Map<String, Value> {
        self.attributes.persisted()
    }

    pub fn get_value(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Reads a field as `T`. Missing fields and values of another shape read as `None`.
    pub fn get<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.attributes
            .get(field)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<V: Serialize>(&mut self, field: &str, value: V) -> Result<&mut Self, ParseError> {
        let value = serde_json::to_value(value)?;
        self.attributes.set(field, value)?;
        Ok(self)
    }

    /// Removes `field` from the object on the next save.
    pub fn unset(&mut self, field: &str) -> Result<&mut Self, ParseError> {
        self.attributes.unset(field)?;
        Ok(self)
    }

    pub fn increment(&mut self, field: &str, amount: i64) -> Result<&mut Self, ParseError> {
        self.attributes.increment(field, amount)?;
        Ok(self)
    }

    pub fn decrement(&mut self, field: &str, amount: i64) -> Result<&mut Self, ParseError> {
        let amount = amount.checked_neg().ok_or_else(|| {
            ParseError::InvalidInput(format!(
                "cannot decrement '{}' by {}: amount out of range",
                field, amount
            ))
        })?;
        self.increment(field, amount)
    }

    pub fn add_to_array<T: Serialize>(
        &mut self,
        field: &str,
        items: &[T],
    ) -> Result<&mut Self, ParseError> {
        let items = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.attributes.add_to_array(field, items)?;
        Ok(self)
    }

    /// Decodes a related object that a query expanded with `include_object`.
    ///
    /// Returns `None` when the field holds a bare pointer or anything else that is not a
    /// full object.
    pub fn get_included<N: ParseModel>(&self, field: &str) -> Option<Resource<N>> {
        let mut payload = self.attributes.get(field)?.as_object()?.clone();
        match payload.get("__type").and_then(Value::as_str) {
            Some("Object") | None => {}
            Some(_) => return None,
        }
        payload.remove("__type");
        payload.remove("className");
        Resource::<N>::from_remote(payload).ok()
    }

    /// A pointer to this object, if it has been saved.
    pub fn to_pointer(&self) -> Option<Pointer> {
        let id = self.object_id.as_deref().filter(|_| !self.destroyed)?;
        Some(Pointer::to::<M>(id))
    }

    /// Clears previous errors and runs the model's validation.
    pub fn valid(&mut self) -> bool {
        let mut errors = ValidationErrors::new();
        M::validate(self, &mut errors);
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Validates, then creates or updates depending on the current state.
    pub async fn save(&mut self, client: &ParseClient) -> Result<(), ResourceError> {
        if self.destroyed {
            return Err(self.invalid_state("save"));
        }
        if !self.valid() {
            log::debug!(
                "{} failed validation: {}",
                M::CLASS_NAME,
                self.errors
            );
            return Err(ResourceError::Validation(self.errors.clone()));
        }

        let hooks = M::hooks();
        hooks.run(Callback::BeforeSave, self);
        if self.is_new() {
            self.create(client).await?;
        } else {
            self.update(client).await?;
        }
        hooks.run(Callback::AfterSave, self);
        Ok(())
    }

    /// POSTs the pending attributes to the collection.
    pub async fn create(&mut self, client: &ParseClient) -> Result<(), ResourceError> {
        if !self.is_new() {
            return Err(self.invalid_state("create"));
        }

        let hooks = M::hooks();
        hooks.run(Callback::BeforeCreate, self);

        let body = Value::Object(self.attributes.pending().clone());
        let response = client.post(&M::collection_path(), &body).await?;
        let mut payload = self.decode_write(response)?;

        let object_id = match payload.remove("objectId") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => {
                log::warn!(
                    "Create response for {} carried no objectId",
                    M::CLASS_NAME
                );
                return Err(ParseError::UnexpectedResponse(format!(
                    "create response for {} has no objectId",
                    M::CLASS_NAME
                ))
                .into());
            }
        };

        if !payload.contains_key("createdAt") {
            log::warn!(
                "Create response for {} {} carried no createdAt",
                M::CLASS_NAME,
                object_id
            );
            return Err(ParseError::UnexpectedResponse(format!(
                "create response for {} has no createdAt",
                M::CLASS_NAME
            ))
            .into());
        }

        self.object_id = Some(object_id);
        self.absorb_timestamps(&mut payload);
        self.attributes.merge(payload);

        hooks.run(Callback::AfterCreate, self);
        Ok(())
    }

    /// PUTs the pending attributes to the instance path. An empty body is still sent.
    pub async fn update(&mut self, client: &ParseClient) -> Result<(), ResourceError> {
        let object_id = self.require_persisted("update")?;

        let hooks = M::hooks();
        hooks.run(Callback::BeforeUpdate, self);

        let body = Value::Object(self.attributes.pending().clone());
        let response = client.put(&M::instance_path(&object_id), &body).await?;
        let mut payload = self.decode_write(response)?;

        payload.remove("objectId");
        self.absorb_timestamps(&mut payload);
        self.attributes.merge(payload);

        hooks.run(Callback::AfterUpdate, self);
        Ok(())
    }

    /// Deletes the object remotely and clears it locally.
    ///
    /// Local state is cleared and the instance becomes `Destroyed` whatever the backend
    /// answers; the returned error tells whether the remote deletion failed.
    pub async fn destroy(&mut self, client: &ParseClient) -> Result<(), ResourceError> {
        let object_id = self.require_persisted("destroy")?;

        let hooks = M::hooks();
        hooks.run(Callback::BeforeDestroy, self);

        let outcome = client.delete(&M::instance_path(&object_id)).await;

        self.object_id = None;
        self.created_at = None;
        self.updated_at = None;
        self.attributes.reset();
        self.errors.clear();
        self.destroyed = true;

        let response = outcome?;
        if !response.is_success() {
            log::warn!(
                "Destroy of {} {} failed with status {}: {}",
                M::CLASS_NAME,
                object_id,
                response.status,
                response.text()
            );
            return Err(ResourceError::from_response(response.status, &response.body));
        }

        hooks.run(Callback::AfterDestroy, self);
        Ok(())
    }

    fn require_persisted(&self, operation: &'static str) -> Result<String, ResourceError> {
        match (&self.object_id, self.destroyed) {
            (Some(id), false) => Ok(id.clone()),
            _ => Err(self.invalid_state(operation)),
        }
    }

    fn invalid_state(&self, operation: &'static str) -> ResourceError {
        ResourceError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    /// Decodes a create/update response. A remote rejection is also recorded on `errors`.
    fn decode_write(&mut self, response: RawResponse) -> Result<Map<String, Value>, ResourceError> {
        self.errors.clear();
        let result = response.into_result::<Map<String, Value>>();
        if let Err(ResourceError::RemoteRejection { error, .. }) = &result {
            self.errors.push(error.clone());
        }
        result
    }

    fn absorb_timestamps(&mut self, payload: &mut Map<String, Value>) {
        if let Some(created) = payload.remove("createdAt") {
            self.created_at = ParseDate::from_value(&created);
        }
        if let Some(updated) = payload.remove("updatedAt") {
            self.updated_at = ParseDate::from_value(&updated);
        }
        if self.updated_at.is_none() {
            self.updated_at = self.created_at.clone();
        }
    }
}
