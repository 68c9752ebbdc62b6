//! An object mapper for the Parse REST API.
//!
//! Declare a model with [`parse_model!`], then create, query, update and destroy its
//! objects through a [`ParseClient`]. Each object is a [`Resource`] that tracks which
//! attributes changed since the last save.

pub mod attributes;
pub mod client;
pub mod config;
pub mod error;
pub mod error_codes;
pub mod model;
pub mod query;
pub mod requests;
pub mod resource;
pub mod types;
pub mod user;
pub mod validation;

pub use client::ParseClient;
pub use config::ParseConfig;
pub use error::{ParseError, ResourceError};
pub use model::{Callback, FieldDescriptor, Hooks, ParseModel, Persistable, Validatable};
pub use query::Query;
pub use requests::RawResponse;
pub use resource::{Resource, ResourceState};
pub use user::ParseUser;
pub use validation::{FieldError, ValidationErrors};

pub use types::{ParseDate, Pointer};

#[doc(hidden)]
pub use paste;
