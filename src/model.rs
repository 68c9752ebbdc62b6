//! Model capabilities.
//!
//! A model is a zero-sized marker type naming one Parse class. It implements
//! [`Persistable`] (where it lives, which fields it declares, which lifecycle hooks run) and
//! [`Validatable`] (what makes an instance savable). The blanket [`ParseModel`] trait then
//! provides the class-level operations: `find`, `all`, `first`, `count`, `create`,
//! `destroy_all`, and the entry points into [`Query`].
//!
//! The [`parse_model!`](crate::parse_model) macro declares the marker type, its
//! `Persistable` impl and typed accessors in one go:
//!
//! ```rust
//! use parse_resource::{parse_model, Validatable, ValidationErrors, Resource};
//!
//! parse_model! {
//!     /// A blog post.
//!     pub struct Post("Post") {
//!         title: String,
//!         author: String,
//!     }
//! }
//!
//! impl Validatable for Post {
//!     fn validate(post: &Resource<Self>, errors: &mut ValidationErrors) {
//!         errors.require_presence(post, "title");
//!     }
//! }
//!
//! let mut post = Resource::<Post>::new();
//! post.set_title("Hello").unwrap();
//! assert_eq!(post.title().as_deref(), Some("Hello"));
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::client::ParseClient;
use crate::error::{ParseError, ResourceError};
use crate::query::Query;
use crate::resource::Resource;
use crate::validation::{FieldError, ValidationErrors};

/// One entry of a model's declared field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Name of the field on the wire.
    pub name: &'static str,
    /// The Rust type the typed accessors use, as written in the declaration.
    pub type_name: &'static str,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, type_name: &'static str) -> Self {
        FieldDescriptor { name, type_name }
    }
}

/// Lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    BeforeSave,
    AfterSave,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDestroy,
    AfterDestroy,
}

pub type Hook<M> = fn(&mut Resource<M>);

/// An ordered list of lifecycle hooks.
///
/// Hooks registered for the same [`Callback`] run in registration order. `Before*` hooks run
/// ahead of the request; `After*` hooks run only once the request succeeded.
pub struct Hooks<M> {
    entries: Vec<(Callback, Hook<M>)>,
}

impl<M> Hooks<M> {
    pub fn new() -> Self {
        Hooks {
            entries: Vec::new(),
        }
    }

    pub fn on(mut self, callback: Callback, hook: Hook<M>) -> Self {
        self.entries.push((callback, hook));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn run(&self, callback: Callback, resource: &mut Resource<M>) {
        for (registered, hook) in &self.entries {
            if *registered == callback {
                hook(resource);
            }
        }
    }
}

impl<M> Default for Hooks<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Hooks<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(callback, _)| callback))
            .finish()
    }
}

/// Where a model lives on the backend and how its lifecycle is wired.
pub trait Persistable: Sized + Send + Sync + 'static {
    /// The Parse class name, e.g. `"Post"`.
    const CLASS_NAME: &'static str;

    /// Declared fields. Typed accessors are generated from this table.
    const FIELDS: &'static [FieldDescriptor];

    /// Collection endpoint relative to the server URL.
    fn collection_path() -> String {
        format!("classes/{}", Self::CLASS_NAME)
    }

    fn instance_path(object_id: &str) -> String {
        format!("{}/{}", Self::collection_path(), object_id)
    }

    fn hooks() -> Hooks<Self> {
        Hooks::new()
    }

    fn is_declared(field: &str) -> bool {
        Self::FIELDS.iter().any(|descriptor| descriptor.name == field)
    }
}

/// The validation capability. The default accepts everything.
pub trait Validatable: Persistable {
    fn validate(_resource: &Resource<Self>, _errors: &mut crate::ValidationErrors) {}
}

/// Class-level operations, available on every model type.
#[allow(async_fn_in_trait)]
pub trait ParseModel: Persistable + Validatable {
    fn query() -> Query<Self> {
        Query::new()
    }

    fn where_eq<V: Serialize>(field: &str, value: V) -> Query<Self> {
        Query::new().where_eq(field, value)
    }

    fn include_object(field: &str) -> Query<Self> {
        Query::new().include_object(field)
    }

    fn limit(n: usize) -> Query<Self> {
        Query::new().limit(n)
    }

    fn order(field: &str) -> Query<Self> {
        Query::new().order(field)
    }

    /// Fetches one object by id.
    ///
    /// A blank id fails with [`ResourceError::NotFound`] without touching the network;
    /// an id that matches nothing yields `Ok(None)`.
    async fn find(client: &ParseClient, id: &str) -> Result<Option<Resource<Self>>, ResourceError> {
        if id.trim().is_empty() {
            return Err(ResourceError::NotFound {
                class_name: Self::CLASS_NAME,
                id: id.to_string(),
            });
        }
        Query::<Self>::new()
            .where_eq("objectId", id)
            .first(client)
            .await
    }

    async fn all(client: &ParseClient) -> Result<Vec<Resource<Self>>, ResourceError> {
        Query::<Self>::new().all(client).await
    }

    /// The first object the backend returns. No particular order is implied.
    async fn first(client: &ParseClient) -> Result<Option<Resource<Self>>, ResourceError> {
        Query::<Self>::new().first(client).await
    }

    async fn count(client: &ParseClient) -> Result<u64, ResourceError> {
        Query::<Self>::new().count(client).await
    }

    /// Builds a new object from `attributes` and saves it.
    ///
    /// Attributes that are not a JSON object, or that name a server-assigned field, fail
    /// as a `Validation` error without a request.
    async fn create(client: &ParseClient, attributes: Value) -> Result<Resource<Self>, ResourceError> {
        let mut resource =
            Resource::<Self>::with_attributes(attributes).map_err(invalid_attributes)?;
        resource.save(client).await?;
        Ok(resource)
    }

    /// Destroys every object of the class, stopping at the first failure.
    ///
    /// Returns how many objects were destroyed.
    async fn destroy_all(client: &ParseClient) -> Result<usize, ResourceError> {
        let mut destroyed = 0;
        for mut resource in Self::all(client).await? {
            resource.destroy(client).await?;
            destroyed += 1;
        }
        Ok(destroyed)
    }
}

impl<M: Persistable + Validatable> ParseModel for M {}

fn invalid_attributes(error: ParseError) -> ResourceError {
    let mut errors = ValidationErrors::new();
    match error {
        ParseError::ReservedField(field) => errors.add(field, "is assigned by the server"),
        other => errors.push(FieldError::base(other.to_string())),
    }
    ResourceError::Validation(errors)
}

/// Declares a model type with typed accessors.
///
/// Generates a marker struct, its [`Persistable`] impl with the field table, and a
/// `<Name>Fields` trait implemented for `Resource<Name>` that provides a getter and a
/// `set_<field>` setter per field. Hooks can be attached with `hooks = path::to::fn`, where
/// the function returns `Hooks<Name>`. A [`Validatable`] impl must be written by hand (it
/// may be empty).
///
/// ```rust
/// use parse_resource::{parse_model, Callback, Hooks, Resource, Validatable};
///
/// fn comment_hooks() -> Hooks<Comment> {
///     Hooks::new().on(Callback::BeforeCreate, |c| {
///         let _ = c.set("approved", false);
///     })
/// }
///
/// parse_model! {
///     pub struct Comment("Comment", hooks = comment_hooks) {
///         /// Comment text.
///         body: String,
///         likes: i64,
///     }
/// }
///
/// impl Validatable for Comment {}
///
/// let mut comment = Resource::<Comment>::new();
/// comment.set_likes(3).unwrap();
/// assert_eq!(comment.likes(), Some(3));
/// ```
#[macro_export]
macro_rules! parse_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ( $class:literal $(, hooks = $hooks:path)? $(,)? ) {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::model::Persistable for $name {
            const CLASS_NAME: &'static str = $class;
            const FIELDS: &'static [$crate::model::FieldDescriptor] = &[
                $( $crate::model::FieldDescriptor::new(stringify!($field), stringify!($ty)), )*
            ];

            $(
                fn hooks() -> $crate::model::Hooks<Self> {
                    $hooks()
                }
            )?
        }

        $crate::paste::paste! {
            #[doc = concat!("Typed field accessors for `Resource<", stringify!($name), ">`.")]
            $vis trait [<$name Fields>] {
                $(
                    $(#[$fmeta])*
                    fn $field(&self) -> ::std::option::Option<$ty>;

                    fn [<set_ $field>](
                        &mut self,
                        value: impl ::std::convert::Into<$ty>,
                    ) -> ::std::result::Result<&mut Self, $crate::error::ParseError>;
                )*
            }

            impl [<$name Fields>] for $crate::resource::Resource<$name> {
                $(
                    fn $field(&self) -> ::std::option::Option<$ty> {
                        self.get::<$ty>(stringify!($field))
                    }

                    fn [<set_ $field>](
                        &mut self,
                        value: impl ::std::convert::Into<$ty>,
                    ) -> ::std::result::Result<&mut Self, $crate::error::ParseError> {
                        let value: $ty = value.into();
                        self.set(stringify!($field), value)
                    }
                )*
            }
        }
    };
}
