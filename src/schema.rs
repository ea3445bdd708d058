//! Declarative resource schemas.
//!
//! A [`Schema`] maps the fields of a record type onto the JSON:API wire shape:
//! which field is the `id`, which fields are attributes, and which are
//! relationships (with their cardinality). Fields are registered with plain
//! projection functions, so the engines never need reflection:
//!
//! ```
//! use jsonapi::{Model, Schema};
//!
//! #[derive(Default)]
//! struct Article {
//!     id: String,
//!     title: String,
//!     author_id: String,
//! }
//!
//! impl Model for Article {
//!     fn schema() -> Schema<Self> {
//!         Schema::<Self>::new("articles")
//!             .id(|a| &a.id, |a| &mut a.id)
//!             .attribute("title", |a| &a.title, |a| &mut a.title)
//!             .to_one_id("author", "users", |a| &a.author_id, |a| &mut a.author_id)
//!     }
//! }
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::coerce::coerce;
use crate::document::{Links, Meta, Resource};
use crate::error::{MarshalError, UnmarshalError};
use crate::relation::{LinksOnly, Project, RelationshipAccess, ToMany, ToManyIds, ToOne, ToOneId};
use crate::types::{Cardinality, FieldOptions, FieldRole};

/// A record type that maps to a JSON:API resource.
///
/// Only [`schema`](Model::schema) is required. The other methods are optional
/// capabilities: returning `Some` overrides the declarative behaviour for
/// that extension point.
pub trait Model: Sized + 'static {
    /// Describe how this type maps to a resource.
    fn schema() -> Schema<Self>;

    /// Build the resource by hand instead of from the schema.
    ///
    /// Links, meta and sparse fieldsets are still applied to the result.
    fn marshal_resource(&self) -> Option<Result<Resource, MarshalError>> {
        None
    }

    /// Populate `self` from a resource by hand instead of from the schema.
    fn unmarshal_resource(&mut self, _resource: &Resource) -> Option<Result<(), UnmarshalError>> {
        None
    }

    /// Resource-level links.
    fn links(&self) -> Option<Links> {
        None
    }

    /// Resource-level meta.
    fn meta(&self) -> Option<Meta> {
        None
    }

    /// Links for the relationship named `name`.
    fn relationship_links(&self, _name: &str) -> Option<Links> {
        None
    }

    /// Meta for the relationship named `name`.
    fn relationship_meta(&self, _name: &str) -> Option<Meta> {
        None
    }
}

/// A field type usable as a resource id.
pub trait ResourceId: Default {
    /// The wire id. An empty string means "no id".
    fn to_id(&self) -> String;

    /// Parse a wire id, `None` if it does not fit this type.
    fn from_id(id: &str) -> Option<Self>;
}

impl ResourceId for String {
    fn to_id(&self) -> String {
        self.clone()
    }

    fn from_id(id: &str) -> Option<Self> {
        Some(id.to_string())
    }
}

impl<I: ResourceId> ResourceId for Option<I> {
    fn to_id(&self) -> String {
        self.as_ref().map(ResourceId::to_id).unwrap_or_default()
    }

    fn from_id(id: &str) -> Option<Self> {
        if id.is_empty() {
            Some(None)
        } else {
            I::from_id(id).map(Some)
        }
    }
}

macro_rules! numeric_id {
    ($($ty:ty),*) => {
        $(
            impl ResourceId for $ty {
                fn to_id(&self) -> String {
                    self.to_string()
                }

                fn from_id(id: &str) -> Option<Self> {
                    id.parse().ok()
                }
            }
        )*
    };
}

numeric_id!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

pub(crate) trait IdAccess<T>: Send + Sync {
    fn get(&self, record: &T) -> String;
    fn set(&self, record: &mut T, id: &str) -> Result<(), UnmarshalError>;
}

pub(crate) trait AttributeAccess<T>: Send + Sync {
    fn read(&self, record: &T) -> Result<Value, serde_json::Error>;
    fn write(&self, name: &str, record: &mut T, value: Value) -> Result<(), UnmarshalError>;
}

struct IdField<T, I> {
    get: fn(&T) -> &I,
    get_mut: fn(&mut T) -> &mut I,
}

impl<T, I: ResourceId> IdAccess<T> for IdField<T, I> {
    fn get(&self, record: &T) -> String {
        (self.get)(record).to_id()
    }

    fn set(&self, record: &mut T, id: &str) -> Result<(), UnmarshalError> {
        let parsed = I::from_id(id).ok_or_else(|| UnmarshalError::InvalidId {
            id: id.to_string(),
            expected: std::any::type_name::<I>(),
        })?;
        *(self.get_mut)(record) = parsed;
        Ok(())
    }
}

struct AttributeField<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V: Serialize + DeserializeOwned> AttributeAccess<T> for AttributeField<T, V> {
    fn read(&self, record: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value((self.get)(record))
    }

    fn write(&self, name: &str, record: &mut T, value: Value) -> Result<(), UnmarshalError> {
        *(self.get_mut)(record) = coerce(name, value)?;
        Ok(())
    }
}

impl<T, E> IdAccess<T> for Project<T, E, Box<dyn IdAccess<E>>> {
    fn get(&self, record: &T) -> String {
        self.inner.get((self.get)(record))
    }

    fn set(&self, record: &mut T, id: &str) -> Result<(), UnmarshalError> {
        self.inner.set((self.get_mut)(record), id)
    }
}

impl<T, E> AttributeAccess<T> for Project<T, E, Box<dyn AttributeAccess<E>>> {
    fn read(&self, record: &T) -> Result<Value, serde_json::Error> {
        self.inner.read((self.get)(record))
    }

    fn write(&self, name: &str, record: &mut T, value: Value) -> Result<(), UnmarshalError> {
        self.inner.write(name, (self.get_mut)(record), value)
    }
}

pub(crate) enum Access<T> {
    Attribute(Box<dyn AttributeAccess<T>>),
    Relationship(Box<dyn RelationshipAccess<T>>),
}

/// One attribute or relationship of a [`Schema`].
pub struct Field<T> {
    name: String,
    options: FieldOptions,
    pub(crate) access: Access<T>,
}

impl<T> Field<T> {
    /// Wire name of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> FieldOptions {
        self.options
    }

    pub fn role(&self) -> FieldRole {
        match &self.access {
            Access::Attribute(_) => FieldRole::Attribute,
            Access::Relationship(rel) => FieldRole::Relationship(rel.cardinality()),
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("role", &self.role())
            .field("options", &self.options)
            .finish()
    }
}

/// The declarative description of a resource type.
///
/// Built once per type with the chained methods below. Declaring a wire name
/// twice keeps the first declaration; `omit_empty` and `read_only` flag the
/// most recently declared field.
pub struct Schema<T> {
    kind: String,
    id: Option<Box<dyn IdAccess<T>>>,
    fields: Vec<Field<T>>,
    last: Option<usize>,
}

impl<T: 'static> Schema<T> {
    /// Start a schema for resources of type `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            fields: Vec::new(),
            last: None,
        }
    }

    /// Declare the primary key.
    pub fn id<I: ResourceId + 'static>(
        mut self,
        get: fn(&T) -> &I,
        get_mut: fn(&mut T) -> &mut I,
    ) -> Self {
        self.id = Some(Box::new(IdField { get, get_mut }));
        self.last = None;
        self
    }

    /// Declare an attribute.
    pub fn attribute<V: Serialize + DeserializeOwned + 'static>(
        self,
        name: impl Into<String>,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.push(
            name.into(),
            Access::Attribute(Box::new(AttributeField { get, get_mut })),
        )
    }

    /// Declare a to-one relationship holding the related record.
    pub fn to_one<R: Model + Default>(
        self,
        name: impl Into<String>,
        get: fn(&T) -> &Option<R>,
        get_mut: fn(&mut T) -> &mut Option<R>,
    ) -> Self {
        self.push(
            name.into(),
            Access::Relationship(Box::new(ToOne::<T, R, Option<R>>::new(get, get_mut))),
        )
    }

    /// Like [`to_one`](Schema::to_one), for recursive types that box the record.
    pub fn to_one_boxed<R: Model + Default>(
        self,
        name: impl Into<String>,
        get: fn(&T) -> &Option<Box<R>>,
        get_mut: fn(&mut T) -> &mut Option<Box<R>>,
    ) -> Self {
        self.push(
            name.into(),
            Access::Relationship(Box::new(ToOne::<T, R, Option<Box<R>>>::new(get, get_mut))),
        )
    }

    /// Declare a to-many relationship holding the related records.
    pub fn to_many<R: Model + Default>(
        self,
        name: impl Into<String>,
        get: fn(&T) -> &Vec<R>,
        get_mut: fn(&mut T) -> &mut Vec<R>,
    ) -> Self {
        self.push(
            name.into(),
            Access::Relationship(Box::new(ToMany::new(get, get_mut))),
        )
    }

    /// Declare a to-one relationship stored as the related resource's id.
    pub fn to_one_id<I: ResourceId + 'static>(
        self,
        name: impl Into<String>,
        related: impl Into<String>,
        get: fn(&T) -> &I,
        get_mut: fn(&mut T) -> &mut I,
    ) -> Self {
        self.push(
            name.into(),
            Access::Relationship(Box::new(ToOneId {
                related: related.into(),
                get,
                get_mut,
            })),
        )
    }

    /// Declare a to-many relationship stored as the related resources' ids.
    pub fn to_many_ids<I: ResourceId + 'static>(
        self,
        name: impl Into<String>,
        related: impl Into<String>,
        get: fn(&T) -> &Vec<I>,
        get_mut: fn(&mut T) -> &mut Vec<I>,
    ) -> Self {
        self.push(
            name.into(),
            Access::Relationship(Box::new(ToManyIds {
                related: related.into(),
                get,
                get_mut,
            })),
        )
    }

    /// Declare a relationship that only carries links and meta.
    pub fn links_only(self, name: impl Into<String>) -> Self {
        self.push(name.into(), Access::Relationship(Box::new(LinksOnly)))
    }

    /// Flatten an embedded struct's schema into this one.
    ///
    /// The embedded primary key is used when this schema declares none. The
    /// embedded type name is ignored.
    pub fn embed<E: 'static>(
        mut self,
        get: fn(&T) -> &E,
        get_mut: fn(&mut T) -> &mut E,
        embedded: Schema<E>,
    ) -> Self {
        if self.id.is_none() {
            if let Some(inner) = embedded.id {
                self.id = Some(Box::new(Project {
                    get,
                    get_mut,
                    inner,
                }));
            }
        }
        for field in embedded.fields {
            let access = match field.access {
                Access::Attribute(inner) => Access::Attribute(Box::new(Project {
                    get,
                    get_mut,
                    inner,
                })),
                Access::Relationship(inner) => Access::Relationship(Box::new(Project {
                    get,
                    get_mut,
                    inner,
                })),
            };
            self = self.push(field.name, access);
            if let Some(last) = self.last {
                self.fields[last].options = field.options;
            }
        }
        self
    }

    /// Skip the most recently declared field on marshal when it is empty.
    ///
    /// Emptiness is judged on the encoded value: `null`, `false`, `0`, `""`,
    /// `[]` and `{}` are empty. An `Option` attribute
    /// holding a zero value, such as `Some(0.0)` or `Some(String::new())`, is
    /// therefore omitted too and reads back as `None`.
    pub fn omit_empty(mut self) -> Self {
        if let Some(last) = self.last {
            self.fields[last].options.omit_empty = true;
        }
        self
    }

    /// Mark the most recently declared field read-only.
    pub fn read_only(mut self) -> Self {
        if let Some(last) = self.last {
            self.fields[last].options.read_only = true;
        }
        self
    }

    fn push(mut self, name: String, access: Access<T>) -> Self {
        if self.fields.iter().any(|f| f.name == name) {
            tracing::debug!(kind = %self.kind, field = %name, "Duplicate field ignored");
            self.last = None;
            return self;
        }
        self.fields.push(Field {
            name,
            options: FieldOptions::default(),
            access,
        });
        self.last = Some(self.fields.len() - 1);
        self
    }
}

impl<T> Schema<T> {
    /// The resource type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// True if a primary key was declared (directly or by embedding).
    pub fn has_primary_key(&self) -> bool {
        self.id.is_some()
    }

    /// Attribute and relationship fields in declaration order.
    pub fn fields(&self) -> std::slice::Iter<'_, Field<T>> {
        self.fields.iter()
    }

    /// Look up a field by wire name.
    pub fn field(&self, name: &str) -> Option<&Field<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Cardinality of the relationship named `name`, if declared.
    pub fn cardinality(&self, name: &str) -> Option<Cardinality> {
        match self.field(name)?.role() {
            FieldRole::Relationship(cardinality) => Some(cardinality),
            _ => None,
        }
    }

    pub(crate) fn id_access(&self) -> Option<&dyn IdAccess<T>> {
        self.id.as_deref()
    }

    pub(crate) fn relationship(&self, name: &str) -> Option<(&Field<T>, &dyn RelationshipAccess<T>)> {
        self.fields.iter().find_map(|field| match &field.access {
            Access::Relationship(rel) if field.name == name => Some((field, rel.as_ref())),
            _ => None,
        })
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("has_primary_key", &self.id.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}
