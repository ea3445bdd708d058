//! JSON:API Marshal
//!
//! Maps native records to and from JSON:API documents.
//!
//! Each record type declares a [`Schema`] through the [`Model`] trait: which
//! field is the id, which are attributes, and which are relationships. The
//! engines then handle the wire rules: `null` vs. `[]` linkage, compound
//! documents with deduplicated `included`, sparse fieldsets, links and type
//! coercion on read.
//!
//! # Example
//!
//! ```
//! use jsonapi::{marshal, unmarshal, MarshalOptions, Model, Schema, UnmarshalOptions};
//! use serde_json::{json, Value};
//!
//! #[derive(Debug, Default, PartialEq)]
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
//!
//! let article = Article {
//!     id: "1".into(),
//!     title: "Hello".into(),
//!     author_id: "7".into(),
//! };
//!
//! let bytes = marshal(&article, &MarshalOptions::new()).unwrap();
//! let value: Value = serde_json::from_slice(&bytes).unwrap();
//! assert_eq!(
//!     value,
//!     json!({
//!         "data": {
//!             "type": "articles",
//!             "id": "1",
//!             "attributes": { "title": "Hello" },
//!             "relationships": {
//!                 "author": { "data": { "type": "users", "id": "7" } }
//!             }
//!         }
//!     })
//! );
//!
//! let mut decoded = Article::default();
//! unmarshal(&bytes, &mut decoded, &UnmarshalOptions::new()).unwrap();
//! assert_eq!(decoded, article);
//! ```
//!
//! # Relationship Data
//!
//! | Field | Empty value | Wire `data` |
//! |-------|-------------|-------------|
//! | `to_one` / `to_one_id` | `None` / `""` | `null` |
//! | `to_many` / `to_many_ids` | `vec![]` | `[]` |
//! | `links_only` | - | absent |
//!
//! Marking a relationship `omit_empty` drops it entirely when empty. On the
//! way in, `null` for a to-many relationship is rejected with
//! [`UnmarshalError::NullToMany`].

mod codec;
mod coerce;
mod document;
mod error;
mod fieldset;
mod links;
mod marshal;
mod options;
mod relation;
mod schema;
mod types;
mod unmarshal;

pub use codec::{load_document, load_document_str, Codec, JsonCodec};
pub use coerce::{coerce, parse_bool};
pub use document::{
    Document, ErrorObject, ErrorSource, JsonApiObject, Link, Links, Meta, MultiError, PrimaryData,
    Ref, Relationship, Resource,
};
pub use error::{EmptyErrorList, MarshalError, UnmarshalError};
pub use fieldset::{apply_fieldset, apply_fieldsets};
pub use links::{LinkContext, LinkResolver, UrlResolver};
pub use marshal::{
    marshal, marshal_document, marshal_errors, marshal_ref, marshal_relationship, Primary,
};
pub use options::{Fieldset, MarshalOptions, UnmarshalOptions};
pub use schema::{Field, Model, ResourceId, Schema};
pub use types::{Cardinality, FieldOptions, FieldRole};
pub use unmarshal::{unmarshal, unmarshal_document, unmarshal_from_document, unmarshal_ref, Target};
