//! Error types for marshaling and unmarshaling JSON:API documents.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::MultiError;
use crate::types::Cardinality;

fn at_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("[{}]", i),
        None => String::new(),
    }
}

/// Errors while turning records into a document.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("nothing to marshal: input is empty")]
    EmptyInput,

    #[error("type {kind} declares no primary key")]
    MissingPrimaryKey { kind: String },

    #[error("resource has an empty type")]
    EmptyType,

    #[error("resource of type {kind} has an empty id")]
    EmptyId { kind: String },

    #[error("type {kind} has no relationship named \"{name}\"")]
    UnknownRelationship { kind: String, name: String },

    #[error("cannot encode attribute \"{name}\": {source}")]
    Attribute {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("relationship \"{name}\"{}: {source}", at_index(.index))]
    Relationship {
        name: String,
        index: Option<usize>,
        #[source]
        source: Box<MarshalError>,
    },

    #[error("data[{index}]: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<MarshalError>,
    },

    #[error("cannot encode document: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    Custom { message: String },
}

impl MarshalError {
    /// Error for custom marshal hooks.
    pub fn custom(message: impl Into<String>) -> Self {
        MarshalError::Custom {
            message: message.into(),
        }
    }

    pub(crate) fn in_relationship(self, name: &str, index: Option<usize>) -> Self {
        MarshalError::Relationship {
            name: name.to_string(),
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_element(self, index: usize) -> Self {
        MarshalError::Element {
            index,
            source: Box::new(self),
        }
    }
}

/// Errors while turning a document into records.
#[derive(Debug, Error)]
pub enum UnmarshalError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("document carries errors instead of data: {errors}")]
    ErrorDocument { errors: MultiError },

    #[error("type {kind} declares no primary key")]
    MissingPrimaryKey { kind: String },

    #[error("resource type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("relationship \"{name}\" is to-many: null data is not allowed, use []")]
    NullToMany { name: String },

    #[error("field \"{name}\" is read-only")]
    ReadOnly { name: String },

    #[error("type {kind} has no relationship named \"{name}\"")]
    UnknownRelationship { kind: String, name: String },

    #[error("attribute \"{name}\": cannot convert {actual} into {expected}")]
    Coercion {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid id \"{id}\": expected {expected}")]
    InvalidId { id: String, expected: &'static str },

    #[error("relationship \"{name}\" is {expected}: data has the wrong shape")]
    Cardinality { name: String, expected: Cardinality },

    #[error("duplicate resource {kind}/{id}")]
    Duplicate { kind: String, id: String },

    #[error("relationship \"{name}\"{}: {source}", at_index(.index))]
    Relationship {
        name: String,
        index: Option<usize>,
        #[source]
        source: Box<UnmarshalError>,
    },

    #[error("data[{index}]: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<UnmarshalError>,
    },

    #[error("{message}")]
    Custom { message: String },
}

impl UnmarshalError {
    /// Error for custom unmarshal hooks.
    pub fn custom(message: impl Into<String>) -> Self {
        UnmarshalError::Custom {
            message: message.into(),
        }
    }

    pub(crate) fn in_relationship(self, name: &str, index: Option<usize>) -> Self {
        UnmarshalError::Relationship {
            name: name.to_string(),
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_element(self, index: usize) -> Self {
        UnmarshalError::Element {
            index,
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            UnmarshalError::Io { .. } => 3,
            _ => 2,
        }
    }
}

/// Building a [`MultiError`](crate::MultiError) from zero errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an error document needs at least one error")]
pub struct EmptyErrorList;
