//! The JSON:API document model.
//!
//! These are plain data types mirroring the wire shape one-to-one. The only
//! custom serde logic lives in [`PrimaryData`] (the null / one / many union)
//! and [`Link`] (bare string vs. link object).
//!
//! Absence and `null` are kept apart wherever the wire format distinguishes
//! them: `Document::data` and `Relationship::data` are `Option<PrimaryData<_>>`,
//! where `None` means the member is missing and `Some(PrimaryData::Null)`
//! means it is present and `null`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::EmptyErrorList;

/// Free-form `meta` object.
pub type Meta = Map<String, Value>;

/// Named links (`self`, `related`, ...).
pub type Links = BTreeMap<String, Link>;

/// Deserialize a present member, keeping `null` as a value instead of `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Primary data: `null`, a single value, or an array of values.
///
/// Used both for a document's `data` (over [`Resource`]) and a relationship's
/// `data` (over [`Ref`]). Accessors for the inactive variant return `None`
/// rather than failing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PrimaryData<T> {
    #[default]
    Null,
    One(T),
    Many(Vec<T>),
}

impl<T> PrimaryData<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, PrimaryData::Null)
    }

    /// The single value, if this is the `One` variant.
    pub fn one(&self) -> Option<&T> {
        match self {
            PrimaryData::One(value) => Some(value),
            _ => None,
        }
    }

    /// The values, if this is the `Many` variant.
    pub fn many(&self) -> Option<&[T]> {
        match self {
            PrimaryData::Many(values) => Some(values),
            _ => None,
        }
    }

    /// Iterate over every contained value regardless of variant.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            PrimaryData::Null => Default::default(),
            PrimaryData::One(value) => std::slice::from_ref(value).iter(),
            PrimaryData::Many(values) => values.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        match self {
            PrimaryData::Null => Default::default(),
            PrimaryData::One(value) => std::slice::from_mut(value).iter_mut(),
            PrimaryData::Many(values) => values.iter_mut(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            PrimaryData::Null => Vec::new(),
            PrimaryData::One(value) => vec![value],
            PrimaryData::Many(values) => values,
        }
    }
}

impl<T: Serialize> Serialize for PrimaryData<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PrimaryData::Null => serializer.serialize_unit(),
            PrimaryData::One(value) => value.serialize(serializer),
            PrimaryData::Many(values) => values.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for PrimaryData<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(PrimaryData::Null),
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
                .collect::<Result<Vec<T>, _>>()
                .map(PrimaryData::Many),
            value @ Value::Object(_) => serde_json::from_value(value)
                .map(PrimaryData::One)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "data must be null, an object or an array, got {}",
                crate::types::json_type_name(&other)
            ))),
        }
    }
}

/// A link: a bare URL, or a link object with `meta`.
///
/// Serializes as a string when it has no meta, as `{"href", "meta"}`
/// otherwise, and as `null` when `href` is empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub href: String,
    pub meta: Option<Meta>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        if self.href.is_empty() {
            return serializer.serialize_none();
        }
        match &self.meta {
            Some(meta) if !meta.is_empty() => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("href", &self.href)?;
                map.serialize_entry("meta", meta)?;
                map.end()
            }
            _ => serializer.serialize_str(&self.href),
        }
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Link::default()),
            Value::String(href) => Ok(Link::new(href)),
            Value::Object(mut obj) => {
                let href = match obj.remove("href") {
                    Some(Value::String(href)) => href,
                    None | Some(Value::Null) => String::new(),
                    Some(other) => {
                        return Err(D::Error::custom(format!(
                            "link href must be a string, got {}",
                            crate::types::json_type_name(&other)
                        )))
                    }
                };
                let meta = match obj.remove("meta") {
                    Some(Value::Object(meta)) => Some(meta),
                    _ => None,
                };
                Ok(Link { href, meta })
            }
            other => Err(D::Error::custom(format!(
                "link must be a string or an object, got {}",
                crate::types::json_type_name(&other)
            ))),
        }
    }
}

/// A resource identifier: the identity-only subset of a [`Resource`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Ref {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            lid: None,
            meta: None,
        }
    }
}

/// A relationship object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationship {
    /// `None` when the member is absent (links-only relationships).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<PrimaryData<Ref>>,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

impl Relationship {
    /// True when the relationship would serialize to `{}`.
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.links.is_empty() && self.meta.is_empty()
    }
}

/// A resource object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

impl Resource {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            ..Default::default()
        }
    }

    /// The identifier for this resource.
    pub fn to_ref(&self) -> Ref {
        Ref {
            kind: self.kind.clone(),
            id: self.id.clone(),
            lid: self.lid.clone(),
            meta: None,
        }
    }

    /// Replace `attributes` with the fields of any serializable struct or map.
    ///
    /// # Errors
    ///
    /// Fails if the value does not serialize to a JSON object.
    pub fn set_attributes<S: Serialize>(&mut self, value: &S) -> Result<(), serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => {
                self.attributes = map;
                Ok(())
            }
            other => Err(serde_json::Error::custom(format!(
                "attributes must serialize to an object, got {}",
                crate::types::json_type_name(&other)
            ))),
        }
    }
}

/// Where in the request an error originated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON Pointer (RFC 6901) into the request document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pointer: String,
    /// Query parameter that caused the error.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub header: String,
}

/// A JSON:API error object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// HTTP status code, as a string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

impl ErrorObject {
    pub fn new(status: u16, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            title: title.into(),
            detail: detail.into(),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).pointer = pointer.into();
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).parameter = parameter.into();
        self
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.status.is_empty() {
            write!(f, "{} ", self.status)?;
        }
        match (self.title.is_empty(), self.detail.is_empty()) {
            (false, false) => write!(f, "{}: {}", self.title, self.detail),
            (false, true) => f.write_str(&self.title),
            (true, false) => f.write_str(&self.detail),
            (true, true) => f.write_str(&self.code),
        }
    }
}

impl std::error::Error for ErrorObject {}

/// A non-empty, ordered list of error objects.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiError(Vec<ErrorObject>);

impl MultiError {
    /// # Errors
    ///
    /// Returns [`EmptyErrorList`] when `errors` yields nothing.
    pub fn new(errors: impl IntoIterator<Item = ErrorObject>) -> Result<Self, EmptyErrorList> {
        let errors: Vec<ErrorObject> = errors.into_iter().collect();
        if errors.is_empty() {
            return Err(EmptyErrorList);
        }
        Ok(Self(errors))
    }

    pub fn errors(&self) -> &[ErrorObject] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<ErrorObject> {
        self.0
    }
}

impl TryFrom<Vec<ErrorObject>> for MultiError {
    type Error = EmptyErrorList;

    fn try_from(errors: Vec<ErrorObject>) -> Result<Self, Self::Error> {
        MultiError::new(errors)
    }
}

impl From<ErrorObject> for MultiError {
    fn from(error: ErrorObject) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

/// The top-level `jsonapi` object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonApiObject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
}

/// A JSON:API document.
///
/// `data` and `errors` are mutually exclusive in a well-formed response; the
/// model does not enforce it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<PrimaryData<Resource>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
}

impl Document {
    /// An error document.
    pub fn from_errors(errors: MultiError) -> Self {
        Self {
            errors: errors.into_errors(),
            ..Default::default()
        }
    }

    /// Primary resources, in order. Empty for null or absent data.
    pub fn primary(&self) -> std::slice::Iter<'_, Resource> {
        match &self.data {
            Some(data) => data.iter(),
            None => Default::default(),
        }
    }

    /// Find a resource in `included` by identity.
    pub fn find_included(&self, kind: &str, id: &str) -> Option<&Resource> {
        self.included
            .iter()
            .find(|r| r.kind == kind && r.id == id)
    }
}
