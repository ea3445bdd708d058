//! The unmarshal engine: documents to records.
//!
//! Records are built from their default and only stored into the target
//! once the whole document has been read. A failed call leaves the target
//! as it was.
//! Relationship linkage is resolved through a [`Reader`], which knows the
//! document's `included` resources and the caller's options.

use std::collections::{HashMap, HashSet};

use crate::codec::{decode_document, JsonCodec};
use crate::document::{Document, MultiError, PrimaryData, Ref, Relationship, Resource};
use crate::error::UnmarshalError;
use crate::options::UnmarshalOptions;
use crate::schema::{Access, Field, Model, Schema};

/// Something a document's primary data can be unmarshaled into.
///
/// Implemented for a single record `M`, `Option<M>` and `Vec<M>`:
///
/// | Primary data | `M` | `Option<M>` | `Vec<M>` |
/// |--------------|-----|-------------|----------|
/// | `null` | `M::default()` | `None` | empty |
/// | one resource | filled | `Some` | one element |
/// | array | first element | first element | every element |
pub trait Target {
    fn assign(
        &mut self,
        data: &PrimaryData<Resource>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError>;
}

impl<M: Model + Default> Target for M {
    fn assign(
        &mut self,
        data: &PrimaryData<Resource>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        let mut record = M::default();
        if let Some(resource) = first(data) {
            reader.expand(&mut record, resource, &M::schema())?;
        }
        *self = record;
        Ok(())
    }
}

impl<M: Model + Default> Target for Option<M> {
    fn assign(
        &mut self,
        data: &PrimaryData<Resource>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        *self = match first(data) {
            Some(resource) => {
                let mut record = M::default();
                reader.expand(&mut record, resource, &M::schema())?;
                Some(record)
            }
            None => None,
        };
        Ok(())
    }
}

impl<M: Model + Default> Target for Vec<M> {
    fn assign(
        &mut self,
        data: &PrimaryData<Resource>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        let schema = M::schema();
        let mut records = Vec::new();
        for (i, resource) in data.iter().enumerate() {
            let mut record = M::default();
            reader
                .expand(&mut record, resource, &schema)
                .map_err(|e| e.at_element(i))?;
            records.push(record);
        }
        *self = records;
        Ok(())
    }
}

/// The resource a single-record target reads.
fn first(data: &PrimaryData<Resource>) -> Option<&Resource> {
    match data {
        PrimaryData::Null => None,
        PrimaryData::One(resource) => Some(resource),
        PrimaryData::Many(resources) => {
            if resources.len() > 1 {
                tracing::debug!(
                    dropped = resources.len() - 1,
                    "Surplus primary resources dropped"
                );
            }
            resources.first()
        }
    }
}

/// Per-call unmarshal state.
pub struct Reader<'a> {
    options: &'a UnmarshalOptions,
    included: HashMap<(&'a str, &'a str), &'a Resource>,
    expanding: HashSet<(String, String)>,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(document: &'a Document, options: &'a UnmarshalOptions) -> Self {
        let mut included = HashMap::new();
        if options.populate_from_included {
            for resource in &document.included {
                included
                    .entry((resource.kind.as_str(), resource.id.as_str()))
                    .or_insert(resource);
            }
        }
        Self {
            options,
            included,
            expanding: HashSet::new(),
            depth: 0,
        }
    }

    /// Tolerate or reject a resource type that differs from the schema's.
    pub(crate) fn check_type(&self, expected: &str, actual: &str) -> Result<(), UnmarshalError> {
        if expected == actual {
            return Ok(());
        }
        if self.options.strict_types {
            return Err(UnmarshalError::TypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        tracing::debug!(expected, actual, "Resource type mismatch tolerated");
        Ok(())
    }

    /// Build a related record from its identifier.
    ///
    /// With `populate_from_included` the full resource is read from
    /// `included` when present. Otherwise, when the resource is already
    /// being expanded further up, or past `max_hydration_depth`, the record
    /// carries only its identity.
    pub(crate) fn materialize<R: Model + Default>(
        &mut self,
        id: &Ref,
        schema: &Schema<R>,
    ) -> Result<R, UnmarshalError> {
        let mut record = R::default();
        let within = self
            .options
            .max_hydration_depth
            .map_or(true, |max| self.depth < max);
        let found = self
            .included
            .get(&(id.kind.as_str(), id.id.as_str()))
            .copied()
            .filter(|_| within)
            .filter(|_| !self.expanding.contains(&(id.kind.clone(), id.id.clone())));

        match found {
            Some(resource) => {
                self.depth += 1;
                let result = self.expand(&mut record, resource, schema);
                self.depth -= 1;
                result?
            }
            None => {
                if self.options.populate_from_included {
                    tracing::debug!(kind = %id.kind, id = %id.id, "Related resource left identity-only");
                }
                let stub = Resource {
                    kind: id.kind.clone(),
                    id: id.id.clone(),
                    lid: id.lid.clone(),
                    ..Default::default()
                };
                self.fill(&mut record, &stub, schema)?;
            }
        }
        Ok(record)
    }

    /// Fill `record` from `resource`, guarding against re-entering it.
    pub(crate) fn expand<M: Model>(
        &mut self,
        record: &mut M,
        resource: &Resource,
        schema: &Schema<M>,
    ) -> Result<(), UnmarshalError> {
        let key = (resource.kind.clone(), resource.id.clone());
        let fresh = self.expanding.insert(key.clone());
        let result = self.fill(record, resource, schema);
        if fresh {
            self.expanding.remove(&key);
        }
        result
    }

    fn fill<M: Model>(
        &mut self,
        record: &mut M,
        resource: &Resource,
        schema: &Schema<M>,
    ) -> Result<(), UnmarshalError> {
        if let Some(result) = record.unmarshal_resource(resource) {
            return result;
        }

        let id = schema
            .id_access()
            .ok_or_else(|| UnmarshalError::MissingPrimaryKey {
                kind: schema.kind().to_string(),
            })?;
        self.check_type(schema.kind(), &resource.kind)?;
        if !resource.id.is_empty() {
            id.set(record, &resource.id)?;
        }

        for field in schema.fields() {
            let name = field.name();
            match &field.access {
                Access::Attribute(attribute) => {
                    let Some(value) = resource.attributes.get(name) else {
                        continue;
                    };
                    self.check_read_only(field)?;
                    attribute.write(name, record, value.clone())?;
                }
                Access::Relationship(relationship) => {
                    let Some(data) = resource.relationships.get(name).and_then(|r| r.data.as_ref())
                    else {
                        continue;
                    };
                    self.check_read_only(field)?;
                    relationship.assign(name, record, data, self)?;
                }
            }
        }
        Ok(())
    }

    fn check_read_only<T>(&self, field: &Field<T>) -> Result<(), UnmarshalError> {
        if field.options().read_only && !self.options.permissive_read_only {
            return Err(UnmarshalError::ReadOnly {
                name: field.name().to_string(),
            });
        }
        Ok(())
    }
}

/// Unmarshal an encoded document into `target`.
///
/// # Errors
///
/// Fails on malformed input, on an error document, and on any field that
/// can't be assigned (see [`UnmarshalError`]).
pub fn unmarshal<T: Target>(
    bytes: &[u8],
    target: &mut T,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    let document = decode_document(options.codec.as_ref(), bytes)?;
    unmarshal_from_document(&document, target, options)
}

/// Unmarshal an already decoded document into `target`.
///
/// A document without `data` but with `errors` fails with
/// [`UnmarshalError::ErrorDocument`]; without either it reads as `null`.
///
/// # Errors
///
/// See [`unmarshal`].
pub fn unmarshal_from_document<T: Target>(
    document: &Document,
    target: &mut T,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    if document.data.is_none() {
        if let Ok(errors) = MultiError::new(document.errors.iter().cloned()) {
            return Err(UnmarshalError::ErrorDocument { errors });
        }
    }
    if options.check_uniqueness {
        check_unique(document)?;
    }

    let null = PrimaryData::Null;
    let data = document.data.as_ref().unwrap_or(&null);
    let mut reader = Reader::new(document, options);
    target.assign(data, &mut reader)
}

/// Decode bytes into a [`Document`] without mapping it onto records.
///
/// # Errors
///
/// Returns `UnmarshalError::Decode` if the bytes are not a JSON:API document.
pub fn unmarshal_document(bytes: &[u8]) -> Result<Document, UnmarshalError> {
    decode_document(&JsonCodec::default(), bytes)
}

/// Unmarshal a relationship document into relationship `name` of `target`.
///
/// Other fields of `target` are left untouched, and to-many relationships
/// are appended to. A payload without `data` changes nothing.
///
/// # Errors
///
/// Fails with [`UnmarshalError::UnknownRelationship`] if `name` is not a
/// relationship of `M`, and with [`UnmarshalError::NullToMany`] when a to-many
/// relationship receives `null`.
pub fn unmarshal_ref<M: Model>(
    bytes: &[u8],
    name: &str,
    target: &mut M,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    let value = options
        .codec
        .decode(bytes)
        .map_err(|source| UnmarshalError::Decode { source })?;
    let relationship: Relationship =
        serde_json::from_value(value).map_err(|source| UnmarshalError::Decode { source })?;

    let schema = M::schema();
    let (field, access) = schema
        .relationship(name)
        .ok_or_else(|| UnmarshalError::UnknownRelationship {
            kind: schema.kind().to_string(),
            name: name.to_string(),
        })?;
    let Some(data) = relationship.data.as_ref() else {
        return Ok(());
    };

    let document = Document::default();
    let mut reader = Reader::new(&document, options);
    reader.check_read_only(field)?;
    access.assign(name, target, data, &mut reader)
}

fn check_unique(document: &Document) -> Result<(), UnmarshalError> {
    let mut seen = HashSet::new();
    for resource in document.primary().chain(&document.included) {
        if resource.id.is_empty() {
            continue;
        }
        if !seen.insert((resource.kind.as_str(), resource.id.as_str())) {
            return Err(UnmarshalError::Duplicate {
                kind: resource.kind.clone(),
                id: resource.id.clone(),
            });
        }
    }
    Ok(())
}
