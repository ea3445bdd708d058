//! The marshal engine: records to documents.
//!
//! Each record becomes a [`Resource`] either through its [`Model`] hook or by
//! walking its [`Schema`]. Links and meta are then layered on (model hooks
//! first, registered resolvers for whatever is still missing), followed by
//! the sparse fieldset for the resource's type.
//!
//! With [`MarshalOptions::include`] set, related records are collected into
//! `included` breadth-first. Every `(type, id)` is emitted at most once, and
//! the primary resources themselves are never repeated there.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::document::{Document, Meta, MultiError, PrimaryData, Ref, Relationship, Resource};
use crate::error::MarshalError;
use crate::fieldset::apply_fieldset;
use crate::links::{apply_resolvers, merge_links, LinkContext};
use crate::options::MarshalOptions;
use crate::schema::{Access, Model, Schema};
use crate::types::is_empty_value;

/// What to marshal as primary data.
#[derive(Debug)]
pub enum Primary<'a, M> {
    /// No value. Marshaling it fails with [`MarshalError::EmptyInput`].
    Null,
    One(&'a M),
    Many(&'a [M]),
}

impl<M> Clone for Primary<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Primary<'_, M> {}

impl<'a, M: Model> From<&'a M> for Primary<'a, M> {
    fn from(record: &'a M) -> Self {
        Primary::One(record)
    }
}

impl<'a, M: Model> From<&'a [M]> for Primary<'a, M> {
    fn from(records: &'a [M]) -> Self {
        Primary::Many(records)
    }
}

impl<'a, M: Model> From<Option<&'a M>> for Primary<'a, M> {
    fn from(record: Option<&'a M>) -> Self {
        record.map_or(Primary::Null, Primary::One)
    }
}

/// Marshal records into an encoded document.
///
/// # Errors
///
/// Fails if the input is empty, a record (or anything it relates to) has no
/// usable identity, an attribute can't be serialized, or encoding fails.
pub fn marshal<'a, M: Model>(
    value: impl Into<Primary<'a, M>>,
    options: &MarshalOptions,
) -> Result<Vec<u8>, MarshalError> {
    let document = marshal_document(value, options)?;
    encode(&document, options)
}

/// Marshal records into a [`Document`].
///
/// # Errors
///
/// See [`marshal`].
pub fn marshal_document<'a, M: Model>(
    value: impl Into<Primary<'a, M>>,
    options: &MarshalOptions,
) -> Result<Document, MarshalError> {
    let schema = M::schema();
    let (records, data) = match value.into() {
        Primary::Null => return Err(MarshalError::EmptyInput),
        Primary::One(record) => {
            let resource = build(record, &schema, options, true)?;
            (std::slice::from_ref(record), PrimaryData::One(resource))
        }
        Primary::Many(records) => {
            let resources = records
                .iter()
                .enumerate()
                .map(|(i, record)| build(record, &schema, options, true).map_err(|e| e.at_element(i)))
                .collect::<Result<Vec<_>, _>>()?;
            (records, PrimaryData::Many(resources))
        }
    };

    let included = if options.include {
        collect_included(records, &schema, data.iter(), options)?
    } else {
        Vec::new()
    };

    Ok(Document {
        data: Some(data),
        errors: options.errors.clone(),
        meta: options.meta.clone(),
        links: options.links.clone(),
        included,
        jsonapi: options.jsonapi.clone(),
    })
}

/// Marshal one relationship of `record` as a relationship document.
///
/// # Errors
///
/// Fails with [`MarshalError::UnknownRelationship`] if `name` is not a
/// relationship of `M`, or if the linkage can't be built or encoded.
pub fn marshal_ref<M: Model>(
    record: &M,
    name: &str,
    options: &MarshalOptions,
) -> Result<Vec<u8>, MarshalError> {
    let relationship = marshal_relationship(record, name, options)?;
    encode(&relationship, options)
}

/// Build one relationship of `record`, with top-level links and meta merged in.
///
/// # Errors
///
/// See [`marshal_ref`].
pub fn marshal_relationship<M: Model>(
    record: &M,
    name: &str,
    options: &MarshalOptions,
) -> Result<Relationship, MarshalError> {
    let schema = M::schema();
    let unknown = || MarshalError::UnknownRelationship {
        kind: schema.kind().to_string(),
        name: name.to_string(),
    };

    let (kind, id, mut relationship) = match record.marshal_resource() {
        Some(custom) => {
            let mut resource = custom?;
            let relationship = resource.relationships.remove(name).ok_or_else(unknown)?;
            (resource.kind, resource.id, relationship)
        }
        None => {
            let (_, access) = schema.relationship(name).ok_or_else(unknown)?;
            let id = schema
                .id_access()
                .map(|id| id.get(record))
                .unwrap_or_default();
            let relationship = Relationship {
                data: access.linkage(name, record)?,
                ..Default::default()
            };
            (schema.kind().to_string(), id, relationship)
        }
    };

    decorate_relationship(record, &kind, &id, name, &mut relationship, options);
    merge_links(&mut relationship.links, options.links.clone());
    merge_meta(&mut relationship.meta, options.meta.clone());
    Ok(relationship)
}

/// Encode an error document.
///
/// # Errors
///
/// Fails only if encoding fails.
pub fn marshal_errors(errors: &MultiError, options: &MarshalOptions) -> Result<Vec<u8>, MarshalError> {
    let mut document = Document::from_errors(errors.clone());
    document.meta = options.meta.clone();
    document.links = options.links.clone();
    document.jsonapi = options.jsonapi.clone();
    encode(&document, options)
}

fn encode<S: Serialize>(value: &S, options: &MarshalOptions) -> Result<Vec<u8>, MarshalError> {
    let value = serde_json::to_value(value).map_err(|source| MarshalError::Encode { source })?;
    options
        .codec
        .encode(&value)
        .map_err(|source| MarshalError::Encode { source })
}

/// The identifier `record` marshals to.
pub(crate) fn identify<M: Model>(record: &M, schema: &Schema<M>) -> Result<Ref, MarshalError> {
    let (kind, id) = match record.marshal_resource() {
        Some(custom) => {
            let resource = custom?;
            (resource.kind, resource.id)
        }
        None => {
            let access = schema
                .id_access()
                .ok_or_else(|| MarshalError::MissingPrimaryKey {
                    kind: schema.kind().to_string(),
                })?;
            (schema.kind().to_string(), access.get(record))
        }
    };
    if kind.is_empty() {
        return Err(MarshalError::EmptyType);
    }
    if id.is_empty() {
        return Err(MarshalError::EmptyId { kind });
    }
    Ok(Ref::new(kind, id))
}

/// Build the full resource for `record`.
///
/// `primary` resources may lack an id in client mode.
fn build<M: Model>(
    record: &M,
    schema: &Schema<M>,
    options: &MarshalOptions,
    primary: bool,
) -> Result<Resource, MarshalError> {
    let mut resource = match record.marshal_resource() {
        Some(custom) => custom?,
        None => from_schema(record, schema)?,
    };
    if resource.kind.is_empty() {
        return Err(MarshalError::EmptyType);
    }
    if resource.id.is_empty() && !(primary && options.client_mode) {
        return Err(MarshalError::EmptyId {
            kind: resource.kind,
        });
    }

    decorate(record, &mut resource, options);
    if let Some(fieldset) = options.fieldset(&resource.kind) {
        apply_fieldset(&mut resource, fieldset);
    }
    Ok(resource)
}

fn from_schema<M: Model>(record: &M, schema: &Schema<M>) -> Result<Resource, MarshalError> {
    let id = schema
        .id_access()
        .ok_or_else(|| MarshalError::MissingPrimaryKey {
            kind: schema.kind().to_string(),
        })?;
    let mut resource = Resource::new(schema.kind(), id.get(record));

    for field in schema.fields() {
        let omit_empty = field.options().omit_empty;
        match &field.access {
            Access::Attribute(attribute) => {
                let value = attribute
                    .read(record)
                    .map_err(|source| MarshalError::Attribute {
                        name: field.name().to_string(),
                        source,
                    })?;
                if omit_empty && is_empty_value(&value) {
                    continue;
                }
                resource.attributes.insert(field.name().to_string(), value);
            }
            Access::Relationship(relationship) => {
                let data = relationship.linkage(field.name(), record)?;
                if omit_empty && data.as_ref().is_some_and(is_empty_linkage) {
                    continue;
                }
                resource.relationships.insert(
                    field.name().to_string(),
                    Relationship {
                        data,
                        ..Default::default()
                    },
                );
            }
        }
    }
    Ok(resource)
}

fn is_empty_linkage(data: &PrimaryData<Ref>) -> bool {
    match data {
        PrimaryData::Null => true,
        PrimaryData::One(_) => false,
        PrimaryData::Many(ids) => ids.is_empty(),
    }
}

/// Layer hook-provided and resolved links and meta onto `resource`.
///
/// Relationships left with nothing to say are dropped.
fn decorate<M: Model>(record: &M, resource: &mut Resource, options: &MarshalOptions) {
    let Resource {
        kind,
        id,
        relationships,
        links,
        meta,
        ..
    } = resource;

    if let Some(extra) = record.links() {
        merge_links(links, extra);
    }
    if let Some(extra) = record.meta() {
        merge_meta(meta, extra);
    }
    let context = LinkContext::Resource { kind, id };
    apply_resolvers(&options.resolvers, &context, links);

    for (name, relationship) in relationships.iter_mut() {
        decorate_relationship(record, kind, id, name, relationship, options);
    }
    relationships.retain(|_, relationship| !relationship.is_empty());
}

fn decorate_relationship<M: Model>(
    record: &M,
    kind: &str,
    id: &str,
    name: &str,
    relationship: &mut Relationship,
    options: &MarshalOptions,
) {
    if let Some(extra) = record.relationship_links(name) {
        merge_links(&mut relationship.links, extra);
    }
    if let Some(extra) = record.relationship_meta(name) {
        merge_meta(&mut relationship.meta, extra);
    }
    let context = LinkContext::Relationship { kind, id, name };
    apply_resolvers(&options.resolvers, &context, &mut relationship.links);
}

fn merge_meta(meta: &mut Meta, extra: Meta) {
    for (key, value) in extra {
        meta.entry(key).or_insert(value);
    }
}

/// A related record waiting to be included.
pub(crate) struct Child<'a> {
    pub(crate) name: &'a str,
    pub(crate) index: Option<usize>,
    pub(crate) node: Box<dyn Node<'a> + 'a>,
}

/// A record of some model type, erased for the include walk.
pub(crate) trait Node<'a> {
    fn identity(&self) -> Result<Ref, MarshalError>;
    fn resource(&self, options: &MarshalOptions) -> Result<Resource, MarshalError>;
    fn children(&self, out: &mut Vec<Child<'a>>);
}

pub(crate) struct Bound<'a, R> {
    record: &'a R,
    schema: &'a Schema<R>,
}

impl<'a, R> Bound<'a, R> {
    pub(crate) fn new(record: &'a R, schema: &'a Schema<R>) -> Self {
        Self { record, schema }
    }
}

impl<'a, R: Model> Node<'a> for Bound<'a, R> {
    fn identity(&self) -> Result<Ref, MarshalError> {
        identify(self.record, self.schema)
    }

    fn resource(&self, options: &MarshalOptions) -> Result<Resource, MarshalError> {
        build(self.record, self.schema, options, false)
    }

    fn children(&self, out: &mut Vec<Child<'a>>) {
        let schema: &'a Schema<R> = self.schema;
        let record: &'a R = self.record;
        for field in schema.fields() {
            if let Access::Relationship(relationship) = &field.access {
                relationship.related(field.name(), record, out);
            }
        }
    }
}

/// Resources collected for `included`, deduplicated by `(type, id)`.
struct IncludeSet {
    seen: HashSet<(String, String)>,
    resources: Vec<Resource>,
}

impl IncludeSet {
    fn new<'r>(primary: impl Iterator<Item = &'r Resource>) -> Self {
        Self {
            seen: primary.map(|r| (r.kind.clone(), r.id.clone())).collect(),
            resources: Vec::new(),
        }
    }

    /// Claim `identity`, false if it was already claimed.
    fn claim(&mut self, identity: &Ref) -> bool {
        self.seen.insert((identity.kind.clone(), identity.id.clone()))
    }

    fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    fn into_resources(self) -> Vec<Resource> {
        self.resources
    }
}

fn collect_included<'a, 'r, M: Model>(
    records: &'a [M],
    schema: &'a Schema<M>,
    primary: impl Iterator<Item = &'r Resource>,
    options: &MarshalOptions,
) -> Result<Vec<Resource>, MarshalError> {
    let mut set = IncludeSet::new(primary);
    let mut children = Vec::new();
    for record in records {
        Bound::new(record, schema).children(&mut children);
    }
    let mut queue: VecDeque<(usize, Child<'a>)> = children.drain(..).map(|c| (1, c)).collect();

    while let Some((depth, child)) = queue.pop_front() {
        if options.max_include_depth.is_some_and(|max| depth > max) {
            tracing::debug!(relationship = child.name, depth, "Include depth reached");
            continue;
        }
        let identity = child
            .node
            .identity()
            .map_err(|e| e.in_relationship(child.name, child.index))?;
        if !set.claim(&identity) {
            tracing::debug!(kind = %identity.kind, id = %identity.id, "Already included");
            continue;
        }
        let resource = child
            .node
            .resource(options)
            .map_err(|e| e.in_relationship(child.name, child.index))?;
        set.push(resource);

        child.node.children(&mut children);
        queue.extend(children.drain(..).map(|c| (depth + 1, c)));
    }
    Ok(set.into_resources())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ErrorObject, Link};
    use serde_json::{json, Value};

    #[derive(Debug, Default, Clone)]
    struct Step {
        id: String,
        name: String,
        next: Option<Box<Step>>,
    }

    impl Model for Step {
        fn schema() -> Schema<Self> {
            Schema::<Self>::new("steps")
                .id(|n| &n.id, |n| &mut n.id)
                .attribute("name", |n| &n.name, |n| &mut n.name)
                .to_one_boxed("next", |n| &n.next, |n| &mut n.next)
        }
    }

    fn chain(ids: &[&str]) -> Step {
        ids.iter().rev().fold(None, |next, id| {
            Some(Step {
                id: id.to_string(),
                name: format!("node {id}"),
                next: next.map(Box::new),
            })
        })
        .unwrap()
    }

    fn included_ids(doc: &Document) -> Vec<&str> {
        doc.included.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn null_input_is_rejected() {
        let err = marshal_document::<Step>(Primary::Null, &MarshalOptions::new()).unwrap_err();
        assert!(matches!(err, MarshalError::EmptyInput));
        let err = marshal_document::<Step>(None, &MarshalOptions::new()).unwrap_err();
        assert!(matches!(err, MarshalError::EmptyInput));
    }

    #[test]
    fn include_is_off_by_default() {
        let doc = marshal_document(&chain(&["a", "b"]), &MarshalOptions::new()).unwrap();
        assert!(doc.included.is_empty());
    }

    #[test]
    fn includes_are_breadth_first() {
        let opts = MarshalOptions::new().include(true);
        let doc = marshal_document(&chain(&["a", "b", "c", "d"]), &opts).unwrap();
        assert_eq!(included_ids(&doc), ["b", "c", "d"]);
    }

    #[test]
    fn depth_bound() {
        let opts = MarshalOptions::new().include(true).max_include_depth(1);
        let doc = marshal_document(&chain(&["a", "b", "c"]), &opts).unwrap();
        assert_eq!(included_ids(&doc), ["b"]);

        let opts = MarshalOptions::new().include(true).max_include_depth(0);
        let doc = marshal_document(&chain(&["a", "b"]), &opts).unwrap();
        assert!(doc.included.is_empty());
    }

    #[test]
    fn cycles_terminate_and_skip_primary() {
        let opts = MarshalOptions::new().include(true);
        let doc = marshal_document(&chain(&["a", "b", "a", "b"]), &opts).unwrap();
        assert_eq!(included_ids(&doc), ["b"]);
    }

    #[test]
    fn primary_resources_are_not_included() {
        let records = vec![chain(&["a", "b"]), chain(&["b", "c"])];
        let opts = MarshalOptions::new().include(true);
        let doc = marshal_document(records.as_slice(), &opts).unwrap();
        assert_eq!(included_ids(&doc), ["c"]);
    }

    #[test]
    fn related_identity_errors_name_the_relationship() {
        let mut root = chain(&["a", "b"]);
        if let Some(next) = root.next.as_mut() {
            next.id.clear();
        }
        let err = marshal_document(&root, &MarshalOptions::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "relationship \"next\": resource of type steps has an empty id"
        );
    }

    #[test]
    fn primary_errors_carry_the_index() {
        let records = vec![chain(&["a"]), Step::default()];
        let err = marshal_document(records.as_slice(), &MarshalOptions::new()).unwrap_err();
        assert!(matches!(err, MarshalError::Element { index: 1, .. }));
    }

    #[test]
    fn client_mode_allows_missing_primary_id() {
        let record = Step {
            name: "draft".into(),
            ..Default::default()
        };
        assert!(marshal_document(&record, &MarshalOptions::new()).is_err());

        let doc = marshal_document(&record, &MarshalOptions::new().client_mode(true)).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value["data"],
            json!({
                "type": "steps",
                "attributes": { "name": "draft" },
                "relationships": { "next": { "data": null } }
            })
        );
    }

    #[test]
    fn top_level_members_are_injected() {
        let opts = MarshalOptions::new()
            .meta("total", 1)
            .link("self", Link::new("/nodes"))
            .jsonapi_version("1.1");
        let bytes = marshal(&chain(&["a"]), &opts).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["meta"], json!({ "total": 1 }));
        assert_eq!(value["links"], json!({ "self": "/nodes" }));
        assert_eq!(value["jsonapi"]["version"], json!("1.1"));
    }

    #[test]
    fn unknown_relationship_for_ref() {
        let err = marshal_ref(&chain(&["a"]), "prev", &MarshalOptions::new()).unwrap_err();
        assert!(matches!(err, MarshalError::UnknownRelationship { ref name, .. } if name == "prev"));
    }

    #[test]
    fn relationship_document() {
        let opts = MarshalOptions::new().url_links("/api");
        let bytes = marshal_ref(&chain(&["a", "b"]), "next", &opts).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "data": { "type": "steps", "id": "b" },
                "links": {
                    "related": "/api/steps/a/next",
                    "self": "/api/steps/a/relationships/next"
                }
            })
        );
    }

    #[test]
    fn error_documents() {
        let errors = MultiError::new([ErrorObject::new(404, "Not Found", "no such node")]).unwrap();
        let bytes = marshal_errors(&errors, &MarshalOptions::new()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["errors"][0]["status"], json!("404"));
        assert!(value.get("data").is_none());
    }
}
