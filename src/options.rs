//! Per-call configuration for the marshal and unmarshal engines.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::{default_codec, Codec};
use crate::document::{ErrorObject, JsonApiObject, Link, Links, Meta};
use crate::links::{LinkResolver, UrlResolver};

/// A sparse fieldset for one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fieldset {
    /// Keep only these attributes. An empty list keeps everything.
    Only(Vec<String>),
    /// Drop every attribute.
    ExcludeAll,
}

impl Fieldset {
    /// Whether attribute `name` survives this fieldset.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Fieldset::Only(names) => names.is_empty() || names.iter().any(|n| n == name),
            Fieldset::ExcludeAll => false,
        }
    }
}

/// Options for [`marshal`](crate::marshal) and friends.
#[derive(Clone)]
pub struct MarshalOptions {
    /// Emit related resources in `included`.
    pub include: bool,
    /// Deepest relationship hop followed for `included`. `None` is unbounded.
    pub max_include_depth: Option<usize>,
    /// Sparse fieldsets keyed by resource type.
    pub fieldsets: HashMap<String, Fieldset>,
    /// Link resolvers keyed by link name, in registration order.
    pub resolvers: Vec<(String, Arc<dyn LinkResolver>)>,
    /// Top-level links.
    pub links: Links,
    /// Top-level meta.
    pub meta: Meta,
    /// Top-level errors.
    pub errors: Vec<ErrorObject>,
    /// Top-level `jsonapi` object.
    pub jsonapi: Option<JsonApiObject>,
    /// Allow primary resources without an id, as in creation requests.
    pub client_mode: bool,
    pub codec: Arc<dyn Codec>,
}

impl MarshalOptions {
    pub fn new() -> Self {
        Self {
            include: false,
            max_include_depth: None,
            fieldsets: HashMap::new(),
            resolvers: Vec::new(),
            links: Links::new(),
            meta: Meta::new(),
            errors: Vec::new(),
            jsonapi: None,
            client_mode: false,
            codec: default_codec(),
        }
    }

    /// Emit related resources in `included`.
    pub fn include(mut self, include: bool) -> Self {
        self.include = include;
        self
    }

    /// Follow at most `depth` relationship hops from the primary data.
    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = Some(depth);
        self
    }

    /// Restrict attributes of resources of type `kind` to `names`.
    pub fn fields<I, S>(mut self, kind: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.fieldsets.insert(kind.into(), Fieldset::Only(names));
        self
    }

    /// Drop all attributes of resources of type `kind`.
    pub fn exclude_fields(mut self, kind: impl Into<String>) -> Self {
        self.fieldsets.insert(kind.into(), Fieldset::ExcludeAll);
        self
    }

    /// Register `resolver` for link `name`. Earlier registrations take precedence.
    pub fn link_resolver(mut self, name: impl Into<String>, resolver: impl LinkResolver + 'static) -> Self {
        let resolver: Arc<dyn LinkResolver> = Arc::new(resolver);
        self.resolvers.push((name.into(), resolver));
        self
    }

    /// Register a [`UrlResolver`] for `self` and `related` links.
    pub fn url_links(self, base: impl Into<String>) -> Self {
        let resolver = UrlResolver::new(base);
        self.link_resolver("self", resolver.clone())
            .link_resolver("related", resolver)
    }

    /// Add a top-level link.
    pub fn link(mut self, name: impl Into<String>, link: Link) -> Self {
        self.links.insert(name.into(), link);
        self
    }

    /// Add a top-level meta entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Add top-level errors.
    pub fn errors(mut self, errors: impl IntoIterator<Item = ErrorObject>) -> Self {
        self.errors.extend(errors);
        self
    }

    /// Emit a top-level `jsonapi` object with `version`.
    pub fn jsonapi_version(mut self, version: impl Into<String>) -> Self {
        self.jsonapi = Some(JsonApiObject {
            version: version.into(),
            meta: Meta::new(),
        });
        self
    }

    pub fn client_mode(mut self, client_mode: bool) -> Self {
        self.client_mode = client_mode;
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub(crate) fn fieldset(&self, kind: &str) -> Option<&Fieldset> {
        self.fieldsets.get(kind)
    }
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarshalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolvers: Vec<&str> = self.resolvers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("MarshalOptions")
            .field("include", &self.include)
            .field("max_include_depth", &self.max_include_depth)
            .field("fieldsets", &self.fieldsets)
            .field("resolvers", &resolvers)
            .field("links", &self.links)
            .field("meta", &self.meta)
            .field("errors", &self.errors)
            .field("jsonapi", &self.jsonapi)
            .field("client_mode", &self.client_mode)
            .finish_non_exhaustive()
    }
}

/// Options for [`unmarshal`](crate::unmarshal) and friends.
#[derive(Clone)]
pub struct UnmarshalOptions {
    /// Reject resources whose `type` differs from the schema's.
    pub strict_types: bool,
    /// Accept input for read-only fields. On by default.
    pub permissive_read_only: bool,
    /// Hydrate related records from `included`.
    pub populate_from_included: bool,
    /// Deepest relationship hop hydrated from `included`. `None` is unbounded.
    ///
    /// Each path to an included resource is hydrated separately, so
    /// documents whose relationships fan in repeatedly should set a bound.
    /// Records past it carry only their identity.
    pub max_hydration_depth: Option<usize>,
    /// Reject documents that repeat a `(type, id)` pair.
    pub check_uniqueness: bool,
    pub codec: Arc<dyn Codec>,
}

impl UnmarshalOptions {
    pub fn new() -> Self {
        Self {
            strict_types: false,
            permissive_read_only: true,
            populate_from_included: false,
            max_hydration_depth: None,
            check_uniqueness: false,
            codec: default_codec(),
        }
    }

    pub fn strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    pub fn permissive_read_only(mut self, permissive: bool) -> Self {
        self.permissive_read_only = permissive;
        self
    }

    pub fn populate_from_included(mut self, populate: bool) -> Self {
        self.populate_from_included = populate;
        self
    }

    /// Hydrate at most `depth` relationship hops from the primary data.
    pub fn max_hydration_depth(mut self, depth: usize) -> Self {
        self.max_hydration_depth = Some(depth);
        self
    }

    pub fn check_uniqueness(mut self, check: bool) -> Self {
        self.check_uniqueness = check;
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }
}

impl Default for UnmarshalOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnmarshalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnmarshalOptions")
            .field("strict_types", &self.strict_types)
            .field("permissive_read_only", &self.permissive_read_only)
            .field("populate_from_included", &self.populate_from_included)
            .field("max_hydration_depth", &self.max_hydration_depth)
            .field("check_uniqueness", &self.check_uniqueness)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = MarshalOptions::new();
        assert!(!opts.include);
        assert_eq!(opts.max_include_depth, None);
        assert!(!opts.client_mode);

        let opts = UnmarshalOptions::new();
        assert!(opts.permissive_read_only);
        assert!(!opts.strict_types);
        assert!(!opts.populate_from_included);
        assert_eq!(opts.max_hydration_depth, None);
    }

    #[test]
    fn empty_fieldset_allows_everything() {
        let opts = MarshalOptions::new().fields("articles", Vec::<String>::new());
        let fieldset = opts.fieldset("articles").unwrap();
        assert!(fieldset.allows("title"));
    }

    #[test]
    fn exclude_all_allows_nothing() {
        let opts = MarshalOptions::new().exclude_fields("articles");
        assert!(!opts.fieldset("articles").unwrap().allows("title"));
        assert!(opts.fieldset("users").is_none());
    }

    #[test]
    fn url_links_registers_self_and_related() {
        let opts = MarshalOptions::new().url_links("/api");
        let names: Vec<&str> = opts.resolvers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["self", "related"]);
    }

    #[test]
    fn debug_lists_resolver_names() {
        let opts = MarshalOptions::new().url_links("/api");
        let debug = format!("{:?}", opts);
        assert!(debug.contains("\"self\""));
    }
}
