//! Link resolution.
//!
//! A [`LinkResolver`] is registered under a link name (`"self"`, `"related"`,
//! ...) and asked for that link on every resource and relationship the
//! marshal engine emits. Resolvers registered for the same name are consulted
//! in registration order and never replace a link that is already present.

use crate::document::{Link, Links};

/// What a link is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkContext<'a> {
    /// A resource object.
    Resource { kind: &'a str, id: &'a str },
    /// A relationship object of a resource.
    Relationship {
        kind: &'a str,
        id: &'a str,
        name: &'a str,
    },
}

impl<'a> LinkContext<'a> {
    pub fn kind(&self) -> &'a str {
        match self {
            LinkContext::Resource { kind, .. } | LinkContext::Relationship { kind, .. } => kind,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            LinkContext::Resource { id, .. } | LinkContext::Relationship { id, .. } => id,
        }
    }
}

/// Produces a named link for a resource or relationship.
pub trait LinkResolver: Send + Sync {
    /// Resolve link `name` for `context`, or `None` if it does not apply.
    fn resolve(&self, name: &str, context: &LinkContext<'_>) -> Option<Link>;
}

impl<F> LinkResolver for F
where
    F: Fn(&str, &LinkContext<'_>) -> Option<Link> + Send + Sync,
{
    fn resolve(&self, name: &str, context: &LinkContext<'_>) -> Option<Link> {
        self(name, context)
    }
}

/// Default patterns for [`UrlResolver`].
pub const RESOURCE_FORMAT: &str = "{base}/{type}/{id}";
pub const RELATIONSHIP_FORMAT: &str = "{base}/{type}/{id}/relationships/{relationship}";
pub const RELATED_FORMAT: &str = "{base}/{type}/{id}/{relationship}";

/// Builds conventional `self` and `related` URLs from a base URL.
///
/// Patterns may use `{base}`, `{type}`, `{id}` and `{relationship}`.
///
/// | Link | Context | Default pattern |
/// |------|---------|-----------------|
/// | `self` | resource | `{base}/{type}/{id}` |
/// | `self` | relationship | `{base}/{type}/{id}/relationships/{relationship}` |
/// | `related` | relationship | `{base}/{type}/{id}/{relationship}` |
///
/// Resources without an id get no links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlResolver {
    pub base: String,
    pub resource_format: String,
    pub relationship_format: String,
    pub related_format: String,
}

impl UrlResolver {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            resource_format: RESOURCE_FORMAT.to_string(),
            relationship_format: RELATIONSHIP_FORMAT.to_string(),
            related_format: RELATED_FORMAT.to_string(),
        }
    }

    pub fn resource_format(mut self, format: impl Into<String>) -> Self {
        self.resource_format = format.into();
        self
    }

    pub fn relationship_format(mut self, format: impl Into<String>) -> Self {
        self.relationship_format = format.into();
        self
    }

    pub fn related_format(mut self, format: impl Into<String>) -> Self {
        self.related_format = format.into();
        self
    }

    fn render(&self, format: &str, kind: &str, id: &str, relationship: &str) -> String {
        format
            .replace("{base}", &self.base)
            .replace("{type}", kind)
            .replace("{id}", id)
            .replace("{relationship}", relationship)
    }
}

impl LinkResolver for UrlResolver {
    fn resolve(&self, name: &str, context: &LinkContext<'_>) -> Option<Link> {
        if context.id().is_empty() {
            return None;
        }
        let href = match (name, context) {
            ("self", LinkContext::Resource { kind, id }) => {
                self.render(&self.resource_format, kind, id, "")
            }
            ("self", LinkContext::Relationship { kind, id, name }) => {
                self.render(&self.relationship_format, kind, id, name)
            }
            ("related", LinkContext::Relationship { kind, id, name }) => {
                self.render(&self.related_format, kind, id, name)
            }
            _ => return None,
        };
        Some(Link::new(href))
    }
}

/// Fill `links` from `resolvers` without replacing existing entries.
pub(crate) fn apply_resolvers<R: AsRef<dyn LinkResolver>>(
    resolvers: &[(String, R)],
    context: &LinkContext<'_>,
    links: &mut Links,
) {
    for (name, resolver) in resolvers {
        if links.contains_key(name) {
            continue;
        }
        if let Some(link) = resolver.as_ref().resolve(name, context) {
            links.insert(name.clone(), link);
        }
    }
}

/// Merge `extra` into `links`, keeping entries already present.
pub(crate) fn merge_links(links: &mut Links, extra: Links) {
    for (name, link) in extra {
        links.entry(name).or_insert(link);
    }
}
