//! Sparse fieldsets.

use std::collections::HashMap;

use crate::document::{Document, Resource};
use crate::options::Fieldset;

/// Filter `resource.attributes` down to what `fieldset` allows.
///
/// Idempotent. Relationships are left alone.
pub fn apply_fieldset(resource: &mut Resource, fieldset: &Fieldset) {
    resource.attributes.retain(|name, _| fieldset.allows(name));
}

/// Apply per-type fieldsets to primary and included resources of `document`.
pub fn apply_fieldsets(document: &mut Document, fieldsets: &HashMap<String, Fieldset>) {
    if fieldsets.is_empty() {
        return;
    }
    let primary = document.data.iter_mut().flat_map(|data| data.iter_mut());
    for resource in primary.chain(document.included.iter_mut()) {
        if let Some(fieldset) = fieldsets.get(&resource.kind) {
            apply_fieldset(resource, fieldset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PrimaryData;
    use serde_json::json;

    fn article() -> Resource {
        let mut resource = Resource::new("articles", "1");
        resource.attributes.insert("title".into(), json!("Hello"));
        resource.attributes.insert("body".into(), json!("..."));
        resource.attributes.insert("views".into(), json!(3));
        resource
    }

    #[test]
    fn keeps_only_listed_attributes() {
        let mut resource = article();
        apply_fieldset(&mut resource, &Fieldset::Only(vec!["title".into(), "missing".into()]));
        let names: Vec<&String> = resource.attributes.keys().collect();
        assert_eq!(names, ["title"]);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut resource = article();
        apply_fieldset(&mut resource, &Fieldset::Only(vec![]));
        assert_eq!(resource, article());
    }

    #[test]
    fn exclude_all_drops_everything() {
        let mut resource = article();
        apply_fieldset(&mut resource, &Fieldset::ExcludeAll);
        assert!(resource.attributes.is_empty());
    }

    #[test]
    fn applying_twice_is_the_same_as_once() {
        let fieldset = Fieldset::Only(vec!["body".into(), "views".into()]);
        let mut once = article();
        apply_fieldset(&mut once, &fieldset);
        let mut twice = once.clone();
        apply_fieldset(&mut twice, &fieldset);
        assert_eq!(once, twice);
    }

    #[test]
    fn document_fieldsets_cover_included() {
        let mut user = Resource::new("users", "7");
        user.attributes.insert("name".into(), json!("Ann"));
        user.attributes.insert("email".into(), json!("ann@example.com"));

        let mut doc = Document {
            data: Some(PrimaryData::One(article())),
            included: vec![user],
            ..Default::default()
        };
        let mut fieldsets = HashMap::new();
        fieldsets.insert("articles".to_string(), Fieldset::Only(vec!["title".into()]));
        fieldsets.insert("users".to_string(), Fieldset::Only(vec!["name".into()]));
        apply_fieldsets(&mut doc, &fieldsets);

        let primary = doc.primary().next().unwrap();
        assert_eq!(primary.attributes.len(), 1);
        assert_eq!(doc.included[0].attributes.len(), 1);
        assert!(doc.included[0].attributes.contains_key("name"));
    }
}
