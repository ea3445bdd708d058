//! Core types shared by schemas and both engines.

use serde_json::Value;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true for values that count as "empty" for `omit_empty` fields.
///
/// Mirrors the usual zero-value rules: `null`, `false`, `0`, `""`, `[]` and `{}`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Relationship cardinality as declared by the schema.
///
/// The wire `data` of a relationship does not carry cardinality on its own: an
/// empty or single-element payload is only interpretable against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// `data` is `null` or a single resource identifier.
    ToOne,
    /// `data` is an array of resource identifiers, possibly empty.
    ToMany,
    /// No `data` member at all, only `links` and `meta`.
    LinksOnly,
}

impl Cardinality {
    /// Human readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::ToOne => "to-one",
            Cardinality::ToMany => "to-many",
            Cardinality::LinksOnly => "links-only",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// A member of `attributes`.
    Attribute,
    /// A member of `relationships`.
    Relationship(Cardinality),
}

/// Per-field flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldOptions {
    /// Skip the field entirely on marshal when its value is empty.
    pub omit_empty: bool,
    /// Reject the field on unmarshal unless read-only permissive mode is on.
    pub read_only: bool,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn omit_empty(mut self, omit_empty: bool) -> Self {
        self.omit_empty = omit_empty;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!(false)));
        assert!(is_empty_value(&json!(0)));
        assert!(is_empty_value(&json!(0.0)));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
    }

    #[test]
    fn non_empty_values() {
        assert!(!is_empty_value(&json!(true)));
        assert!(!is_empty_value(&json!(-1)));
        assert!(!is_empty_value(&json!("x")));
        assert!(!is_empty_value(&json!([null])));
        assert!(!is_empty_value(&json!({ "a": null })));
    }

    #[test]
    fn cardinality_display() {
        assert_eq!(Cardinality::ToOne.to_string(), "to-one");
        assert_eq!(Cardinality::ToMany.to_string(), "to-many");
        assert_eq!(Cardinality::LinksOnly.to_string(), "links-only");
    }

    #[test]
    fn field_options_builder() {
        let opts = FieldOptions::new().omit_empty(true);
        assert!(opts.omit_empty);
        assert!(!opts.read_only);
    }
}
