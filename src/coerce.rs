//! Attribute type coercion.
//!
//! A wire value is first decoded straight into the field type. When that
//! fails, a small set of scalar reinterpretations is tried in order:
//!
//! | Wire value | Candidates |
//! |------------|------------|
//! | numeric string | integer, float, float truncated to integer |
//! | `"true"`, `"t"`, `"1"` (and false forms, any case) | boolean |
//! | float | float truncated to integer, string |
//! | integer | string |
//! | boolean | string |
//!
//! Booleans never become numbers and numbers never become booleans.
//! Structs, maps and sequences only go through the direct decode, which is
//! a generic re-encode into the field's concrete type.

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use crate::error::UnmarshalError;
use crate::types::json_type_name;

/// Convert `value` into `T`, reinterpreting scalars when needed.
///
/// # Errors
///
/// Returns `UnmarshalError::Coercion` naming `field` if no interpretation fits.
pub fn coerce<T: DeserializeOwned>(field: &str, value: Value) -> Result<T, UnmarshalError> {
    let actual = json_type_name(&value);
    let candidates = candidates(&value);

    if let Ok(direct) = serde_json::from_value(value) {
        return Ok(direct);
    }

    candidates
        .into_iter()
        .find_map(|candidate| serde_json::from_value(candidate).ok())
        .ok_or_else(|| UnmarshalError::Coercion {
            name: field.to_string(),
            expected: short_type_name::<T>(),
            actual,
        })
}

/// Parse the usual spellings of a boolean, ignoring case.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn candidates(value: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                out.push(Value::from(i));
            } else if let Ok(u) = s.parse::<u64>() {
                out.push(Value::from(u));
            }
            if let Ok(f) = s.parse::<f64>() {
                if let Some(n) = Number::from_f64(f) {
                    out.push(Value::Number(n));
                }
                if let Some(t) = truncate(f) {
                    out.push(t);
                }
            }
            if let Some(b) = parse_bool(s) {
                out.push(Value::Bool(b));
            }
        }
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(t) = n.as_f64().and_then(truncate) {
                    out.push(t);
                }
            }
            out.push(Value::String(n.to_string()));
        }
        Value::Bool(b) => out.push(Value::String(b.to_string())),
        _ => {}
    }
    out
}

fn truncate(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(Value::from(t as i64))
    } else {
        None
    }
}

/// `alloc::string::String` -> `String`, `core::option::Option<i64>` -> `Option<i64>`.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    match full.find('<') {
        Some(generic) => {
            let head = &full[..generic];
            let start = head.rfind("::").map(|i| i + 2).unwrap_or(0);
            &full[start..]
        }
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn direct_match_is_assigned() {
        let v: i64 = coerce("n", json!(42)).unwrap();
        assert_eq!(v, 42);
        let s: String = coerce("s", json!("hi")).unwrap();
        assert_eq!(s, "hi");
        let b: bool = coerce("b", json!(true)).unwrap();
        assert!(b);
    }

    #[test]
    fn numeric_string_into_int() {
        let v: i32 = coerce("n", json!("42")).unwrap();
        assert_eq!(v, 42);
        let v: u64 = coerce("n", json!(" 7 ")).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn numeric_string_into_float() {
        let v: f64 = coerce("n", json!("2.5")).unwrap();
        assert_eq!(v, 2.5);
    }

    #[test]
    fn float_truncates_into_int() {
        let v: i64 = coerce("n", json!(3.9)).unwrap();
        assert_eq!(v, 3);
        let v: i64 = coerce("n", json!("-3.9")).unwrap();
        assert_eq!(v, -3);
    }

    #[test]
    fn float_past_i64_range_does_not_saturate() {
        // i64::MAX as f64 is 2^63
        assert!(coerce::<i64>("n", json!(9_223_372_036_854_775_808.0)).is_err());
        let v: i64 = coerce("n", json!(4_611_686_018_427_387_904.0)).unwrap();
        assert_eq!(v, 4_611_686_018_427_387_904);
    }

    #[test]
    fn bool_strings_any_case() {
        for s in ["true", "TRUE", "t", "T", "1", "True"] {
            let b: bool = coerce("b", json!(s)).unwrap();
            assert!(b, "{s}");
        }
        for s in ["false", "F", "0"] {
            let b: bool = coerce("b", json!(s)).unwrap();
            assert!(!b, "{s}");
        }
    }

    #[test]
    fn scalars_into_string() {
        let s: String = coerce("s", json!(42)).unwrap();
        assert_eq!(s, "42");
        let s: String = coerce("s", json!(true)).unwrap();
        assert_eq!(s, "true");
    }

    #[test]
    fn non_numeric_string_into_int_fails() {
        let err = coerce::<i64>("count", json!("not a number")).unwrap_err();
        assert!(matches!(
            err,
            UnmarshalError::Coercion { ref name, expected: "i64", actual: "string" } if name == "count"
        ));
    }

    #[test]
    fn bool_into_number_fails() {
        assert!(coerce::<i64>("n", json!(true)).is_err());
        assert!(coerce::<f64>("n", json!(false)).is_err());
    }

    #[test]
    fn number_into_bool_fails() {
        assert!(coerce::<bool>("b", json!(1)).is_err());
    }

    #[test]
    fn option_accepts_null_and_coerces_inner() {
        let v: Option<i64> = coerce("n", json!(null)).unwrap();
        assert_eq!(v, None);
        let v: Option<i64> = coerce("n", json!("5")).unwrap();
        assert_eq!(v, Some(5));
    }

    #[test]
    fn structs_round_trip_generically() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Address {
            city: String,
            zip: String,
        }

        let v: Address = coerce("address", json!({ "city": "Oslo", "zip": "0150" })).unwrap();
        assert_eq!(
            v,
            Address {
                city: "Oslo".into(),
                zip: "0150".into()
            }
        );

        let err = coerce::<Address>("address", json!("Oslo")).unwrap_err();
        assert!(matches!(err, UnmarshalError::Coercion { expected: "Address", .. }));
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Option<i64>>(), "Option<i64>");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec<alloc::string::String>");
    }
}
