//! Field schema shared by the validator, normalizer and both store backends
//!
//! Every entity kind is described by a static slice of [`FieldSpec`]. Nothing
//! outside this table decides which columns exist, which are required, or
//! what their defaults are.

use serde_json::{Number, Value};

/// Storage/wire type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Generated record identifier (UUID text)
    Id,
    /// Free text, trimmed
    Text,
    /// Free text that must start with `http://` or `https://`
    Url,
    /// Whole number
    Integer,
    /// Floating point number
    Real,
    /// Boolean flag
    Bool,
    /// Ordered sequence of strings
    TextList,
    /// RFC 3339 timestamp, stamped by the normalizer
    Timestamp,
}

/// Declared default for an optional field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    None,
    Text(&'static str),
    Integer(i64),
    Real(f64),
    Bool(bool),
    List(&'static [&'static str]),
}

impl FieldDefault {
    /// JSON value of the default (null when there is none)
    pub fn to_value(&self) -> Value {
        match *self {
            FieldDefault::None => Value::Null,
            FieldDefault::Text(s) => Value::String(s.to_string()),
            FieldDefault::Integer(n) => Value::from(n),
            FieldDefault::Real(n) => real(n),
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::List(items) => Value::Array(
                items.iter().map(|s| Value::String(s.to_string())).collect(),
            ),
        }
    }
}

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// One column of an entity
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: FieldDefault,
    /// Minimum length in characters after trimming (0 = no minimum)
    pub min_len: usize,
    /// Closed set of accepted values (empty = any)
    pub one_of: &'static [&'static str],
    pub range: Option<Range>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: FieldDefault::None,
            min_len: 0,
            one_of: &[],
            range: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub const fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.one_of = values;
        self
    }

    pub const fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(Range { min, max });
        self
    }

    /// Fields the normalizer owns; callers never set these through validation
    pub fn is_system(&self) -> bool {
        matches!(self.ty, FieldType::Id | FieldType::Timestamp)
    }

    /// Whether the field can be used as an exact-match filter
    pub fn is_filterable(&self) -> bool {
        !matches!(self.ty, FieldType::TextList)
    }

    /// Whether the field can be used in a numeric range filter
    pub fn is_numeric(&self) -> bool {
        matches!(self.ty, FieldType::Integer | FieldType::Real)
    }
}

impl FieldType {
    /// Coerce a caller-supplied JSON value into canonical form.
    ///
    /// `Ok(None)` means "effectively absent" (blank text, empty list string).
    /// `Err` carries the expectation used in the validation message.
    pub fn coerce(&self, value: &Value) -> Result<Option<Value>, &'static str> {
        if value.is_null() {
            return Ok(None);
        }
        match self {
            FieldType::Id | FieldType::Text | FieldType::Url | FieldType::Timestamp => {
                let s = value.as_str().ok_or("must be a string")?;
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::String(trimmed.to_string())))
                }
            }
            FieldType::Integer => {
                let n = match value {
                    Value::Number(n) => n
                        .as_i64()
                        .or_else(|| n.as_f64().and_then(whole_f64_to_i64)),
                    Value::String(s) if s.trim().is_empty() => return Ok(None),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                n.map(|n| Some(Value::from(n))).ok_or("must be an integer")
            }
            FieldType::Real => {
                let n = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) if s.trim().is_empty() => return Ok(None),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match n {
                    Some(n) if n.is_finite() => Ok(Some(real(n))),
                    _ => Err("must be a number"),
                }
            }
            FieldType::Bool => match value {
                Value::Bool(b) => Ok(Some(Value::Bool(*b))),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Some(Value::Bool(true))),
                    "false" => Ok(Some(Value::Bool(false))),
                    _ => Err("must be true or false"),
                },
                _ => Err("must be true or false"),
            },
            FieldType::TextList => match value {
                Value::String(s) => Ok(Some(string_list(crate::normalize::split_list(s)))),
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        let s = item.as_str().ok_or("must be a list of strings")?;
                        let trimmed = s.trim();
                        if !trimmed.is_empty() {
                            out.push(trimmed.to_string());
                        }
                    }
                    Ok(Some(string_list(out)))
                }
                _ => Err("must be a list of strings"),
            },
        }
    }
}

/// Human-facing label for a field name: `client_name` -> `Client name`
pub fn label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn real(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn string_list(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

/// Whole floats inside the i64 range; `as` would saturate the rest
fn whole_f64_to_i64(f: f64) -> Option<i64> {
    // 2^63 is exact as f64; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_is_trimmed_and_blank_is_absent() {
        assert_eq!(FieldType::Text.coerce(&json!("  hi ")), Ok(Some(json!("hi"))));
        assert_eq!(FieldType::Text.coerce(&json!("   ")), Ok(None));
        assert_eq!(FieldType::Text.coerce(&json!(5)), Err("must be a string"));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        assert_eq!(FieldType::Integer.coerce(&json!("12")), Ok(Some(json!(12))));
        assert_eq!(FieldType::Integer.coerce(&json!(4.0)), Ok(Some(json!(4))));
        assert_eq!(FieldType::Integer.coerce(&json!(4.5)), Err("must be an integer"));
        assert_eq!(FieldType::Integer.coerce(&json!(1e20)), Err("must be an integer"));
        assert_eq!(FieldType::Integer.coerce(&json!(-1e20)), Err("must be an integer"));
        assert_eq!(
            FieldType::Integer.coerce(&json!(18_446_744_073_709_551_615u64)),
            Err("must be an integer")
        );
        assert_eq!(FieldType::Integer.coerce(&json!(-4.0)), Ok(Some(json!(-4))));
        assert_eq!(FieldType::Real.coerce(&json!("19.5")), Ok(Some(json!(19.5))));
        assert_eq!(FieldType::Real.coerce(&json!(3)), Ok(Some(json!(3.0))));
        assert_eq!(FieldType::Real.coerce(&json!("abc")), Err("must be a number"));
    }

    #[test]
    fn test_bool_accepts_literal_strings() {
        assert_eq!(FieldType::Bool.coerce(&json!("TRUE")), Ok(Some(json!(true))));
        assert_eq!(FieldType::Bool.coerce(&json!(false)), Ok(Some(json!(false))));
        assert_eq!(FieldType::Bool.coerce(&json!("yes")), Err("must be true or false"));
    }

    #[test]
    fn test_list_from_array_drops_blank_items() {
        assert_eq!(
            FieldType::TextList.coerce(&json!([" a ", "", "b"])),
            Ok(Some(json!(["a", "b"])))
        );
        assert_eq!(
            FieldType::TextList.coerce(&json!([1, 2])),
            Err("must be a list of strings")
        );
    }

    #[test]
    fn test_coerce_is_stable_on_canonical_values() {
        for (ty, v) in [
            (FieldType::Real, json!(0.0)),
            (FieldType::Integer, json!(5)),
            (FieldType::TextList, json!(["x", "y"])),
            (FieldType::Bool, json!(true)),
        ] {
            assert_eq!(ty.coerce(&v), Ok(Some(v.clone())));
        }
    }

    #[test]
    fn test_defaults_to_value() {
        assert_eq!(FieldDefault::List(&["homepage"]).to_value(), json!(["homepage"]));
        assert_eq!(FieldDefault::Real(0.0).to_value(), json!(0.0));
        assert_eq!(FieldDefault::None.to_value(), Value::Null);
    }

    #[test]
    fn test_label() {
        assert_eq!(label("client_name"), "Client name");
        assert_eq!(label("title"), "Title");
    }
}
