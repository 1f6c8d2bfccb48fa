//! Request validation
//!
//! Pure checks over an incoming field map. Every rule runs and every
//! violation is reported; nothing short-circuits on the first error.

use serde_json::{Map, Value};

use crate::model::{label, FieldSpec, FieldType, Kind};

/// Validate a creation request. Returns an empty vector when valid.
pub fn validate(kind: Kind, fields: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    for spec in kind.fields().iter().filter(|f| !f.is_system()) {
        check_field(spec, fields.get(spec.name), &mut errors);
    }
    errors
}

/// Validate a partial update. Only supplied fields are checked; system and
/// unknown fields are ignored, and a patch touching nothing is rejected.
pub fn validate_patch(kind: Kind, fields: &Map<String, Value>) -> Vec<String> {
    let mut errors = Vec::new();
    let mut touched = 0;
    for (name, value) in fields {
        let Some(spec) = kind.field(name) else {
            continue;
        };
        if spec.is_system() {
            continue;
        }
        touched += 1;
        check_field(spec, Some(value), &mut errors);
    }
    if touched == 0 {
        errors.push("No updatable fields supplied".to_string());
    }
    errors
}

fn check_field(spec: &FieldSpec, raw: Option<&Value>, errors: &mut Vec<String>) {
    let value = match raw.map(|v| spec.ty.coerce(v)) {
        None | Some(Ok(None)) => None,
        Some(Ok(Some(v))) => Some(v),
        Some(Err(expectation)) => {
            errors.push(format!("{} {}", label(spec.name), expectation));
            return;
        }
    };

    let Some(value) = value else {
        if spec.required {
            errors.push(format!("{} is required", label(spec.name)));
        }
        return;
    };

    if let Some(text) = value.as_str() {
        check_text(spec, text, errors);
    }
    if let (Some(range), Some(n)) = (spec.range, value.as_f64()) {
        if n < range.min || n > range.max {
            errors.push(range_message(spec, n < range.min, range.min, range.max));
        }
    }
}

fn check_text(spec: &FieldSpec, text: &str, errors: &mut Vec<String>) {
    if spec.min_len > 0 && text.chars().count() < spec.min_len {
        errors.push(format!(
            "{} must be at least {} characters",
            label(spec.name),
            spec.min_len
        ));
    }
    if !spec.one_of.is_empty() && !spec.one_of.contains(&text) {
        errors.push(format!("Invalid {}: {}", spec.name, text));
    }
    if spec.ty == FieldType::Url && !is_http_url(text) {
        errors.push(format!("{} must be a valid HTTP/HTTPS URL", label(spec.name)));
    }
}

// Zero-floored ranges are sanity bounds; the others are closed scales.
fn range_message(spec: &FieldSpec, below: bool, min: f64, max: f64) -> String {
    let name = label(spec.name);
    if min == 0.0 {
        if below {
            format!("{} cannot be negative", name)
        } else {
            format!("{} seems too high", name)
        }
    } else {
        format!("{} must be between {} and {}", name, min, max)
    }
}

pub fn is_http_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}
