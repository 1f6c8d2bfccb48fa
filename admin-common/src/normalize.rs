//! Record normalisation
//!
//! Turns validated input into a canonical record: identifier stamped,
//! free text trimmed, types coerced, defaults filled, timestamps set.
//! Running [`normalize`] on its own output returns the same record.

use serde_json::{Map, Value};

use crate::model::{FieldType, Kind, Record};
use crate::{time, uuid_utils};

/// Build the canonical record for a request to create a new entity.
///
/// Caller-supplied `id`, `created_at` and `updated_at` are discarded: the
/// identifier is always generated and both timestamps share one fresh value.
pub fn normalize_new(kind: Kind, fields: &Map<String, Value>) -> Record {
    let input: Map<String, Value> = fields
        .iter()
        .filter(|(name, _)| !kind.field(name).is_some_and(|spec| spec.is_system()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    normalize(kind, &input)
}

/// Canonicalise a record.
///
/// Unknown input fields are dropped and every schema field is present in the
/// output. An existing `id`, `created_at` or `updated_at` is preserved, so
/// this is the form to use on records that already carry server stamps.
pub fn normalize(kind: Kind, fields: &Map<String, Value>) -> Record {
    let mut record = Record::new();
    let supplied = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let created_at = supplied("created_at").unwrap_or_else(time::now_string);
    let updated_at = supplied("updated_at").unwrap_or_else(|| created_at.clone());

    for spec in kind.fields() {
        let value = match spec.ty {
            FieldType::Id => Value::String(supplied(spec.name).unwrap_or_else(uuid_utils::generate)),
            FieldType::Timestamp => match spec.name {
                "updated_at" => Value::String(updated_at.clone()),
                _ => Value::String(created_at.clone()),
            },
            _ => fields
                .get(spec.name)
                .and_then(|v| spec.ty.coerce(v).ok().flatten())
                .unwrap_or_else(|| spec.default.to_value()),
        };
        record.insert(spec.name, value);
    }
    record
}

/// Build the change set for a partial update.
///
/// Only supplied schema fields are kept; `id` and `created_at` are never
/// part of a patch, and `updated_at` is refreshed to the current time.
/// A blank optional field clears the stored value.
pub fn normalize_patch(kind: Kind, fields: &Map<String, Value>) -> Record {
    let mut patch = Record::new();
    for (name, raw) in fields {
        let Some(spec) = kind.field(name) else {
            continue;
        };
        if spec.is_system() {
            continue;
        }
        let value = spec.ty.coerce(raw).ok().flatten().unwrap_or(Value::Null);
        patch.insert(spec.name, value);
    }
    patch.insert("updated_at", Value::String(time::now_string()));
    patch
}

/// Split a comma-separated string into trimmed, non-empty tokens
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
