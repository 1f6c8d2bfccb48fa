//! Mutation events fanned out to live subscribers
//!
//! On the wire every event is an envelope `{type, data, timestamp}`; `type`
//! is `<kind>_created`, `<kind>_updated` or `<kind>_deleted`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::{Kind, Record};

/// Event raised after a successful store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum AdminEvent {
    /// A record was inserted; carries the stored record
    Created {
        kind: Kind,
        record: Record,
        timestamp: DateTime<Utc>,
    },

    /// A record was partially updated; carries the applied change set
    Updated {
        kind: Kind,
        id: String,
        changes: Record,
        timestamp: DateTime<Utc>,
    },

    /// A record was deleted
    Deleted {
        kind: Kind,
        id: String,
        timestamp: DateTime<Utc>,
    },
}

/// Serialized form delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: String,
}

impl AdminEvent {
    pub fn created(kind: Kind, record: Record) -> Self {
        AdminEvent::Created {
            kind,
            record,
            timestamp: crate::time::now(),
        }
    }

    pub fn updated(kind: Kind, id: impl Into<String>, changes: Record) -> Self {
        AdminEvent::Updated {
            kind,
            id: id.into(),
            changes,
            timestamp: crate::time::now(),
        }
    }

    pub fn deleted(kind: Kind, id: impl Into<String>) -> Self {
        AdminEvent::Deleted {
            kind,
            id: id.into(),
            timestamp: crate::time::now(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            AdminEvent::Created { kind, .. }
            | AdminEvent::Updated { kind, .. }
            | AdminEvent::Deleted { kind, .. } => *kind,
        }
    }

    /// Envelope `type` string, e.g. `course_created`
    pub fn event_type(&self) -> String {
        let action = match self {
            AdminEvent::Created { .. } => "created",
            AdminEvent::Updated { .. } => "updated",
            AdminEvent::Deleted { .. } => "deleted",
        };
        format!("{}_{}", self.kind(), action)
    }

    pub fn envelope(&self) -> EventEnvelope {
        let (data, timestamp) = match self {
            AdminEvent::Created { record, timestamp, .. } => {
                (Value::from(record.clone()), timestamp)
            }
            AdminEvent::Updated { id, changes, timestamp, .. } => {
                (json!({ "id": id, "changes": changes }), timestamp)
            }
            AdminEvent::Deleted { id, timestamp, .. } => (json!({ "id": id }), timestamp),
        };
        EventEnvelope {
            event_type: self.event_type(),
            data,
            timestamp: crate::time::format(*timestamp),
        }
    }

    /// JSON text sent over the websocket
    pub fn to_json(&self) -> String {
        // EventEnvelope holds only strings and JSON values
        serde_json::to_string(&self.envelope()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_envelope() {
        let mut record = Record::new();
        record.insert("id", json!("c1"));
        record.insert("title", json!("Algebra"));

        let event = AdminEvent::created(Kind::Course, record);
        let envelope = event.envelope();
        assert_eq!(envelope.event_type, "course_created");
        assert_eq!(envelope.data["title"], "Algebra");

        let parsed: Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(parsed["type"], "course_created");
        assert!(parsed["timestamp"].is_string());
    }

    #[test]
    fn test_update_and_delete_envelopes() {
        let mut changes = Record::new();
        changes.insert("price", json!(10.0));

        let updated = AdminEvent::updated(Kind::Course, "c1", changes).envelope();
        assert_eq!(updated.event_type, "course_updated");
        assert_eq!(updated.data, json!({"id": "c1", "changes": {"price": 10.0}}));

        let deleted = AdminEvent::deleted(Kind::Course, "c1").envelope();
        assert_eq!(deleted.event_type, "course_deleted");
        assert_eq!(deleted.data, json!({"id": "c1"}));
    }
}
