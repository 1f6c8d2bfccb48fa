//! Mutation pipeline: validate, normalize, persist once, then broadcast
//!
//! Validation and normalisation finish before the store is touched, so a
//! rejected request never writes. The store call is made exactly once.
//! Broadcasting happens only after the store reports success and cannot
//! turn that success into a failure.

use admin_common::events::AdminEvent;
use admin_common::normalize::{normalize_new, normalize_patch};
use admin_common::store::Ack;
use admin_common::validation::{validate, validate_patch};
use admin_common::{Kind, Record};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::ApiError;
use crate::AppState;

/// Validate, normalize and insert a new record of `kind`
pub async fn create(
    state: &AppState,
    kind: Kind,
    fields: &Map<String, Value>,
) -> Result<Record, ApiError> {
    let problems = validate(kind, fields);
    if !problems.is_empty() {
        return Err(ApiError::Validation(problems));
    }

    let record = normalize_new(kind, fields);
    let stored = state.store.insert(kind, record).await?;
    info!(
        "Created {} {} ({})",
        kind,
        stored.id().unwrap_or_default(),
        stored.label(kind).unwrap_or_default()
    );

    publish(state, AdminEvent::created(kind, stored.clone())).await;
    Ok(stored)
}

/// Apply a partial update to a course; returns the ack and the applied change set
pub async fn update_course(
    state: &AppState,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<(Ack, Record), ApiError> {
    require_id(id)?;
    let problems = validate_patch(Kind::Course, fields);
    if !problems.is_empty() {
        return Err(ApiError::Validation(problems));
    }

    let changes = normalize_patch(Kind::Course, fields);
    let ack = state
        .store
        .update(Kind::Course, id, changes.clone())
        .await?;
    info!("Updated course {}", id);

    publish(state, AdminEvent::updated(Kind::Course, id, changes.clone())).await;
    Ok((ack, changes))
}

pub async fn delete_course(state: &AppState, id: &str) -> Result<Ack, ApiError> {
    require_id(id)?;
    let ack = state.store.delete(Kind::Course, id).await?;
    info!("Deleted course {}", id);

    publish(state, AdminEvent::deleted(Kind::Course, id)).await;
    Ok(ack)
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::Validation(vec!["Course ID is required".to_string()]));
    }
    Ok(())
}

async fn publish(state: &AppState, event: AdminEvent) {
    let report = state.hub.broadcast(&event).await;
    debug!(
        "{} delivered to {} subscribers ({} pruned)",
        event.event_type(),
        report.delivered,
        report.pruned
    );
}
