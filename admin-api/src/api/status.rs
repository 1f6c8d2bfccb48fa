//! System status endpoint
//!
//! Version and build identification, backend variant and reachability,
//! live subscriber count, and the entity tables this service manages.

use admin_common::{time, Kind};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

const CAPABILITIES: &[&str] = &[
    "blog_create",
    "course_create",
    "course_update",
    "course_delete",
    "testimonial_create",
    "job_create",
    "filtered_listing",
    "realtime_events",
];

/// Build identification captured by build.rs
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
            build_profile: env!("BUILD_PROFILE").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub success: bool,
    pub service: String,
    pub build: BuildInfo,
    pub backend: String,
    pub database: String,
    pub subscribers: usize,
    pub entities: Vec<&'static str>,
    pub capabilities: &'static [&'static str],
    pub timestamp: String,
}

/// GET /api/system/status
pub async fn system_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };

    Json(SystemStatus {
        success: true,
        service: "admin-api".to_string(),
        build: BuildInfo::current(),
        backend: state.store.backend_name().to_string(),
        database: database.to_string(),
        subscribers: state.hub.subscriber_count().await,
        entities: Kind::ALL.iter().map(|k| k.table()).collect(),
        capabilities: CAPABILITIES,
        timestamp: time::now_string(),
    })
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/system/status", get(system_status))
}
