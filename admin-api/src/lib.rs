//! admin-api library - HTTP/WebSocket surface of the admin backend
//!
//! Create and list endpoints for blogs, courses, testimonials and jobs,
//! course update/delete, health and status probes, and a websocket feed of
//! mutation events.

use admin_common::config::AdminConfig;
use admin_common::store::RecordStore;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod hub;
pub mod pagination;
pub mod pipeline;

use hub::BroadcastHub;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway selected at startup
    pub store: Arc<dyn RecordStore>,
    /// Live websocket subscribers
    pub hub: Arc<BroadcastHub>,
    pub config: Arc<AdminConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AdminConfig) -> Self {
        Self {
            store,
            hub: Arc::new(BroadcastHub::new()),
            config: Arc::new(config),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::record_routes())
        .merge(api::health_routes())
        .merge(api::status_routes())
        .merge(api::ws_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
