//! HTTP API handlers

pub mod error;
pub mod health;
pub mod records;
pub mod status;
pub mod ws;

pub use error::ApiError;
pub use health::health_routes;
pub use records::record_routes;
pub use status::status_routes;
pub use ws::ws_routes;
