//! Error responses
//!
//! Every failure leaves the API as `{success: false, error, code,
//! timestamp}`, plus `details` for validation failures and `solution` when
//! the store's access policy blocked the write.

use admin_common::store::StoreError;
use admin_common::time;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-fixable field problems, resolved before any store call
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unparseable body or query string
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Store(e) => e.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => match e {
                StoreError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::TransientUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
                StoreError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.to_string(),
            "code": self.code(),
            "timestamp": time::now_string(),
        });
        match self {
            ApiError::Validation(details) => {
                body["details"] = json!(details);
            }
            ApiError::Store(e) => {
                if let Some(solution) = e.remediation() {
                    body["solution"] = json!(solution);
                }
            }
            ApiError::BadRequest(_) => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        } else {
            warn!(code = self.code(), "{}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
