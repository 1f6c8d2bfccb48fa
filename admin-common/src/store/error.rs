//! Persistence failure taxonomy
//!
//! Every backend maps its native failures onto these kinds so callers can
//! tell "fix your input" from "try again later" from "contact an operator".

use thiserror::Error;

/// Hint returned to callers when an access policy blocks a write
pub const ACCESS_POLICY_HINT: &str = "Grant the service role insert/update/delete rights on the table, \
or adjust the row-level security policy to allow admin writes";

/// Failure of a single store operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the operation because of its access policy
    #[error("Access policy blocks this operation: {0}")]
    AuthorizationDenied(String),

    /// Mutate/delete target (or read table) is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network, connection or timeout failure; safe to retry
    #[error("Store temporarily unavailable: {0}")]
    TransientUnavailable(String),

    /// Client-supplied data rejected by the store itself
    #[error("Store rejected the request: {0}")]
    MalformedRequest(String),

    /// Anything else
    #[error("Unexpected store failure: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::AuthorizationDenied(_) => "ACCESS_POLICY_DENIED",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::TransientUnavailable(_) => "STORE_UNAVAILABLE",
            StoreError::MalformedRequest(_) => "MALFORMED_REQUEST",
            StoreError::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Remediation path for the caller, when one exists
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            StoreError::AuthorizationDenied(_) => Some(ACCESS_POLICY_HINT),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::TransientUnavailable(_))
    }

    pub(crate) fn timed_out(operation: &str, limit: std::time::Duration) -> Self {
        StoreError::TransientUnavailable(format!(
            "{} timed out after {}s",
            operation,
            limit.as_secs()
        ))
    }
}

/// Keep backend detail short; it accompanies a structured kind, never replaces it
pub(crate) fn truncate_detail(detail: &str) -> String {
    const MAX: usize = 300;
    let detail = detail.trim();
    match detail.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &detail[..idx]),
        None => detail.to_string(),
    }
}
