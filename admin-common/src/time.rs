//! Timestamp utilities
//!
//! Records carry timestamps as RFC 3339 text with microsecond precision so the
//! value written to either backend reads back byte-for-byte identical.

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way records store it
pub fn format(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in record format
pub fn now_string() -> String {
    format(now())
}
