//! Pagination utilities for list endpoints
//!
//! Page size defaults to [`DEFAULT_LIMIT`] and is capped at [`MAX_LIMIT`];
//! the store applies the same bounds again.

use admin_common::store::{DEFAULT_LIMIT, MAX_LIMIT};

/// Sanitized limit/offset pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum rows to return, within [1, MAX_LIMIT]
    pub limit: u32,
    /// Rows to skip in the established sort order
    pub offset: u64,
}

/// Clamp caller-supplied paging values into range
///
/// # Examples
/// ```
/// use admin_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(None, None);
/// assert_eq!(p.limit, 50);
/// assert_eq!(p.offset, 0);
///
/// // Oversized pages are capped, negative offsets treated as zero
/// let p = calculate_pagination(Some(5000), Some(-3));
/// assert_eq!(p.limit, 100);
/// assert_eq!(p.offset, 0);
/// ```
pub fn calculate_pagination(limit: Option<i64>, offset: Option<i64>) -> Pagination {
    let limit = match limit {
        Some(n) => n.clamp(1, i64::from(MAX_LIMIT)) as u32,
        None => DEFAULT_LIMIT,
    };
    let offset = offset.unwrap_or(0).max(0) as u64;
    Pagination { limit, offset }
}
