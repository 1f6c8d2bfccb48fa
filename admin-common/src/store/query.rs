//! Query description shared by both backends
//!
//! A [`RecordQuery`] carries exact-match and numeric range filters, an
//! optional free-text search over the kind's two search fields (OR-combined,
//! case-insensitive substring), pagination, and a single sort key.

use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

use super::StoreError;
use crate::model::Kind;

/// Page size when the caller does not ask for one
pub const DEFAULT_LIMIT: u32 = 50;

/// Hard cap on page size
pub const MAX_LIMIT: u32 = 100;

/// One filter condition on a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    Gte { field: String, value: f64 },
    Lte { field: String, value: f64 },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    pub fn gte(field: impl Into<String>, value: f64) -> Self {
        Filter::Gte { field: field.into(), value }
    }

    pub fn lte(field: impl Into<String>, value: f64) -> Self {
        Filter::Lte { field: field.into(), value }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. } | Filter::Gte { field, .. } | Filter::Lte { field, .. } => field,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(StoreError::MalformedRequest(format!(
                "Invalid sort direction: {}",
                other
            ))),
        }
    }
}

/// Single sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            field: "created_at".to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Filtered, paginated, ordered read
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub filters: Vec<Filter>,
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u64,
    pub order: SortOrder,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            order: SortOrder::default(),
        }
    }
}

impl RecordQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact lookup by identifier
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().filter(Filter::eq("id", id.into())).limit(1)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = SortOrder { field: field.into(), direction };
        self
    }

    /// Check fields against the kind's schema and canonicalise values.
    ///
    /// The returned copy has its limit clamped to `1..=MAX_LIMIT`, blank
    /// search dropped, and exact-match values coerced to the column type.
    pub fn prepare(&self, kind: Kind) -> Result<RecordQuery, StoreError> {
        let mut filters = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            let spec = kind.field(filter.field()).ok_or_else(|| {
                StoreError::MalformedRequest(format!(
                    "Unknown filter field for {}: {}",
                    kind,
                    filter.field()
                ))
            })?;
            match filter {
                Filter::Eq { field, value } => {
                    if !spec.is_filterable() {
                        return Err(StoreError::MalformedRequest(format!(
                            "Field {} cannot be used as an exact filter",
                            field
                        )));
                    }
                    let value = spec.ty.coerce(value).ok().flatten().ok_or_else(|| {
                        StoreError::MalformedRequest(format!(
                            "Invalid filter value for {}: {}",
                            field, value
                        ))
                    })?;
                    filters.push(Filter::Eq { field: field.clone(), value });
                }
                Filter::Gte { field, value } | Filter::Lte { field, value } => {
                    if !spec.is_numeric() || !value.is_finite() {
                        return Err(StoreError::MalformedRequest(format!(
                            "Invalid range filter on {}",
                            field
                        )));
                    }
                    filters.push(filter.clone());
                }
            }
        }

        if kind.field(&self.order.field).is_none() {
            return Err(StoreError::MalformedRequest(format!(
                "Unknown sort field for {}: {}",
                kind, self.order.field
            )));
        }

        Ok(RecordQuery {
            filters,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            limit: self.limit.clamp(1, MAX_LIMIT),
            offset: self.offset,
            order: self.order.clone(),
        })
    }
}

/// Escape `LIKE` wildcards so the term matches literally under `ESCAPE '\\'`
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
