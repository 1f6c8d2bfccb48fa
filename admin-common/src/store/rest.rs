//! REST backend for a managed database exposing a PostgREST-style API
//!
//! Tables live under `<base_url>/rest/v1/<table>`. Filters travel as query
//! parameters (`subject=eq.Physics`, `price=gte.10`), free-text search as a
//! single `or=(...)` of two `ilike` conditions, and writes ask for the
//! affected rows back with `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::error::truncate_detail;
use super::query::escape_like;
use super::{with_timeout, Ack, Filter, RecordQuery, RecordStore, StoreError};
use crate::config::Timeouts;
use crate::model::{Kind, Record};
use crate::{Error, Result};

/// Postgres "insufficient privilege", surfaced by row-level security
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Gateway that talks to the managed store's REST API
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
    timeouts: Timeouts,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeouts: Timeouts) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("REST backend requires an API key".to_string()));
        }
        let client = Client::builder()
            .connect_timeout(timeouts.read())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            timeouts,
        })
    }

    fn endpoint(&self, kind: Kind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn authorize(&self, request: RequestBuilder, limit: Duration) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .timeout(limit)
    }

    async fn send_for_rows(
        &self,
        request: RequestBuilder,
        limit: Duration,
    ) -> std::result::Result<Vec<Record>, StoreError> {
        let response = self
            .authorize(request, limit)
            .send()
            .await
            .map_err(classify_transport)?;
        let response = check_status(response).await?;
        response.json::<Vec<Record>>().await.map_err(classify_transport)
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn insert(&self, kind: Kind, record: Record) -> std::result::Result<Record, StoreError> {
        let limit = self.timeouts.write();
        with_timeout("insert", limit, async move {
            let request = self.client.post(self.endpoint(kind)).json(&record);
            let rows = self.send_for_rows(request, limit).await?;
            debug!("Inserted {} via REST ({} rows returned)", kind, rows.len());
            // Some deployments answer 201 without a body; fall back to what we sent
            Ok(rows.into_iter().next().unwrap_or(record))
        })
        .await
    }

    async fn query(
        &self,
        kind: Kind,
        query: &RecordQuery,
    ) -> std::result::Result<Vec<Record>, StoreError> {
        let query = query.prepare(kind)?;
        let limit = self.timeouts.read();
        with_timeout("query", limit, async {
            let request = self
                .client
                .get(self.endpoint(kind))
                .query(&query_params(kind, &query));
            self.send_for_rows(request, limit).await
        })
        .await
    }

    async fn update(
        &self,
        kind: Kind,
        id: &str,
        patch: Record,
    ) -> std::result::Result<Ack, StoreError> {
        let limit = self.timeouts.write();
        with_timeout("update", limit, async {
            let request = self
                .client
                .patch(self.endpoint(kind))
                .query(&[("id", format!("eq.{}", id))])
                .json(&patch);
            let rows = self.send_for_rows(request, limit).await?;
            acknowledge(kind, id, rows.len())
        })
        .await
    }

    async fn delete(&self, kind: Kind, id: &str) -> std::result::Result<Ack, StoreError> {
        let limit = self.timeouts.write();
        with_timeout("delete", limit, async {
            let request = self
                .client
                .delete(self.endpoint(kind))
                .query(&[("id", format!("eq.{}", id))]);
            let rows = self.send_for_rows(request, limit).await?;
            acknowledge(kind, id, rows.len())
        })
        .await
    }

    async fn ping(&self) -> std::result::Result<(), StoreError> {
        let limit = self.timeouts.read();
        with_timeout("ping", limit, async {
            let request = self
                .client
                .get(self.endpoint(Kind::Course))
                .query(&[("select", "id"), ("limit", "1")]);
            self.send_for_rows(request, limit).await.map(|_| ())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

/// PostgREST answers 200 with an empty array when no row matched.
///
/// Row-level security filters rows the caller may not touch before the
/// write, so a PATCH or DELETE blocked by a policy also comes back as
/// `200 []`. Both cases surface as [`StoreError::NotFound`]; the response
/// carries nothing that tells them apart.
fn acknowledge(kind: Kind, id: &str, affected: usize) -> std::result::Result<Ack, StoreError> {
    if affected == 0 {
        return Err(StoreError::NotFound(format!("{} {}", kind, id)));
    }
    Ok(Ack {
        id: id.to_string(),
        affected: affected as u64,
    })
}

/// Query-string pairs for a prepared query
pub(crate) fn query_params(kind: Kind, query: &RecordQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        let (field, condition) = match filter {
            Filter::Eq { field, value } => (field, format!("eq.{}", literal(value))),
            Filter::Gte { field, value } => (field, format!("gte.{}", value)),
            Filter::Lte { field, value } => (field, format!("lte.{}", value)),
        };
        params.push((field.clone(), condition));
    }
    if let Some(term) = &query.search {
        let quoted = ilike_term(term);
        let conditions: Vec<String> = kind
            .search_fields()
            .iter()
            .map(|field| format!("{}.ilike.\"*{}*\"", field, quoted))
            .collect();
        params.push(("or".to_string(), format!("({})", conditions.join(","))));
    }
    let direction = query.order.direction.as_str();
    params.push((
        "order".to_string(),
        format!("{}.{},id.{}", query.order.field, direction, direction),
    ));
    params.push(("limit".to_string(), query.limit.to_string()));
    params.push(("offset".to_string(), query.offset.to_string()));
    params
}

/// Search term for a quoted PostgREST `ilike` value that matches literally.
///
/// `%` and `_` are escaped for Postgres. PostgREST turns every `*` into `%`
/// and offers no escape for it, so a literal `*` becomes the single-character
/// wildcard `_`. The result is then escaped for the double-quoted value.
fn ilike_term(term: &str) -> String {
    escape_like(term)
        .replace('*', "_")
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn check_status(response: Response) -> std::result::Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

/// Map a non-success HTTP answer onto a failure kind
pub(crate) fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let message = field("message").unwrap_or_else(|| body.to_string());
    let detail = truncate_detail(&format!("HTTP {}: {}", status.as_u16(), message));

    if field("code").as_deref() == Some(INSUFFICIENT_PRIVILEGE) {
        return StoreError::AuthorizationDenied(detail);
    }
    match status.as_u16() {
        401 | 403 => StoreError::AuthorizationDenied(detail),
        404 => StoreError::NotFound(detail),
        400 | 405 | 406 | 409 | 413 | 415 | 422 => StoreError::MalformedRequest(detail),
        408 | 425 | 429 | 502 | 503 | 504 => StoreError::TransientUnavailable(detail),
        _ => StoreError::Unexpected(detail),
    }
}

fn classify_transport(err: reqwest::Error) -> StoreError {
    let detail = truncate_detail(&err.to_string());
    if err.is_timeout() || err.is_connect() || err.is_request() {
        StoreError::TransientUnavailable(detail)
    } else {
        StoreError::Unexpected(detail)
    }
}
