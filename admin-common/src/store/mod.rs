//! Persistence gateway
//!
//! One trait, two interchangeable backends: direct SQL ([`SqlStore`]) and
//! the PostgREST-style REST API of a managed database ([`RestStore`]).
//! Each logical operation is a single attempt bounded by a timeout; every
//! failure surfaces as a [`StoreError`] kind rather than a raw driver error.

mod error;
mod query;
mod rest;
mod sql;

pub use error::{StoreError, ACCESS_POLICY_HINT};
pub use query::{Direction, Filter, RecordQuery, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
pub use rest::RestStore;
pub use sql::SqlStore;

use crate::config::{StoreConfig, Timeouts};
use crate::model::{Kind, Record};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Acknowledgement of a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub id: String,
    pub affected: u64,
}

/// Backend-agnostic record persistence
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a normalized record; returns the stored representation
    async fn insert(&self, kind: Kind, record: Record) -> Result<Record, StoreError>;

    /// Filtered, paginated read
    async fn query(&self, kind: Kind, query: &RecordQuery) -> Result<Vec<Record>, StoreError>;

    /// Apply a partial update to the record with `id`
    async fn update(&self, kind: Kind, id: &str, patch: Record) -> Result<Ack, StoreError>;

    /// Delete the record with `id`
    async fn delete(&self, kind: Kind, id: &str) -> Result<Ack, StoreError>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;

    /// Fetch one record by identifier
    async fn get(&self, kind: Kind, id: &str) -> Result<Record, StoreError> {
        self.query(kind, &RecordQuery::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", kind, id)))
    }
}

/// Construct the configured backend
pub async fn build_store(
    config: &StoreConfig,
    timeouts: &Timeouts,
) -> crate::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config {
        StoreConfig::Sql { database_url, max_connections } => {
            Arc::new(SqlStore::connect(database_url, *max_connections, *timeouts).await?)
        }
        StoreConfig::Rest { base_url, api_key } => {
            let key = api_key.as_deref().unwrap_or_default();
            Arc::new(RestStore::new(base_url, key, *timeouts)?)
        }
    };
    tracing::info!("Persistence gateway ready: {}", config.describe());
    Ok(store)
}

/// Bound one store attempt by `limit`
pub(crate) async fn with_timeout<T, F>(
    operation: &str,
    limit: Duration,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} exceeded {:?}", operation, limit);
            Err(StoreError::timed_out(operation, limit))
        }
    }
}
