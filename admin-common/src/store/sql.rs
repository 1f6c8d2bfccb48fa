//! Direct SQL backend (SQLite via sqlx)

use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use super::error::truncate_detail;
use super::query::escape_like;
use super::{with_timeout, Ack, Filter, RecordQuery, RecordStore, StoreError};
use crate::config::Timeouts;
use crate::db::{init_database, SEARCH_COLUMN};
use crate::model::{FieldSpec, FieldType, Kind, Record};
use crate::normalize::split_list;

/// Gateway that talks to the database directly
#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    timeouts: Timeouts,
}

impl SqlStore {
    /// Open the pool and bootstrap the schema
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        timeouts: Timeouts,
    ) -> crate::Result<Self> {
        let pool = init_database(database_url, max_connections, timeouts.read()).await?;
        let store = Self::from_pool(pool, timeouts);
        store.backfill_search_text().await?;
        Ok(store)
    }

    /// Wrap an already initialised pool
    pub fn from_pool(pool: SqlitePool, timeouts: Timeouts) -> Self {
        Self { pool, timeouts }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fill the search column for rows written before it existed
    async fn backfill_search_text(&self) -> crate::Result<()> {
        for kind in Kind::ALL {
            let select = format!("SELECT * FROM {} WHERE {} IS NULL", kind.table(), SEARCH_COLUMN);
            let rows = sqlx::query(&select).fetch_all(&self.pool).await?;
            if rows.is_empty() {
                continue;
            }

            let update = format!("UPDATE {} SET {} = ? WHERE id = ?", kind.table(), SEARCH_COLUMN);
            for row in &rows {
                let id: String = row.try_get("id")?;
                let mut texts = Vec::new();
                for field in kind.search_fields() {
                    texts.push(match row.try_get::<Option<String>, _>(field) {
                        Ok(text) => text,
                        Err(sqlx::Error::ColumnNotFound(_)) => None,
                        Err(e) => return Err(e.into()),
                    });
                }
                let text = fold_search_text(texts.iter().flatten().map(String::as_str));
                sqlx::query(&update)
                    .bind(text)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            info!("Indexed {} {} rows for search", rows.len(), kind.table());
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqlStore {
    async fn insert(&self, kind: Kind, record: Record) -> Result<Record, StoreError> {
        with_timeout("insert", self.timeouts.write(), async {
            let columns: Vec<(&FieldSpec, &Value)> = kind
                .fields()
                .iter()
                .filter_map(|spec| record.get(spec.name).map(|v| (spec, v)))
                .collect();
            if columns.is_empty() {
                return Err(StoreError::MalformedRequest(format!(
                    "Empty {} record",
                    kind
                )));
            }

            let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", kind.table()));
            for (i, (spec, _)) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(spec.name);
            }
            qb.push(", ").push(SEARCH_COLUMN);
            qb.push(") VALUES (");
            for (i, (spec, value)) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(&mut qb, to_sql(spec, value)?);
            }
            qb.push(", ").push_bind(record_search_text(kind, &record));
            qb.push(") RETURNING *");

            let row = qb.build().fetch_one(&self.pool).await.map_err(classify)?;
            let stored = row_to_record(kind, &row)?;
            debug!("Inserted {} {}", kind, stored.id().unwrap_or_default());
            Ok(stored)
        })
        .await
    }

    async fn query(&self, kind: Kind, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        let query = query.prepare(kind)?;
        with_timeout("query", self.timeouts.read(), async {
            let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", kind.table()));
            let mut first = true;

            for filter in &query.filters {
                push_conjunction(&mut qb, &mut first);
                match filter {
                    Filter::Eq { field, value } => {
                        // prepare() guarantees the field exists
                        let spec = kind.field(field).ok_or_else(|| {
                            StoreError::MalformedRequest(format!("Unknown field: {}", field))
                        })?;
                        qb.push(spec.name).push(" = ");
                        push_value(&mut qb, to_sql(spec, value)?);
                    }
                    Filter::Gte { field, value } => {
                        qb.push(field.as_str()).push(" >= ").push_bind(*value);
                    }
                    Filter::Lte { field, value } => {
                        qb.push(field.as_str()).push(" <= ").push_bind(*value);
                    }
                }
            }

            if let Some(term) = &query.search {
                // Both sides are folded with the same Unicode lowercasing
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                push_conjunction(&mut qb, &mut first);
                qb.push(SEARCH_COLUMN)
                    .push(" LIKE ")
                    .push_bind(pattern)
                    .push(" ESCAPE '\\'");
            }

            let direction = query.order.direction.as_sql();
            qb.push(" ORDER BY ")
                .push(query.order.field.as_str())
                .push(" ")
                .push(direction)
                .push(", id ")
                .push(direction);
            qb.push(" LIMIT ")
                .push_bind(i64::from(query.limit))
                .push(" OFFSET ")
                .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));

            let rows = qb.build().fetch_all(&self.pool).await.map_err(classify)?;
            rows.iter().map(|row| row_to_record(kind, row)).collect()
        })
        .await
    }

    async fn update(&self, kind: Kind, id: &str, patch: Record) -> Result<Ack, StoreError> {
        with_timeout("update", self.timeouts.write(), async {
            let columns: Vec<(&FieldSpec, &Value)> = kind
                .fields()
                .iter()
                .filter(|spec| spec.ty != FieldType::Id && spec.name != "created_at")
                .filter_map(|spec| patch.get(spec.name).map(|v| (spec, v)))
                .collect();
            if columns.is_empty() {
                return Err(StoreError::MalformedRequest(
                    "No updatable fields supplied".to_string(),
                ));
            }

            let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", kind.table()));
            for (i, (spec, value)) in columns.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                qb.push(spec.name).push(" = ");
                push_value(&mut qb, to_sql(spec, value)?);
            }
            qb.push(" WHERE id = ")
                .push_bind(id.to_string())
                .push(" RETURNING *");

            // search_text is derived from the whole row
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let Some(row) = qb.build().fetch_optional(&mut *tx).await.map_err(classify)? else {
                return Err(StoreError::NotFound(format!("{} {}", kind, id)));
            };
            let stored = row_to_record(kind, &row)?;
            let refresh = format!("UPDATE {} SET {} = ? WHERE id = ?", kind.table(), SEARCH_COLUMN);
            sqlx::query(&refresh)
                .bind(record_search_text(kind, &stored))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;
            tx.commit().await.map_err(classify)?;

            Ok(Ack {
                id: id.to_string(),
                affected: 1,
            })
        })
        .await
    }

    async fn delete(&self, kind: Kind, id: &str) -> Result<Ack, StoreError> {
        with_timeout("delete", self.timeouts.write(), async {
            let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
            let result = sqlx::query(&sql)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(classify)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("{} {}", kind, id)));
            }
            Ok(Ack {
                id: id.to_string(),
                affected: result.rows_affected(),
            })
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        with_timeout("ping", self.timeouts.read(), async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(classify)?;
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sql"
    }
}

/// Column value after mapping from JSON
#[derive(Debug, PartialEq)]
enum SqlValue {
    Null,
    Text(String),
    Int(i64),
    Real(f64),
}

fn push_conjunction(qb: &mut QueryBuilder<'_, Sqlite>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Null => qb.push("NULL"),
        SqlValue::Text(s) => qb.push_bind(s),
        SqlValue::Int(i) => qb.push_bind(i),
        SqlValue::Real(f) => qb.push_bind(f),
    };
}

fn to_sql(spec: &FieldSpec, value: &Value) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    let mapped = match spec.ty {
        FieldType::Id | FieldType::Text | FieldType::Url | FieldType::Timestamp => {
            value.as_str().map(|s| SqlValue::Text(s.to_string()))
        }
        FieldType::Integer => value.as_i64().map(SqlValue::Int),
        FieldType::Real => value.as_f64().map(SqlValue::Real),
        FieldType::Bool => value.as_bool().map(|b| SqlValue::Int(i64::from(b))),
        FieldType::TextList => value
            .as_array()
            .map(|_| SqlValue::Text(value.to_string())),
    };
    mapped.ok_or_else(|| {
        StoreError::MalformedRequest(format!("Invalid value for {}: {}", spec.name, value))
    })
}

fn row_to_record(kind: Kind, row: &SqliteRow) -> Result<Record, StoreError> {
    let mut record = Record::new();
    for spec in kind.fields() {
        let value = match decode_column(spec, row) {
            Ok(value) => value,
            // Tables created by an older schema may lack newer columns
            Err(sqlx::Error::ColumnNotFound(_)) => Value::Null,
            Err(e) => return Err(classify(e)),
        };
        record.insert(spec.name, value);
    }
    Ok(record)
}

fn decode_column(spec: &FieldSpec, row: &SqliteRow) -> Result<Value, sqlx::Error> {
    let name = spec.name;
    Ok(match spec.ty {
        FieldType::Id | FieldType::Text | FieldType::Url | FieldType::Timestamp => row
            .try_get::<Option<String>, _>(name)?
            .map(Value::String)
            .unwrap_or(Value::Null),
        FieldType::Integer => row
            .try_get::<Option<i64>, _>(name)?
            .map(Value::from)
            .unwrap_or(Value::Null),
        FieldType::Real => row
            .try_get::<Option<f64>, _>(name)?
            .map(Value::from)
            .unwrap_or(Value::Null),
        FieldType::Bool => row
            .try_get::<Option<bool>, _>(name)?
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        FieldType::TextList => match row.try_get::<Option<String>, _>(name)? {
            Some(text) => Value::from(decode_list(&text)),
            None => Value::Null,
        },
    })
}

/// Lists are stored as JSON arrays; tolerate plain comma-separated text
fn decode_list(text: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(text).unwrap_or_else(|_| split_list(text))
}

fn record_search_text(kind: Kind, record: &Record) -> String {
    fold_search_text(kind.search_fields().into_iter().filter_map(|f| record.get_str(f)))
}

/// Lower-cased searchable text, one field per line
fn fold_search_text<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts.map(str::to_lowercase).collect::<Vec<_>>().join("\n")
}

fn classify(err: sqlx::Error) -> StoreError {
    let detail = truncate_detail(&err.to_string());
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound(detail),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::TransientUnavailable(detail),
        sqlx::Error::Database(db) => classify_database(db.as_ref(), detail),
        _ => StoreError::Unexpected(detail),
    }
}

fn classify_database(db: &dyn DatabaseError, detail: String) -> StoreError {
    match db.kind() {
        ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::CheckViolation => return StoreError::MalformedRequest(detail),
        _ => {}
    }

    let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
    if code == "42501" {
        return StoreError::AuthorizationDenied(detail);
    }
    // SQLite extended codes carry the primary code in the low byte
    match code.parse::<i64>().map(|c| c & 0xff) {
        Ok(3) | Ok(8) | Ok(23) => StoreError::AuthorizationDenied(detail),
        Ok(5) | Ok(6) | Ok(10) | Ok(14) => StoreError::TransientUnavailable(detail),
        Ok(19) | Ok(20) | Ok(25) => StoreError::MalformedRequest(detail),
        Ok(1) if db.message().contains("no such table") => StoreError::NotFound(detail),
        _ => StoreError::Unexpected(detail),
    }
}
