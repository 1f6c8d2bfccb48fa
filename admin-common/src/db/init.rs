//! Database initialization
//!
//! Opens the SQLite pool and creates the four entity tables when absent.
//! Table layout is derived from the field schema in [`crate::model`]; list
//! fields are stored as JSON text and timestamps as RFC 3339 text.
//! Every table also carries [`SEARCH_COLUMN`]; an existing table only ever
//! gains that column when it is missing.

use crate::model::{FieldSpec, FieldType, Kind};
use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info};

/// Lower-cased copy of a row's searchable text, maintained by the store
pub const SEARCH_COLUMN: &str = "search_text";

/// Open a pool and ensure entity tables exist
pub async fn init_database(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<SqlitePool> {
    // An in-memory database lives and dies with its single connection
    let in_memory = database_url.contains(":memory:");
    let mut options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
    options = if in_memory {
        options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options.max_connections(max_connections)
    };

    let pool = options.connect(database_url).await?;
    info!("Opened database: {}", database_url);

    if !in_memory {
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    }
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_entity_tables(&pool).await?;
    info!("Entity tables ready: {}", list_entity_tables(&pool).await?.join(", "));
    Ok(pool)
}

/// `CREATE TABLE IF NOT EXISTS` for every kind
pub async fn create_entity_tables(pool: &SqlitePool) -> Result<()> {
    for kind in Kind::ALL {
        let ddl = table_ddl(kind);
        debug!("Ensuring table {}", kind.table());
        sqlx::query(&ddl).execute(pool).await?;
        ensure_search_column(pool, kind).await?;
    }
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_subject ON courses(subject)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Entity tables currently present in the database
pub async fn list_entity_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    let wanted: Vec<&str> = Kind::ALL.iter().map(|k| k.table()).collect();
    Ok(names.into_iter().filter(|n| wanted.contains(&n.as_str())).collect())
}

async fn ensure_search_column(pool: &SqlitePool, kind: Kind) -> Result<()> {
    let lookup = format!(
        "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = ?",
        kind.table()
    );
    let present: i64 = sqlx::query_scalar(&lookup)
        .bind(SEARCH_COLUMN)
        .fetch_one(pool)
        .await?;
    if present == 0 {
        info!("Adding {} column to {}", SEARCH_COLUMN, kind.table());
        let alter = format!("ALTER TABLE {} ADD COLUMN {} TEXT", kind.table(), SEARCH_COLUMN);
        sqlx::query(&alter).execute(pool).await?;
    }
    Ok(())
}

/// DDL for one kind's table
pub fn table_ddl(kind: Kind) -> String {
    let mut columns: Vec<String> = kind.fields().iter().map(column_ddl).collect();
    columns.push(format!("{} TEXT", SEARCH_COLUMN));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        kind.table(),
        columns.join(",\n    ")
    )
}

fn column_ddl(spec: &FieldSpec) -> String {
    let sql_type = match spec.ty {
        FieldType::Id => return format!("{} TEXT PRIMARY KEY", spec.name),
        FieldType::Integer | FieldType::Bool => "INTEGER",
        FieldType::Real => "REAL",
        FieldType::Text | FieldType::Url | FieldType::TextList | FieldType::Timestamp => "TEXT",
    };
    if spec.required || spec.ty == FieldType::Timestamp {
        format!("{} {} NOT NULL", spec.name, sql_type)
    } else {
        format!("{} {}", spec.name, sql_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_ddl() {
        let ddl = table_ddl(Kind::Course);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS courses ("));
        assert!(ddl.contains("id TEXT PRIMARY KEY"));
        assert!(ddl.contains("title TEXT NOT NULL"));
        assert!(ddl.contains("price REAL"));
        assert!(ddl.contains("is_published INTEGER"));
        assert!(ddl.contains("created_at TEXT NOT NULL"));
        assert!(ddl.contains("search_text TEXT"));
    }

    #[tokio::test]
    async fn test_legacy_table_gains_search_column() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE jobs (id TEXT PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        create_entity_tables(&pool).await.unwrap();
        let present: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('jobs') WHERE name = 'search_text'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(present, 1);
    }

    #[tokio::test]
    async fn test_init_in_memory_creates_all_tables() {
        let pool = init_database("sqlite::memory:", 5, Duration::from_secs(5))
            .await
            .unwrap();
        let tables = list_entity_tables(&pool).await.unwrap();
        assert_eq!(tables, vec!["blog_posts", "courses", "jobs", "testimonials"]);

        // Idempotent
        create_entity_tables(&pool).await.unwrap();
    }
}
