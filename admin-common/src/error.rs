//! Common error types for the admin backend
//!
//! Store-level failures have their own taxonomy in [`crate::store::StoreError`];
//! this type covers bootstrap concerns (configuration, files, database setup).

use thiserror::Error;

/// Common result type for admin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across admin crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database bootstrap error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
