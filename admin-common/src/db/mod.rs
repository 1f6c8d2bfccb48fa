//! SQLite database bootstrap for the direct-SQL backend

pub mod init;

pub use init::*;
