//! # Admin Common Library
//!
//! Shared code for the admin backend including:
//! - Entity kinds and their field schema
//! - Request validation and record normalisation
//! - Persistence gateway (direct SQL or REST-to-managed-store)
//! - Mutation event envelopes
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod model;
pub mod normalize;
pub mod store;
pub mod time;
pub mod uuid_utils;
pub mod validation;

pub use error::{Error, Result};
pub use model::{Kind, Record};
