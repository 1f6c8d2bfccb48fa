//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4 in its hyphenated textual form
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}
