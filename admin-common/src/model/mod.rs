//! Entity model: kinds, their field schema, and the canonical record type

mod kind;
mod record;
mod schema;

pub use kind::{Kind, UnknownKind};
pub use record::Record;
pub use schema::{label, FieldDefault, FieldSpec, FieldType, Range};
