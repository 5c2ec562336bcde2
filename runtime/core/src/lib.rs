//! Typed configuration records loaded from YAML documents.
//!
//! A record is declared once with [`config_record!`]; that builds its
//! [`Schema`] (declared fields, defaults, placeholders, source path) and
//! guarded accessors. [`Record::create`] gives an unloaded instance whose
//! fields cannot be read yet; [`Record::load`] reads the document, checks
//! every field's type, deserializes nested records and publishes the result
//! in one step.

pub mod access;
pub mod error;
pub mod loader;
pub mod paths;
pub mod record;
pub mod schema;
pub mod types;
pub mod validation;
pub mod value;

pub use access::{Access, RecordState};
pub use error::ConfigError;
pub use loader::{load, load_from_str, parse_document};
pub use paths::{resolve_path, DEFAULT_SOURCE_FILE};
pub use record::{deserialize, Record};
pub use schema::{FieldDecl, FieldDefault, Schema, SchemaBuilder, SOURCE_PATH_FIELD};
pub use serde_yaml::{Mapping, Value};
pub use types::{FieldType, RecordRef};
pub use validation::{validate, validate_all, ValidationFinding};
pub use value::{DeserializeContext, FieldValue};
