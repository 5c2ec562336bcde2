use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::schema::{Schema, SOURCE_PATH_FIELD};
use crate::types::{runtime_type_name, FieldType};
use crate::value::DeserializeContext;

/// One document value whose runtime type does not match its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationFinding {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Field '{}' expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

pub fn validate(field: &str, value: &Value, declared: &FieldType) -> Option<ValidationFinding> {
    let expected = declared.resolve();

    // Nested records are checked by their own load.
    if expected.is_record() {
        return None;
    }

    if value.is_null() || expected.accepts(value) {
        return None;
    }

    Some(ValidationFinding::new(
        field,
        expected.to_string(),
        runtime_type_name(value),
    ))
}

/// Checks every document key that has a declared field in `schema`.
///
/// Keys without a declared field are left to the deserializer.
pub fn validate_all(
    document: &Mapping,
    schema: &Schema,
    ctx: &DeserializeContext,
) -> Vec<ValidationFinding> {
    if schema.fields().is_empty() {
        return Vec::new();
    }

    document
        .iter()
        .filter_map(|(key, value)| {
            let name = key.as_str()?;
            if name == SOURCE_PATH_FIELD {
                return None;
            }
            let decl = schema.field(name)?;
            validate(&ctx.qualify(name), value, &decl.ty)
        })
        .collect()
}
