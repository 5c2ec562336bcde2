//! Schema description of a config record: its declared fields, their
//! defaults and the document location it loads from.
//!
//! A [`Schema`] is built exactly once per record type (see
//! [`config_record!`](crate::config_record)) and is immutable afterwards.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::paths::{default_source_path, DEFAULT_SOURCE_FILE};
use crate::types::FieldType;

/// Name of the reserved field holding a record's document location.
pub const SOURCE_PATH_FIELD: &str = "source_path";

#[derive(Debug, Clone)]
pub enum FieldDefault {
    Value(Value),
    /// Evaluated each time a default is needed, so instances never share
    /// a container.
    Factory(fn() -> Value),
}

impl FieldDefault {
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<FieldDefault>,
    automatic: bool,
}

impl FieldDecl {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            automatic: false,
        }
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether the default came from the placeholder table rather than
    /// from the record's author.
    pub fn has_automatic_default(&self) -> bool {
        self.automatic
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::produce)
    }
}

#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDecl>,
    source_path: PathBuf,
    strict: bool,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
            source_path: PathBuf::from(DEFAULT_SOURCE_FILE),
            path_is_absolute: false,
            strict: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|decl| decl.name == name)
    }

    /// Default document location, fixed when the schema was built.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Whether document keys without a declared field are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Default of a field, read from the type without an instance.
    pub fn default_value(&self, name: &str) -> Option<Value> {
        self.field(name).and_then(FieldDecl::default_value)
    }

    /// Every field that has a default, in declaration order.
    pub fn defaults(&self) -> Mapping {
        self.fields
            .iter()
            .filter_map(|decl| Some((Value::from(decl.name), decl.default_value()?)))
            .collect()
    }
}

pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<FieldDecl>,
    source_path: PathBuf,
    path_is_absolute: bool,
    strict: bool,
}

impl SchemaBuilder {
    pub fn field(mut self, decl: FieldDecl) -> Self {
        if decl.name == SOURCE_PATH_FIELD {
            tracing::warn!(
                record = self.name,
                "`{SOURCE_PATH_FIELD}` is reserved for the document location; field ignored"
            );
            return self;
        }
        self.fields.retain(|existing| existing.name != decl.name);
        self.fields.push(decl);
        self
    }

    pub fn source_path(mut self, path: impl AsRef<Path>) -> Self {
        self.source_path = path.as_ref().to_path_buf();
        self
    }

    pub fn path_is_absolute(mut self, path_is_absolute: bool) -> Self {
        self.path_is_absolute = path_is_absolute;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn build(self) -> Schema {
        let mut fields = self.fields;
        apply_automatic_defaults(self.name, &mut fields);
        Schema {
            name: self.name,
            fields,
            source_path: default_source_path(&self.source_path, self.path_is_absolute),
            strict: self.strict,
        }
    }
}

/// Gives every field without a default the placeholder of its type.
///
/// Fields that already carry a default are left alone, so running this
/// again over the same fields changes nothing.
pub fn apply_automatic_defaults(record: &str, fields: &mut [FieldDecl]) {
    for decl in fields.iter_mut().filter(|decl| decl.default.is_none()) {
        if let Some(placeholder) = decl.ty.placeholder() {
            tracing::debug!(record, field = decl.name, ty = %decl.ty, "automatic placeholder");
            decl.default = Some(placeholder);
            decl.automatic = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder("Sample")
            .field(FieldDecl::new("count", FieldType::Int))
            .field(FieldDecl::new("name", FieldType::Str).with_default(FieldDefault::Value(
                Value::from("svc"),
            )))
            .field(FieldDecl::new("tags", FieldType::List(Box::new(FieldType::Str))))
            .field(FieldDecl::new("started", FieldType::DateTime))
            .build()
    }

    #[test]
    fn fills_placeholders_without_overriding_author_defaults() {
        let schema = sample();
        let count = schema.field("count").expect("count");
        assert!(count.has_automatic_default());
        assert_eq!(count.default_value(), Some(Value::from(0)));

        let name = schema.field("name").expect("name");
        assert!(!name.has_automatic_default());
        assert_eq!(name.default_value(), Some(Value::from("svc")));

        assert_eq!(schema.default_value("tags"), Some(Value::Sequence(vec![])));
        assert_eq!(schema.default_value("started"), None);
    }

    #[test]
    fn automatic_defaults_are_idempotent() {
        let mut fields = vec![
            FieldDecl::new("count", FieldType::Int),
            FieldDecl::new("when", FieldType::DateTime),
        ];
        apply_automatic_defaults("Sample", &mut fields);
        apply_automatic_defaults("Sample", &mut fields);
        assert_eq!(fields[0].default_value(), Some(Value::from(0)));
        assert!(fields[0].has_automatic_default());
        assert!(fields[1].default.is_none());
    }

    #[test]
    fn defaults_enumerates_in_declaration_order() {
        let defaults = sample().defaults();
        let keys: Vec<_> = defaults.iter().filter_map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["count", "name", "tags"]);
    }

    #[test]
    fn reserved_source_path_is_not_a_field() {
        let schema = Schema::builder("Reserved")
            .field(FieldDecl::new(SOURCE_PATH_FIELD, FieldType::Str))
            .build();
        assert!(schema.fields().is_empty());
        assert!(schema.source_path().ends_with(DEFAULT_SOURCE_FILE));
        assert!(schema.is_strict());
    }

    #[test]
    fn absolute_source_path_is_kept() {
        let schema = Schema::builder("Absolute")
            .source_path("/etc/app/config.yml")
            .path_is_absolute(true)
            .strict(false)
            .build();
        assert_eq!(schema.source_path(), Path::new("/etc/app/config.yml"));
        assert!(!schema.is_strict());
    }
}
