//! Declared field types and the rules that relate them to YAML values.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde_yaml::{Mapping, Value};

use crate::schema::{FieldDefault, Schema};

/// Declared type of a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Str,
    Path,
    DateTime,
    Any,
    /// The absent marker (YAML `null`). Only meaningful inside a union.
    Absent,
    List(Box<FieldType>),
    Dict(Box<FieldType>, Box<FieldType>),
    Set(Box<FieldType>),
    Union(Vec<FieldType>),
    Record(RecordRef),
}

/// Lazy handle on a nested record's schema.
///
/// Holding the accessor rather than the schema keeps schema construction
/// from recursing into nested record types.
#[derive(Clone, Copy)]
pub struct RecordRef(fn() -> &'static Schema);

impl RecordRef {
    pub fn new(schema: fn() -> &'static Schema) -> Self {
        Self(schema)
    }

    pub fn schema(&self) -> &'static Schema {
        (self.0)()
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.schema().name()).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema(), other.schema())
    }
}

impl FieldType {
    pub fn nullable(inner: FieldType) -> Self {
        FieldType::Union(vec![inner, FieldType::Absent])
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            FieldType::Union(members) => members.contains(&FieldType::Absent),
            _ => false,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record(_))
    }

    /// Unwraps a nullable union to its single concrete member.
    ///
    /// Unions with zero or several non-absent members are returned unchanged.
    pub fn resolve(&self) -> &FieldType {
        let FieldType::Union(members) = self else {
            return self;
        };
        if !self.is_nullable() {
            return self;
        }
        let mut concrete = members.iter().filter(|member| **member != FieldType::Absent);
        match (concrete.next(), concrete.next()) {
            (Some(only), None) => only,
            _ => self,
        }
    }

    /// Placeholder used for fields declared without a default.
    pub fn placeholder(&self) -> Option<FieldDefault> {
        match self {
            FieldType::Int => Some(FieldDefault::Value(Value::from(0))),
            FieldType::Str => Some(FieldDefault::Value(Value::String(String::new()))),
            FieldType::Bool => Some(FieldDefault::Value(Value::Bool(false))),
            FieldType::Float => Some(FieldDefault::Value(Value::from(0.0))),
            FieldType::List(_) | FieldType::Set(_) => {
                Some(FieldDefault::Factory(|| Value::Sequence(Vec::new())))
            }
            FieldType::Dict(_, _) => Some(FieldDefault::Factory(|| Value::Mapping(Mapping::new()))),
            _ => None,
        }
    }

    /// Runtime type check of a single YAML value.
    ///
    /// Container element types are not inspected here.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::Absent, Value::Null) => true,
            (FieldType::Int, Value::Number(n)) => !n.is_f64(),
            (FieldType::Float, Value::Number(n)) => n.is_f64(),
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::Str, Value::String(_)) => true,
            (FieldType::Path, Value::String(_)) => true,
            (FieldType::DateTime, Value::String(s)) => parse_timestamp(s).is_some(),
            (FieldType::List(_) | FieldType::Set(_), Value::Sequence(_)) => true,
            (FieldType::Dict(_, _), Value::Mapping(_)) => true,
            (FieldType::Record(_), Value::Mapping(_)) => true,
            (FieldType::Union(members), value) => members.iter().any(|m| m.accepts(value)),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Str => f.write_str("str"),
            FieldType::Path => f.write_str("path"),
            FieldType::DateTime => f.write_str("datetime"),
            FieldType::Any => f.write_str("any"),
            FieldType::Absent => f.write_str("None"),
            FieldType::List(item) => write!(f, "list[{item}]"),
            FieldType::Dict(key, value) => write!(f, "dict[{key}, {value}]"),
            FieldType::Set(item) => write!(f, "set[{item}]"),
            FieldType::Union(members) => {
                let names: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(" | "))
            }
            FieldType::Record(record) => f.write_str(record.schema().name()),
        }
    }
}

/// Name of a YAML value's runtime type, in the vocabulary of [`FieldType`].
pub fn runtime_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged",
    }
}

/// Parses the timestamp spellings YAML documents use in practice.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|stamp| stamp.naive_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn resolve_leaves_plain_types_alone() {
        assert_eq!(FieldType::Int.resolve(), &FieldType::Int);
        let list = FieldType::List(Box::new(FieldType::Str));
        assert_eq!(list.resolve(), &list);
    }

    #[test]
    fn resolve_unwraps_single_member_nullable() {
        let optional = FieldType::nullable(FieldType::Int);
        assert!(optional.is_nullable());
        assert_eq!(optional.resolve(), &FieldType::Int);
    }

    #[test]
    fn resolve_keeps_ambiguous_unions() {
        let several = FieldType::Union(vec![FieldType::Int, FieldType::Str, FieldType::Absent]);
        assert_eq!(several.resolve(), &several);

        let only_absent = FieldType::Union(vec![FieldType::Absent]);
        assert_eq!(only_absent.resolve(), &only_absent);

        let not_nullable = FieldType::Union(vec![FieldType::Int, FieldType::Str]);
        assert!(!not_nullable.is_nullable());
        assert_eq!(not_nullable.resolve(), &not_nullable);
    }

    #[test]
    fn placeholders_follow_the_default_table() {
        let value_of = |ty: FieldType| ty.placeholder().map(|default| default.produce());
        assert_eq!(value_of(FieldType::Int), Some(Value::from(0)));
        assert_eq!(value_of(FieldType::Str), Some(Value::String(String::new())));
        assert_eq!(value_of(FieldType::Bool), Some(Value::Bool(false)));
        assert_eq!(value_of(FieldType::Float), Some(Value::from(0.0)));
        assert_eq!(
            value_of(FieldType::List(Box::new(FieldType::Int))),
            Some(Value::Sequence(Vec::new()))
        );
        assert_eq!(
            value_of(FieldType::Dict(Box::new(FieldType::Str), Box::new(FieldType::Int))),
            Some(Value::Mapping(Mapping::new()))
        );
        assert_eq!(
            value_of(FieldType::Set(Box::new(FieldType::Str))),
            Some(Value::Sequence(Vec::new()))
        );
        assert_eq!(value_of(FieldType::DateTime), None);
        assert_eq!(value_of(FieldType::nullable(FieldType::Int)), None);
        assert_eq!(value_of(FieldType::Any), None);
    }

    #[test]
    fn accepts_matches_runtime_types() {
        assert!(FieldType::Int.accepts(&Value::from(5)));
        assert!(!FieldType::Int.accepts(&Value::from(5.0)));
        assert!(!FieldType::Int.accepts(&Value::Bool(true)));
        assert!(FieldType::Float.accepts(&Value::from(1.5)));
        assert!(!FieldType::Float.accepts(&Value::from(1)));
        assert!(FieldType::Str.accepts(&Value::from("x")));
        assert!(FieldType::DateTime.accepts(&Value::from("2019-06-25T13:33:30")));
        assert!(!FieldType::DateTime.accepts(&Value::from("yesterday")));
        assert!(FieldType::Set(Box::new(FieldType::Int)).accepts(&Value::Sequence(vec![])));
        let either = FieldType::Union(vec![FieldType::Int, FieldType::Str]);
        assert!(either.accepts(&Value::from("x")));
        assert!(!either.accepts(&Value::Bool(false)));
    }

    #[test]
    fn type_names() {
        assert_eq!(FieldType::nullable(FieldType::Int).to_string(), "int | None");
        assert_eq!(
            FieldType::Dict(Box::new(FieldType::Str), Box::new(FieldType::List(Box::new(FieldType::Int))))
                .to_string(),
            "dict[str, list[int]]"
        );
        assert_eq!(runtime_type_name(&Value::from(3)), "int");
        assert_eq!(runtime_type_name(&Value::from("3")), "str");
        assert_eq!(runtime_type_name(&Value::Null), "None");
    }

    #[test]
    fn timestamps_parse_in_common_spellings() {
        let expected = NaiveDate::from_ymd_opt(2019, 6, 25)
            .and_then(|d| d.and_hms_opt(13, 33, 30))
            .expect("valid date");
        assert_eq!(parse_timestamp("2019-06-25T13:33:30"), Some(expected));
        assert_eq!(parse_timestamp("2019-06-25 13:33:30"), Some(expected));
        assert_eq!(parse_timestamp("2019-06-25T13:33:30+00:00"), Some(expected));
        assert_eq!(parse_timestamp("not a date"), None);
    }
}
