//! Conversion between YAML values and typed field values.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde_yaml::{Mapping, Number, Value};

use crate::error::ConfigError;
use crate::types::{parse_timestamp, runtime_type_name, FieldType};

/// Where a deserialization currently is: the record being built and the
/// field path leading to the value at hand.
///
/// Its presence is what lets the access guard hand out placeholders of an
/// unloaded record.
#[derive(Debug, Clone)]
pub struct DeserializeContext {
    record: &'static str,
    path: Vec<String>,
}

impl DeserializeContext {
    pub fn new(record: &'static str) -> Self {
        Self {
            record,
            path: Vec::new(),
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Context for a field of the current record.
    pub fn child(&self, field: &str) -> Self {
        let mut path = self.path.clone();
        path.push(field.to_string());
        Self {
            record: self.record,
            path,
        }
    }

    /// Context for an element of the sequence at the current path.
    pub fn index(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        match path.last_mut() {
            Some(last) => last.push_str(&format!("[{index}]")),
            None => path.push(format!("[{index}]")),
        }
        Self {
            record: self.record,
            path,
        }
    }

    /// Context for a nested record stored at the current path.
    pub fn nested(&self, record: &'static str) -> Self {
        Self {
            record,
            path: self.path.clone(),
        }
    }

    /// Dotted path of the current position.
    pub fn qualified(&self) -> String {
        self.path.join(".")
    }

    /// Dotted path of `field` below the current position.
    pub fn qualify(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.qualified())
        }
    }

    pub fn invalid(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            record: self.record,
            field: self.qualified(),
            message: message.into(),
        }
    }

    pub fn mismatch(&self, expected: &FieldType, found: &Value) -> ConfigError {
        self.invalid(format!("expected {expected}, got {}", runtime_type_name(found)))
    }
}

/// A Rust type that can be stored in a config record field.
pub trait FieldValue: Sized + Clone + fmt::Debug {
    fn field_type() -> FieldType;

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError>;

    fn encode(&self) -> Value;

    /// Encoding of a declared default, which may hold records that were
    /// never loaded.
    #[doc(hidden)]
    fn encode_default(&self) -> Value {
        self.encode()
    }
}

macro_rules! integer_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::Int
                }

                fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
                    let number = match value {
                        Value::Number(number) if !number.is_f64() => number,
                        other => return Err(ctx.mismatch(&FieldType::Int, other)),
                    };
                    let converted = match number.as_i64() {
                        Some(signed) => <$ty>::try_from(signed).ok(),
                        None => number.as_u64().and_then(|unsigned| <$ty>::try_from(unsigned).ok()),
                    };
                    converted.ok_or_else(|| {
                        ctx.invalid(format!("{number} is out of range for {}", stringify!($ty)))
                    })
                }

                fn encode(&self) -> Value {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FieldValue for f64 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::Number(number) if number.is_f64() => number
                .as_f64()
                .ok_or_else(|| ctx.mismatch(&FieldType::Float, value)),
            other => Err(ctx.mismatch(&FieldType::Float, other)),
        }
    }

    fn encode(&self) -> Value {
        Value::Number(Number::from(*self))
    }
}

impl FieldValue for f32 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        let wide = f64::decode(value, ctx)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ctx.invalid(format!("{wide} is out of range for f32")));
        }
        Ok(wide as f32)
    }

    fn encode(&self) -> Value {
        Value::Number(Number::from(f64::from(*self)))
    }
}

impl FieldValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            other => Err(ctx.mismatch(&FieldType::Bool, other)),
        }
    }

    fn encode(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FieldValue for String {
    fn field_type() -> FieldType {
        FieldType::Str
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            other => Err(ctx.mismatch(&FieldType::Str, other)),
        }
    }

    fn encode(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for PathBuf {
    fn field_type() -> FieldType {
        FieldType::Path
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::String(text) => Ok(PathBuf::from(text)),
            other => Err(ctx.mismatch(&FieldType::Path, other)),
        }
    }

    fn encode(&self) -> Value {
        Value::String(self.to_string_lossy().into_owned())
    }
}

impl FieldValue for NaiveDateTime {
    fn field_type() -> FieldType {
        FieldType::DateTime
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::String(text) => parse_timestamp(text)
                .ok_or_else(|| ctx.invalid(format!("`{text}` is not an ISO-8601 timestamp"))),
            other => Err(ctx.mismatch(&FieldType::DateTime, other)),
        }
    }

    fn encode(&self) -> Value {
        Value::String(self.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }
}

impl FieldValue for Value {
    fn field_type() -> FieldType {
        FieldType::Any
    }

    fn decode(value: &Value, _ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        Ok(value.clone())
    }

    fn encode(&self) -> Value {
        self.clone()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn field_type() -> FieldType {
        FieldType::nullable(T::field_type())
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other, ctx).map(Some),
        }
    }

    fn encode(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::encode)
    }

    fn encode_default(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::encode_default)
    }
}

fn decode_sequence<T: FieldValue>(
    value: &Value,
    expected: FieldType,
    ctx: &DeserializeContext,
) -> Result<Vec<T>, ConfigError> {
    let Value::Sequence(items) = value else {
        return Err(ctx.mismatch(&expected, value));
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| T::decode(item, &ctx.index(index)))
        .collect()
}

fn decode_entries<V: FieldValue>(
    value: &Value,
    expected: FieldType,
    ctx: &DeserializeContext,
) -> Result<Vec<(String, V)>, ConfigError> {
    let Value::Mapping(entries) = value else {
        return Err(ctx.mismatch(&expected, value));
    };
    entries
        .iter()
        .map(|(key, item)| {
            let key = key.as_str().ok_or_else(|| {
                ctx.invalid(format!("mapping keys must be str, got {}", runtime_type_name(key)))
            })?;
            Ok((key.to_string(), V::decode(item, &ctx.child(key))?))
        })
        .collect()
}

fn encode_entries<'a, V: FieldValue + 'a>(
    entries: impl Iterator<Item = (&'a String, &'a V)>,
    encode: fn(&V) -> Value,
) -> Value {
    Value::Mapping(
        entries
            .map(|(key, item)| (Value::String(key.clone()), encode(item)))
            .collect::<Mapping>(),
    )
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::List(Box::new(T::field_type()))
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        decode_sequence(value, Self::field_type(), ctx)
    }

    fn encode(&self) -> Value {
        Value::Sequence(self.iter().map(FieldValue::encode).collect())
    }

    fn encode_default(&self) -> Value {
        Value::Sequence(self.iter().map(FieldValue::encode_default).collect())
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    fn field_type() -> FieldType {
        FieldType::Set(Box::new(T::field_type()))
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        decode_sequence(value, Self::field_type(), ctx).map(|items| items.into_iter().collect())
    }

    fn encode(&self) -> Value {
        Value::Sequence(self.iter().map(FieldValue::encode).collect())
    }
}

impl<T: FieldValue + Eq + Hash> FieldValue for HashSet<T> {
    fn field_type() -> FieldType {
        FieldType::Set(Box::new(T::field_type()))
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        decode_sequence(value, Self::field_type(), ctx).map(|items| items.into_iter().collect())
    }

    fn encode(&self) -> Value {
        Value::Sequence(self.iter().map(FieldValue::encode).collect())
    }
}

impl<V: FieldValue> FieldValue for BTreeMap<String, V> {
    fn field_type() -> FieldType {
        FieldType::Dict(Box::new(FieldType::Str), Box::new(V::field_type()))
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        decode_entries(value, Self::field_type(), ctx).map(|entries| entries.into_iter().collect())
    }

    fn encode(&self) -> Value {
        encode_entries(self.iter(), V::encode)
    }

    fn encode_default(&self) -> Value {
        encode_entries(self.iter(), V::encode_default)
    }
}

impl<V: FieldValue> FieldValue for HashMap<String, V> {
    fn field_type() -> FieldType {
        FieldType::Dict(Box::new(FieldType::Str), Box::new(V::field_type()))
    }

    fn decode(value: &Value, ctx: &DeserializeContext) -> Result<Self, ConfigError> {
        decode_entries(value, Self::field_type(), ctx).map(|entries| entries.into_iter().collect())
    }

    fn encode(&self) -> Value {
        encode_entries(self.iter(), V::encode)
    }

    fn encode_default(&self) -> Value {
        encode_entries(self.iter(), V::encode_default)
    }
}
