//! Config records: the [`Record`] trait, the generic deserializer behind
//! it and the [`config_record!`](crate::config_record) declaration macro.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::access::{self, Access, RecordState};
use crate::error::ConfigError;
use crate::loader;
use crate::schema::{Schema, SOURCE_PATH_FIELD};
use crate::types::runtime_type_name;
use crate::validation::validate_all;
use crate::value::{DeserializeContext, FieldValue};

/// A config record declared with [`config_record!`](crate::config_record).
///
/// The hidden methods are the plumbing the macro generates; callers use
/// the factory, load and serialization methods.
pub trait Record: Sized + Clone + fmt::Debug {
    fn schema() -> &'static Schema;

    #[doc(hidden)]
    fn blank() -> Self;

    #[doc(hidden)]
    fn state(&self) -> &RecordState;

    #[doc(hidden)]
    fn state_mut(&mut self) -> &mut RecordState;

    /// Decodes `value` into `field`; `Ok(false)` when no such field exists.
    #[doc(hidden)]
    fn assign(
        &mut self,
        field: &str,
        value: &Value,
        ctx: &DeserializeContext,
    ) -> Result<bool, ConfigError>;

    #[doc(hidden)]
    fn finish(&mut self, ctx: &DeserializeContext) -> Result<(), ConfigError>;

    #[doc(hidden)]
    fn encode_fields(&self) -> Mapping;

    /// Unloaded instance with every field at its default or placeholder.
    fn create() -> Self {
        Self::blank()
    }

    /// Like [`Record::create`], with some fields seeded from `overrides`.
    fn create_with<I, K>(overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let schema = Self::schema();
        let ctx = DeserializeContext::new(schema.name());
        let mut record = Self::blank();
        for (key, value) in overrides {
            let key = key.as_ref();
            if !record.assign(key, &value, &ctx.child(key))? {
                return Err(ConfigError::UnknownField {
                    record: schema.name(),
                    field: key.to_string(),
                });
            }
        }
        Ok(record)
    }

    fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    fn source_path(&self) -> &Path {
        self.state().source_path()
    }

    fn set_source_path(&mut self, path: impl Into<PathBuf>) {
        self.state_mut().set_source_path(path.into());
    }

    /// Loads the document at this instance's source path.
    fn load(&mut self) -> Result<(), ConfigError> {
        loader::load(self, None, false)
    }

    fn load_from(&mut self, path: impl AsRef<Path>, path_is_absolute: bool) -> Result<(), ConfigError> {
        loader::load(self, Some(path.as_ref()), path_is_absolute)
    }

    fn load_str(&mut self, content: &str) -> Result<(), ConfigError> {
        loader::load_from_str(self, content)
    }

    fn to_value(&self) -> Result<Value, ConfigError> {
        if !self.is_loaded() {
            let schema = Self::schema();
            let field = schema.fields().first().map_or(schema.name(), |decl| decl.name);
            return Err(ConfigError::NotLoaded {
                field: field.to_string(),
            });
        }
        Ok(Value::Mapping(self.encode_fields()))
    }

    fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.to_value()?).map_err(ConfigError::Serialize)
    }
}

/// Builds a fresh, still unloaded `R` from a document mapping.
///
/// Type validation of the mapping is the caller's job.
pub fn deserialize<R: Record>(document: &Mapping, ctx: &DeserializeContext) -> Result<R, ConfigError> {
    let schema = R::schema();
    let mut record = R::blank();

    for (key, value) in document {
        let Some(name) = key.as_str() else {
            return Err(ConfigError::InvalidValue {
                record: schema.name(),
                field: ctx.qualify(&render_key(key)),
                message: format!("document keys must be str, got {}", runtime_type_name(key)),
            });
        };
        if name == SOURCE_PATH_FIELD {
            tracing::debug!(record = schema.name(), "document `{SOURCE_PATH_FIELD}` ignored");
            continue;
        }
        match schema.field(name) {
            None if schema.is_strict() => {
                return Err(ConfigError::UnknownField {
                    record: schema.name(),
                    field: ctx.qualify(name),
                });
            }
            None => {
                tracing::debug!(record = schema.name(), field = name, "unknown field ignored");
            }
            // An explicit null counts as omitted unless the field is nullable.
            Some(decl) if value.is_null() && !decl.ty.is_nullable() => {}
            Some(_) => {
                record.assign(name, value, &ctx.child(name))?;
            }
        }
    }

    record.finish(ctx)?;
    Ok(record)
}

fn render_key(key: &Value) -> String {
    match key {
        Value::Null => "~".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        other => format!("<{}>", runtime_type_name(other)),
    }
}

/// Conversion of a declared default into its field type.
///
/// Unlike `From`, the only impls are the identity and string literals, so
/// unsuffixed numeric literals infer the field's own type.
#[doc(hidden)]
pub trait FromFieldDefault<S> {
    fn from_field_default(source: S) -> Self;
}

impl<T> FromFieldDefault<T> for T {
    fn from_field_default(source: T) -> Self {
        source
    }
}

impl FromFieldDefault<&str> for String {
    fn from_field_default(source: &str) -> Self {
        source.to_string()
    }
}

impl FromFieldDefault<&str> for PathBuf {
    fn from_field_default(source: &str) -> Self {
        PathBuf::from(source)
    }
}

/// Decodes a nested record: validation, deserialization and the loaded flag.
pub fn decode_nested<R: Record>(value: &Value, ctx: &DeserializeContext) -> Result<R, ConfigError> {
    let schema = R::schema();
    let Value::Mapping(document) = value else {
        return Err(ctx.invalid(format!(
            "expected {}, got {}",
            schema.name(),
            runtime_type_name(value)
        )));
    };

    let nested = ctx.nested(schema.name());
    let findings = validate_all(document, schema, &nested);
    if !findings.is_empty() {
        return Err(ConfigError::Validation { findings });
    }

    let mut record = deserialize::<R>(document, &nested)?;
    record.state_mut().mark_loaded();
    Ok(record)
}

/// Initial slot value of a field: its default decoded into `T`.
pub fn placeholder<T: FieldValue>(schema: &Schema, field: &'static str) -> Option<T> {
    let value = schema.default_value(field)?;
    let ctx = DeserializeContext::new(schema.name()).child(field);
    match T::decode(&value, &ctx) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(record = schema.name(), field, "default does not fit its field: {err}");
            None
        }
    }
}

/// Final pass over one slot after the document has been applied.
///
/// Absent nullable fields become null; anything still empty fails through
/// the access guard.
pub fn settle<T: FieldValue>(
    state: &RecordState,
    slot: &mut Option<T>,
    field: &'static str,
    ctx: &DeserializeContext,
) -> Result<(), ConfigError> {
    if slot.is_none() && T::field_type().is_nullable() {
        *slot = Some(T::decode(&Value::Null, &ctx.child(field))?);
    }
    access::read(state, Access::Deserializing(ctx), field, slot)?;
    Ok(())
}

/// Declares a config record.
///
/// ```
/// use typed_config::{config_record, Record};
///
/// config_record! {
///     /// Connection settings.
///     pub struct Database {
///         host: String = "localhost",
///         port: u16 = 5432u16,
///         replicas: Vec<String>,
///     }
/// }
///
/// config_record! {
///     pub struct AppConfig (source_path = "app.yml", strict = true) {
///         name: String,
///         database: Database,
///         timeout_secs: Option<u64>,
///     }
/// }
///
/// let mut config = AppConfig::create();
/// assert!(config.name().is_err());
/// config
///     .load_str("name: demo\ndatabase:\n  port: 6543\n")
///     .expect("load");
/// assert_eq!(config.name().expect("name"), "demo");
/// assert_eq!(*config.database().expect("db").port().expect("port"), 6543);
/// assert_eq!(*config.timeout_secs().expect("timeout"), None);
/// ```
///
/// Options in parentheses are [`SchemaBuilder`](crate::SchemaBuilder)
/// methods: `source_path`, `path_is_absolute` and `strict`. Each field gets
/// an accessor of the same name that fails with
/// [`ConfigError::NotLoaded`] until the record is loaded. The struct derives
/// `Clone`; its `Debug` output and [`FieldValue::encode`](crate::FieldValue)
/// show no field values until it is loaded (`encode` gives null).
#[macro_export]
macro_rules! config_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $( ( $($opt:ident = $optval:expr),* $(,)? ) )? {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty $( = $default:expr )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            __state: $crate::RecordState,
            $( $field: ::core::option::Option<$ty>, )*
        }

        impl $name {
            $(
                $(#[$fmeta])*
                pub fn $field(&self) -> ::core::result::Result<&$ty, $crate::ConfigError> {
                    $crate::access::read(
                        &self.__state,
                        $crate::Access::Caller,
                        ::core::stringify!($field),
                        &self.$field,
                    )
                }
            )*
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                let mut out = f.debug_struct(::core::stringify!($name));
                out.field("source_path", &self.__state.source_path());
                if !self.__state.is_loaded() {
                    return out.finish_non_exhaustive();
                }
                $(
                    if let ::core::option::Option::Some(value) = &self.$field {
                        out.field(::core::stringify!($field), value);
                    }
                )*
                out.finish()
            }
        }

        impl $crate::Record for $name {
            fn schema() -> &'static $crate::Schema {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema> = ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let builder = $crate::Schema::builder(::core::stringify!($name));
                    $( $( let builder = builder.$opt($optval); )* )?
                    builder
                        $(
                            .field(
                                $crate::FieldDecl::new(
                                    ::core::stringify!($field),
                                    <$ty as $crate::FieldValue>::field_type(),
                                )
                                $(
                                    .with_default($crate::FieldDefault::Factory(|| {
                                        let value = <$ty as $crate::record::FromFieldDefault<_>>::from_field_default(
                                            $default,
                                        );
                                        <$ty as $crate::FieldValue>::encode_default(&value)
                                    }))
                                )?
                            )
                        )*
                        .build()
                })
            }

            fn blank() -> Self {
                let schema = <Self as $crate::Record>::schema();
                Self {
                    __state: $crate::RecordState::new(
                        schema.name(),
                        schema.source_path().to_path_buf(),
                    ),
                    $( $field: $crate::record::placeholder::<$ty>(schema, ::core::stringify!($field)), )*
                }
            }

            fn state(&self) -> &$crate::RecordState {
                &self.__state
            }

            fn state_mut(&mut self) -> &mut $crate::RecordState {
                &mut self.__state
            }

            fn assign(
                &mut self,
                field: &str,
                value: &$crate::Value,
                ctx: &$crate::DeserializeContext,
            ) -> ::core::result::Result<bool, $crate::ConfigError> {
                $(
                    if field == ::core::stringify!($field) {
                        self.$field = ::core::option::Option::Some(
                            <$ty as $crate::FieldValue>::decode(value, ctx)?,
                        );
                        return ::core::result::Result::Ok(true);
                    }
                )*
                let _ = (field, value, ctx);
                ::core::result::Result::Ok(false)
            }

            fn finish(
                &mut self,
                ctx: &$crate::DeserializeContext,
            ) -> ::core::result::Result<(), $crate::ConfigError> {
                $(
                    $crate::record::settle(
                        &self.__state,
                        &mut self.$field,
                        ::core::stringify!($field),
                        ctx,
                    )?;
                )*
                let _ = ctx;
                ::core::result::Result::Ok(())
            }

            fn encode_fields(&self) -> $crate::Mapping {
                #[allow(unused_mut)]
                let mut fields = $crate::Mapping::new();
                $(
                    if let ::core::option::Option::Some(value) = &self.$field {
                        fields.insert(
                            $crate::Value::from(::core::stringify!($field)),
                            <$ty as $crate::FieldValue>::encode(value),
                        );
                    }
                )*
                fields
            }
        }

        impl $crate::FieldValue for $name {
            fn field_type() -> $crate::FieldType {
                $crate::FieldType::Record($crate::RecordRef::new(
                    <Self as $crate::Record>::schema,
                ))
            }

            fn decode(
                value: &$crate::Value,
                ctx: &$crate::DeserializeContext,
            ) -> ::core::result::Result<Self, $crate::ConfigError> {
                $crate::record::decode_nested::<Self>(value, ctx)
            }

            fn encode(&self) -> $crate::Value {
                if !<Self as $crate::Record>::is_loaded(self) {
                    return $crate::Value::Null;
                }
                $crate::Value::Mapping(<Self as $crate::Record>::encode_fields(self))
            }

            fn encode_default(&self) -> $crate::Value {
                $crate::Value::Mapping(<Self as $crate::Record>::encode_fields(self))
            }
        }
    };
}
