use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::value::DeserializeContext;

/// Per-instance bookkeeping every config record carries next to its fields.
#[derive(Debug, Clone)]
pub struct RecordState {
    record: &'static str,
    source_path: PathBuf,
    loaded: bool,
}

impl RecordState {
    pub fn new(record: &'static str, source_path: PathBuf) -> Self {
        Self {
            record,
            source_path,
            loaded: false,
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn set_source_path(&mut self, path: PathBuf) {
        self.source_path = path;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn mark_loaded(&mut self) {
        self.loaded = true;
    }
}

/// Who is reading a field.
#[derive(Debug, Clone, Copy)]
pub enum Access<'a> {
    Caller,
    Deserializing(&'a DeserializeContext),
}

/// Guarded read of one field slot.
pub fn read<'a, T>(
    state: &RecordState,
    access: Access<'_>,
    field: &'static str,
    slot: &'a Option<T>,
) -> Result<&'a T, ConfigError> {
    if state.is_loaded() {
        return slot.as_ref().ok_or_else(|| ConfigError::MissingField {
            record: state.record(),
            field: field.to_string(),
        });
    }

    match access {
        Access::Caller => Err(ConfigError::NotLoaded {
            field: field.to_string(),
        }),
        Access::Deserializing(ctx) => slot.as_ref().ok_or_else(|| ConfigError::MissingField {
            record: ctx.record(),
            field: ctx.qualify(field),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unloaded() -> RecordState {
        RecordState::new("Sample", PathBuf::from("/tmp/config.yml"))
    }

    #[test]
    fn callers_cannot_read_before_load() {
        let state = unloaded();
        let err = read(&state, Access::Caller, "port", &Some(8080)).unwrap_err();
        match err {
            ConfigError::NotLoaded { field } => assert_eq!(field, "port"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn deserializer_sees_placeholders() {
        let state = unloaded();
        let ctx = DeserializeContext::new("Sample");
        let value = read(&state, Access::Deserializing(&ctx), "port", &Some(8080)).expect("read");
        assert_eq!(*value, 8080);

        let err = read::<u16>(&state, Access::Deserializing(&ctx.child("server")), "port", &None)
            .unwrap_err();
        match err {
            ConfigError::MissingField { record, field } => {
                assert_eq!(record, "Sample");
                assert_eq!(field, "server.port");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn loaded_state_is_terminal() {
        let mut state = unloaded();
        state.mark_loaded();
        state.set_source_path(PathBuf::from("other.yml"));
        assert!(state.is_loaded());
        assert_eq!(*read(&state, Access::Caller, "port", &Some(1)).expect("read"), 1);
        assert_eq!(state.source_path(), Path::new("other.yml"));
    }
}
