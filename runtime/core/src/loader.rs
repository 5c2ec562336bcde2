use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;
use crate::paths::resolve_path;
use crate::record::{deserialize, Record};
use crate::types::runtime_type_name;
use crate::validation::validate_all;
use crate::value::DeserializeContext;

const MEMORY_SOURCE: &str = "<memory>";

/// Loads the document at `path` (or the record's own source path) into
/// `target`.
///
/// `target` is replaced in one assignment at the very end; on any error it
/// is left exactly as it was.
pub fn load<R: Record>(
    target: &mut R,
    path: Option<&Path>,
    path_is_absolute: bool,
) -> Result<(), ConfigError> {
    let requested = path.unwrap_or_else(|| target.source_path());
    let resolved = resolve_path(requested, path_is_absolute)?;
    tracing::debug!(record = R::schema().name(), path = %resolved.display(), "loading config");

    let content = fs::read_to_string(&resolved).map_err(|source| ConfigError::FileAccess {
        path: resolved.clone(),
        source,
    })?;
    let document = parse_document(&content, &resolved)?;
    apply(target, &document, &resolved)
}

/// Same as [`load`], for a document that is already in memory.
pub fn load_from_str<R: Record>(target: &mut R, content: &str) -> Result<(), ConfigError> {
    let origin = PathBuf::from(MEMORY_SOURCE);
    let document = parse_document(content, &origin)?;
    apply(target, &document, &origin)
}

/// Parses YAML text into the top-level mapping of a config document.
///
/// An empty document is an empty mapping.
pub fn parse_document(content: &str, origin: &Path) -> Result<Mapping, ConfigError> {
    let value: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(ConfigError::NotAMapping {
            path: origin.to_path_buf(),
            found: runtime_type_name(&other),
        }),
    }
}

fn apply<R: Record>(target: &mut R, document: &Mapping, origin: &Path) -> Result<(), ConfigError> {
    let schema = R::schema();
    let ctx = DeserializeContext::new(schema.name());

    let findings = validate_all(document, schema, &ctx);
    if !findings.is_empty() {
        tracing::debug!(record = schema.name(), count = findings.len(), "validation failed");
        return Err(ConfigError::Validation { findings });
    }

    let mut fresh: R = deserialize(document, &ctx)?;
    fresh.set_source_path(target.source_path().to_path_buf());
    fresh.state_mut().mark_loaded();

    *target = fresh;
    tracing::info!(record = schema.name(), origin = %origin.display(), "config loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::config_record! {
        struct Flags {
            verbose: bool,
            level: Option<u8>,
        }
    }

    #[test]
    fn empty_document_is_an_empty_mapping() {
        let mapping = parse_document("", Path::new("empty.yml")).expect("parse");
        assert!(mapping.is_empty());
    }

    #[test]
    fn top_level_must_be_a_mapping() {
        let err = parse_document("- a\n- b\n", Path::new("list.yml")).unwrap_err();
        match err {
            ConfigError::NotAMapping { path, found } => {
                assert_eq!(path, PathBuf::from("list.yml"));
                assert_eq!(found, "list");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = parse_document("a: [1, 2\n", Path::new("bad.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_from_str_publishes_and_keeps_source_path() {
        let mut flags = Flags::create();
        flags.set_source_path("/srv/flags.yml");
        flags.load_str("verbose: true\n").expect("load");
        assert!(flags.is_loaded());
        assert!(*flags.verbose().expect("verbose"));
        assert_eq!(*flags.level().expect("level"), None);
        assert_eq!(flags.source_path(), Path::new("/srv/flags.yml"));
    }

    #[test]
    fn failed_load_leaves_the_instance_untouched() {
        let mut flags = Flags::create();
        let err = flags.load_str("verbose: yes please\n").unwrap_err();
        assert_eq!(err.findings().len(), 1);
        assert!(!flags.is_loaded());
        assert!(matches!(flags.verbose(), Err(ConfigError::NotLoaded { .. })));

        flags.load_str("verbose: false\nlevel: 3\n").expect("load");
        let err = flags.load_str("verbose: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(flags.is_loaded());
        assert_eq!(*flags.level().expect("level"), Some(3));
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut flags = Flags::create();
        let err = flags
            .load_from(dir.path().join("absent.yml"), true)
            .unwrap_err();
        match err {
            ConfigError::FileAccess { path, .. } => assert!(path.ends_with("absent.yml")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!flags.is_loaded());
    }
}
