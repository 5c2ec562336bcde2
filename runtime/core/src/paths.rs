use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_SOURCE_FILE: &str = "config.yml";

/// Resolves a document path against the current directory at call time.
///
/// With `path_is_absolute` the path is returned as given.
pub fn resolve_path(path: impl AsRef<Path>, path_is_absolute: bool) -> Result<PathBuf, ConfigError> {
    let path = path.as_ref();
    if path_is_absolute {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(ConfigError::CurrentDir)?;
    Ok(cwd.join(path))
}

/// Schema-time variant of [`resolve_path`]: a missing working directory
/// leaves the path relative instead of failing the record definition.
pub fn default_source_path(path: &Path, path_is_absolute: bool) -> PathBuf {
    match resolve_path(path, path_is_absolute) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(path = %path.display(), "{err}; keeping the path relative");
            path.to_path_buf()
        }
    }
}
