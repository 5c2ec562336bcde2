use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationFinding;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration must be loaded before accessing '{field}'. Call load() first.")]
    NotLoaded { field: String },
    #[error("Configuration validation failed:\n{}", render_findings(.findings))]
    Validation { findings: Vec<ValidationFinding> },
    #[error("Missing required field '{field}' in {record}")]
    MissingField { record: &'static str, field: String },
    #[error("Unknown field '{field}' in {record}")]
    UnknownField { record: &'static str, field: String },
    #[error("Invalid value for '{field}' in {record}: {message}")]
    InvalidValue {
        record: &'static str,
        field: String,
        message: String,
    },
    #[error("Failed to read config {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Top level of {} must be a mapping, got {found}", .path.display())]
    NotAMapping { path: PathBuf, found: &'static str },
    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

impl ConfigError {
    pub fn findings(&self) -> &[ValidationFinding] {
        match self {
            ConfigError::Validation { findings } => findings,
            _ => &[],
        }
    }

    /// True for the error classes caused by the document's contents rather
    /// than by the filesystem or the caller.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Validation { .. }
                | ConfigError::MissingField { .. }
                | ConfigError::UnknownField { .. }
                | ConfigError::InvalidValue { .. }
                | ConfigError::Parse { .. }
                | ConfigError::NotAMapping { .. }
        )
    }
}

fn render_findings(findings: &[ValidationFinding]) -> String {
    findings
        .iter()
        .map(|finding| format!("  - {finding}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_finding() {
        let err = ConfigError::Validation {
            findings: vec![
                ValidationFinding::new("name", "str", "int"),
                ValidationFinding::new("age", "int", "str"),
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("Configuration validation failed"));
        assert!(message.contains("Field 'name' expected str, got int"));
        assert!(message.contains("Field 'age' expected int, got str"));
        assert_eq!(err.findings().len(), 2);
    }

    #[test]
    fn not_loaded_names_the_field() {
        let err = ConfigError::NotLoaded {
            field: "property_a".into(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration must be loaded before accessing 'property_a'. Call load() first."
        );
        assert!(!err.is_document_error());
    }
}
