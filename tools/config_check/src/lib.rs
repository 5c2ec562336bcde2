pub mod schema;

use std::path::Path;

use schema::ProductConfig;
use serde::Serialize;
use thiserror::Error;
use typed_config::{ConfigError, Record, ValidationFinding};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{0}")]
    Load(#[from] ConfigError),
    #[error("Failed to render report: {0}")]
    Render(#[from] serde_yaml::Error),
}

impl CheckError {
    pub fn findings(&self) -> &[ValidationFinding] {
        match self {
            CheckError::Load(err) => err.findings(),
            CheckError::Render(_) => &[],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindingsReport<'a> {
    pub path: String,
    pub findings: &'a [ValidationFinding],
}

/// Loads the product config from `path`, or from its default location.
pub fn load_product(path: Option<&Path>, path_is_absolute: bool) -> Result<ProductConfig, CheckError> {
    let mut config = ProductConfig::create();
    tracing::debug!(
        path = %path.unwrap_or_else(|| config.source_path()).display(),
        path_is_absolute,
        "loading product config"
    );
    match path {
        Some(path) => config.load_from(path, path_is_absolute)?,
        None => config.load()?,
    }
    Ok(config)
}

/// One printable line per value, in declaration order.
pub fn summary_lines(config: &ProductConfig) -> Result<Vec<String>, CheckError> {
    Ok(vec![
        config.property_a()?.to_string(),
        config.property_b()?.clone(),
        config.part_config()?.property_c()?.to_string(),
    ])
}

pub fn findings_yaml(path: &str, findings: &[ValidationFinding]) -> Result<String, CheckError> {
    let report = FindingsReport {
        path: path.to_string(),
        findings,
    };
    Ok(serde_yaml::to_string(&report)?)
}
