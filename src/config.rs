//! Application configuration.
//!
//! Built once at startup and handed to each component's constructor.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::FormVariant;
use crate::{HeartwiseError, Result};

pub const MODEL_DIR_ENV: &str = "HEARTWISE_MODEL_DIR";
pub const REQUIRE_MANIFEST_ENV: &str = "HEARTWISE_REQUIRE_MODEL_MANIFEST";
pub const DB_PATH_ENV: &str = "HEARTWISE_DB_PATH";
pub const FORM_VARIANT_ENV: &str = "HEARTWISE_FORM_VARIANT";
pub const LOG_MODE_ENV: &str = "HEARTWISE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "HEARTWISE_LOG_FILE";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_DB_PATH: &str = "data/heartwise.db";
const DEFAULT_LOG_FILE: &str = "data/heartwise.log";
const IN_MEMORY_DB: &str = ":memory:";

/// Where the classifier artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    /// Refuse to load an artifact without `manifest.json`
    pub require_manifest: bool,
}

impl ModelConfig {
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            require_manifest: false,
        }
    }
}

/// Database location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_DB)
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(IN_MEMORY_DB)
    }
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal, stderr otherwise
    #[default]
    Auto,
    File,
    Stderr,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stderr" => Ok(Self::Stderr),
            other => Err(format!("unknown log mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub mode: LogMode,
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub form_variant: FormVariant,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::new(DEFAULT_MODEL_DIR),
            database: DatabaseConfig::new(DEFAULT_DB_PATH),
            logging: LoggingConfig {
                mode: LogMode::Auto,
                file: PathBuf::from(DEFAULT_LOG_FILE),
            },
            form_variant: FormVariant::default(),
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Config` for unparsable values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Config` for unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(MODEL_DIR_ENV) {
            config.model.model_dir = PathBuf::from(dir.trim());
        }
        if let Some(v) = get(REQUIRE_MANIFEST_ENV) {
            config.model.require_manifest = parse_bool(REQUIRE_MANIFEST_ENV, &v)?;
        }
        if let Some(path) = get(DB_PATH_ENV) {
            config.database = DatabaseConfig::new(path.trim());
        }
        if let Some(v) = get(FORM_VARIANT_ENV) {
            config.form_variant = v
                .parse()
                .map_err(|e| HeartwiseError::Config(format!("{FORM_VARIANT_ENV}: {e}")))?;
        }
        if let Some(v) = get(LOG_MODE_ENV) {
            config.logging.mode = v
                .parse()
                .map_err(|e| HeartwiseError::Config(format!("{LOG_MODE_ENV}: {e}")))?;
        }
        if let Some(file) = get(LOG_FILE_ENV) {
            config.logging.file = PathBuf::from(file.trim());
        }

        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(HeartwiseError::Config(format!(
            "{name}: expected a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).expect("Should build");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model.model_dir, PathBuf::from("models"));
        assert!(!config.model.require_manifest);
        assert!(!config.database.is_in_memory());
        assert_eq!(config.form_variant, FormVariant::multi_step());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (MODEL_DIR_ENV, "/opt/model"),
            (REQUIRE_MANIFEST_ENV, "YES"),
            (DB_PATH_ENV, ":memory:"),
            (FORM_VARIANT_ENV, "simplified"),
            (LOG_MODE_ENV, "stderr"),
        ]))
        .expect("Should build");

        assert_eq!(config.model.model_dir, PathBuf::from("/opt/model"));
        assert!(config.model.require_manifest);
        assert!(config.database.is_in_memory());
        assert_eq!(config.form_variant, FormVariant::simplified());
        assert_eq!(config.logging.mode, LogMode::Stderr);
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let err = AppConfig::from_lookup(lookup(&[(REQUIRE_MANIFEST_ENV, "maybe")])).unwrap_err();
        assert!(matches!(err, HeartwiseError::Config(_)));

        let err = AppConfig::from_lookup(lookup(&[(FORM_VARIANT_ENV, "hourly")])).unwrap_err();
        assert!(matches!(err, HeartwiseError::Config(_)));

        let err = AppConfig::from_lookup(lookup(&[(LOG_MODE_ENV, "syslog")])).unwrap_err();
        assert!(matches!(err, HeartwiseError::Config(_)));
    }
}
