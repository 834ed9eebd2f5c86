//! Report configuration.
//!
//! Every field has a default, so a config file only needs the knobs it
//! changes:
//!
//! ```json
//! {"repeat_count_variable": "NUMBER_OF_LOTS", "strict_strings": true}
//! ```
use crate::interpreter::InterpreterOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_REPEAT_COUNT_VARIABLE: &str = "NUMBER_OF_CONTRACTS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Variable the special tags set to the number of repeated sections.
    pub repeat_count_variable: String,

    /// Reject strings in numeric expressions instead of hashing them.
    pub strict_strings: bool,

    /// Log every `tag -> value` mapping.
    pub log_tags: bool,

    /// Characters of a multi-line tag shown in log lines.
    pub preview_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            repeat_count_variable: DEFAULT_REPEAT_COUNT_VARIABLE.to_string(),
            strict_strings: false,
            log_tags: true,
            preview_width: 16,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            strict_strings: self.strict_strings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ReportConfig = serde_json::from_str(r#"{"strict_strings": true}"#).unwrap();
        assert!(config.strict_strings);
        assert_eq!(config.repeat_count_variable, DEFAULT_REPEAT_COUNT_VARIABLE);
        assert_eq!(config.preview_width, 16);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<ReportConfig>(r#"{"strict": true}"#).is_err());
    }
}
