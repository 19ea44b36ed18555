//! Configuration for shoebox filtering.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Filtering limits and behavior settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Maximum chain of smart list references followed during evaluation
    pub max_query_depth: usize,
    /// Maximum predicate nesting accepted when importing into an editable tree
    pub max_import_depth: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_query_depth: 16,
            max_import_depth: 64,
        }
    }
}

impl FilterConfig {
    /// Parse configuration from TOML; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: FilterConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loading filter config from {}", path.display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_query_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_query_depth must be at least 1".into(),
            ));
        }
        if self.max_import_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_import_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(FilterConfig::from_toml_str("").unwrap(), FilterConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = FilterConfig::from_toml_str("max_query_depth = 4").unwrap();
        assert_eq!(config.max_query_depth, 4);
        assert_eq!(config.max_import_depth, 64);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let err = FilterConfig::from_toml_str("max_import_depth = 0").unwrap_err();
        assert!(matches!(err, FilterError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = FilterConfig::from_toml_str("max_query_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, FilterError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = FilterConfig::load("/nonexistent/shoebox/filter.toml").unwrap_err();
        assert!(matches!(err, FilterError::Config(ConfigError::Io { .. })));
    }
}
