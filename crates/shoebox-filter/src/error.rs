//! Error types for shoebox-filter

use thiserror::Error;

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Main error type for filter operations
#[derive(Error, Debug)]
pub enum FilterError {
    /// Persistence codec errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors decoding or encoding persisted predicates
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input is not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(String),

    /// A node is not an object with a string `kind`
    #[error("Predicate node has no kind: {0}")]
    MissingKind(String),

    /// A node of a known kind has a malformed body
    #[error("Malformed '{kind}' predicate: {message}")]
    Malformed { kind: String, message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },

    /// Config text is not valid TOML for the schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Config parsed but holds an unusable value
    #[error("Invalid value: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> Self {
        FilterError::Codec(CodecError::Json(err.to_string()))
    }
}

impl From<toml::de::Error> for FilterError {
    fn from(err: toml::de::Error) -> Self {
        FilterError::Config(ConfigError::Parse(err.to_string()))
    }
}
