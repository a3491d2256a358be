use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all fatal failure modes.
///
/// Problems found *in* the documentation (broken links, missing pages) are
/// never errors; they are recorded as issues on the checked items.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error reading {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error writing {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {path} - {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON parsing error: {path} - {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required input not found: {path}")]
    MissingInput { path: PathBuf },

    #[error("Unsupported HTML tag <{tag}> in {file}:{line_number}")]
    UnknownTag {
        tag: String,
        file: String,
        line_number: usize,
    },

    #[error("Results for '{key}' not available for hub {hub}")]
    MissingResults { key: String, hub: String },

    #[error("File system traversal error: {path} - {reason}")]
    FileSystemTraversal { path: PathBuf, reason: String },
}

impl CheckError {
    /// Wrap an I/O error with the path that caused it.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap an I/O error from writing or creating `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Wrap a YAML error with the document path.
    pub fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        CheckError::Yaml {
            path: path.into(),
            source,
        }
    }

    /// Wrap a JSON error with the document path.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CheckError::Json {
            path: path.into(),
            source,
        }
    }
}

impl From<crate::config::ConfigError> for CheckError {
    fn from(err: crate::config::ConfigError) -> Self {
        CheckError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CheckError>;
