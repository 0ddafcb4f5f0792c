use std::path::PathBuf;

use thiserror::Error;

/// Failure while fetching or decoding the festival dataset.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("server returned status {0}")]
    Status(u16),

    #[error("malformed festival data: {0}")]
    Decode(String),
}

impl LoadError {
    /// Transport hiccups and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LoadError::Http(e) => !e.is_decode() && !e.is_builder(),
            LoadError::Timeout => true,
            LoadError::Status(code) => *code >= 500,
            LoadError::Client(_) | LoadError::Decode(_) => false,
        }
    }
}

/// Failure while persisting the note mapping.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
