use thiserror::Error;

use crate::cluster::ClusterError;

/// Top-level error for the batteries API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParsingFailed { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ApiError>;
