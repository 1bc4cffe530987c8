//! Error types for providers, cache stores, and configuration.

use thiserror::Error;

/// Failure of a routing provider call.
///
/// These never reach the caller of a planning operation: the matrix builder
/// degrades failed pairs to "unresolved" and flags the result instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("no coordinates known for {0:?}")]
    MissingCoordinates(String),

    #[error("no route between {origin:?} and {destination:?}")]
    NoRoute { origin: String, destination: String },
}

/// Failure of a travel cache backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cache lock poisoned")]
    Poisoned,

    #[error("corrupt cache row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
