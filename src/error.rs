//! Error types for the retrieval pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("{0} is not set; put it in your config file, environment or .env")]
    MissingValue(&'static str),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised by the embedding and completion providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to connect to provider: {0}")]
    ConnectionError(String),

    #[error("provider returned {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("provider request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider request timed out")]
    Timeout,
}

impl ProviderError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::ConnectionError(err.to_string())
        } else {
            ProviderError::RequestError(err)
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::ConnectionError(_) | ProviderError::Timeout => true,
            // Rate limits and upstream outages; auth and bad requests are final
            ProviderError::ServerError { status, .. } => *status == 429 || *status >= 500,
            ProviderError::RequestError(e) => e.is_timeout() || e.is_connect(),
            ProviderError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to store: {0}")]
    ConnectionError(String),

    #[error("pgvector extension error: {0}")]
    ExtensionMissing(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("postgres error: {0}")]
    Postgres(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_foreign_key_violation()
                    || db.is_check_violation()
                    || db.is_unique_violation() =>
            {
                StoreError::Constraint(db.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::ConnectionError(err.to_string()),
            _ => StoreError::Postgres(err.to_string()),
        }
    }
}

/// Errors surfaced by the retrieval and answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RagError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RagError::InvalidRequest(message.into())
    }
}
