//! Error types for querybridge.
//!
//! Every public operation surfaces one of these kinds. Engine-level errors are
//! converted at the connection boundary and keep the engine message.

use thiserror::Error;

use crate::traits::ProviderKind;

/// Result type alias for querybridge
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Main error type for querybridge
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Operation attempted before `connect()`
    #[error("connection '{0}' is not initialized")]
    NotInitialized(String),

    /// Destructive statement on a read-only connection
    #[error("connection '{name}' is read-only: {keyword} statements are not allowed")]
    PermissionDenied { name: String, keyword: String },

    /// The engine rejected or failed a statement
    #[error("{provider} query failed: {message}")]
    QueryFailed {
        provider: ProviderKind,
        message: String,
    },

    /// Catalog introspection failed
    #[error("{provider} schema extraction failed: {message}")]
    SchemaExtractionFailed {
        provider: ProviderKind,
        message: String,
    },

    /// The engine refused the connect step
    #[error("{provider} connection failed: {message}")]
    ConnectFailed {
        provider: ProviderKind,
        message: String,
    },

    /// Unknown factory key
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Missing or ill-typed connection parameters
    #[error("invalid {provider} configuration: {message}")]
    InvalidConfig {
        provider: ProviderKind,
        message: String,
    },

    /// No connection registered under this name
    #[error("connection not registered: {0}")]
    NotRegistered(String),

    /// The cipher rejected a token
    #[error("failed to decrypt credentials: {0}")]
    DecryptionFailed(String),

    /// Settings errors (e.g. a malformed cipher key)
    #[error("configuration error: {0}")]
    Config(String),
}

impl ConnectorError {
    pub(crate) fn query_failed(provider: ProviderKind, err: impl std::fmt::Display) -> Self {
        Self::QueryFailed {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn schema_failed(provider: ProviderKind, err: &anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line
        Self::SchemaExtractionFailed {
            provider,
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn connect_failed(provider: ProviderKind, err: impl std::fmt::Display) -> Self {
        Self::ConnectFailed {
            provider,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_config(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider,
            message: message.into(),
        }
    }
}
