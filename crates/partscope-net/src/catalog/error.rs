//! Catalog error taxonomy.

use thiserror::Error;

use crate::error::NetworkError;

/// Errors surfaced by the catalog provider and the remote data cache.
///
/// Cloneable so every coalesced waiter on one fetch receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The provider could not be reached (connection failure, timeout).
    #[error("catalog service unavailable: {message}")]
    ProviderUnavailable {
        /// Human-readable cause.
        message: String,
    },

    /// The provider answered with an error.
    #[error("catalog service error (HTTP {status}): {message}")]
    ProviderError {
        /// HTTP status of the response.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The response body did not have a recognized shape.
    #[error("malformed catalog response: {message}")]
    MalformedResponse {
        /// What was wrong with the body.
        message: String,
    },

    /// No provider endpoint is configured.
    #[error("catalog service not configured: {message}")]
    ConfigurationMissing {
        /// What is missing.
        message: String,
    },
}

impl CatalogError {
    /// Build a [`CatalogError::MalformedResponse`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Build a [`CatalogError::ProviderUnavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Build a [`CatalogError::ConfigurationMissing`].
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            message: message.into(),
        }
    }

    /// Whether retrying later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderUnavailable { .. } => true,
            Self::ProviderError { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedResponse { .. } | Self::ConfigurationMissing { .. } => false,
        }
    }
}

impl From<NetworkError> for CatalogError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::HttpStatus { status, message } => Self::ProviderError {
                status,
                message: message.unwrap_or_else(|| format!("HTTP {status}")),
            },
            NetworkError::Json(message) | NetworkError::InvalidBody(message) => {
                Self::MalformedResponse { message }
            }
            NetworkError::InvalidUrl(message) => Self::ConfigurationMissing {
                message: format!("invalid service URL: {message}"),
            },
            NetworkError::InvalidHeader(message) => Self::ConfigurationMissing {
                message: format!("invalid request header: {message}"),
            },
            other => Self::ProviderUnavailable {
                message: other.to_string(),
            },
        }
    }
}

/// A specialized Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
