//! Issue tracker error types.

use thiserror::Error;

/// Errors from the issue tracker client.
///
/// A not-found issue is distinguished from transport and auth failures so
/// callers can tell "bad key" apart from "tracker unavailable"; both degrade
/// to undecorated output.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("{provider}: not configured (no credentials in environment)")]
    NotConfigured { provider: String },

    #[error("{provider}: issue '{key}' not found")]
    NotFound { provider: String, key: String },

    #[error("{provider}: unauthorized (401) - check credentials")]
    Unauthorized { provider: String },

    #[error("{provider}: forbidden (403) - insufficient permissions")]
    Forbidden { provider: String },

    #[error("{provider}: rate limited")]
    RateLimited { provider: String },

    #[error("{provider}: network error - {message}")]
    Network { provider: String, message: String },

    #[error("{provider}: HTTP {status} - {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },
}

impl ApiError {
    pub fn not_configured(provider: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            provider: provider.into(),
        }
    }

    pub fn not_found(provider: impl Into<String>, key: impl Into<String>) -> Self {
        ApiError::NotFound {
            provider: provider.into(),
            key: key.into(),
        }
    }

    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn http(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether the tracker simply does not know the issue (as opposed to
    /// being unreachable or misconfigured)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}
