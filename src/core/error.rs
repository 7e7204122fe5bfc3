//! Error types for scheduler operations.

use thiserror::Error;

use super::job::Platform;

/// Errors produced by queue, source-store and configuration components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Queue backend failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// Source-of-truth query failure.
    #[error("source error: {0}")]
    Source(String),
    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Failure reported by a delivery capability.
///
/// All variants are consumed by the same retry policy; a permanently
/// misconfigured platform exhausts its attempts and is dead-lettered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// No client credentials are configured for the platform.
    #[error("{0} API credentials not configured")]
    MissingCredentials(Platform),
    /// No delivery capability is registered for the platform tag.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    /// The platform capability exists but cannot publish yet.
    #[error("{0} publishing not yet implemented")]
    NotImplemented(Platform),
    /// Network or remote API failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
