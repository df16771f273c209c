//! Error types for the storage layer.

use std::time::Duration;

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// The call did not finish before its deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::KubeApi(_) | Self::Timeout(_) | Self::Unavailable(_)
        )
    }
}
