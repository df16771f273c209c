//! Error types for the reconciler crate.

use outpost_core::{CoreError, ExposureMode};
use outpost_store::StoreError;
use thiserror::Error;

/// Errors that can occur while merging an override onto a computed spec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// The override is not a JSON object.
    #[error("override must be an object, got {0}")]
    NotAnObject(&'static str),

    /// The merged document does not fit the target schema.
    #[error("override does not match the target schema: {0}")]
    Incompatible(String),

    /// The override sets a field the target schema does not have.
    #[error("override sets unknown field `{path}`")]
    UnknownField {
        /// Dotted path of the field.
        path: String,
    },

    /// The computed spec could not be encoded.
    #[error("failed to encode spec: {0}")]
    Encode(String),
}

/// Errors that can occur during a reconcile.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The descriptor cannot be turned into a desired state.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] CoreError),

    /// The user override could not be merged.
    #[error("invalid override: {0}")]
    Merge(#[from] MergeError),

    /// Object store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The controller reference could not be set.
    #[error("ownership error: {0}")]
    Ownership(String),

    /// The routing object has no address yet.
    #[error("{0} is not ready yet")]
    NotReady(ExposureMode),

    /// Addresses exist but none yields a usable host.
    #[error("{0} spec is incomplete")]
    IncompleteSpec(ExposureMode),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReconcileError {
    /// Check if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retriable(),
            Self::NotReady(_) => true,
            Self::InvalidDescriptor(_)
            | Self::Merge(_)
            | Self::Ownership(_)
            | Self::IncompleteSpec(_)
            | Self::Config(_) => false,
        }
    }
}

/// A specialized Result type for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
