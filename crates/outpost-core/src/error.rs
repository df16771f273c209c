//! Common error types for outpost.
//!
//! These errors describe descriptors that cannot be turned into a desired
//! state. They are caught when the desired state is constructed, never later.

use thiserror::Error;

use crate::outpost::ExposureMode;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout outpost.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The target port is neither a positive number nor a name containing a letter.
    #[error("invalid target port: {0}")]
    InvalidPort(String),

    /// The exposure mode cannot express the requested port form.
    #[error("{mode} exposure requires a numeric port, got name {port:?}")]
    UnsupportedPort {
        /// The exposure mode in use.
        mode: ExposureMode,
        /// The rejected port name.
        port: String,
    },

    /// The descriptor lacks an identity field (name, namespace).
    #[error("descriptor is missing {0}")]
    MissingIdentity(&'static str),

    /// The target service name is empty.
    #[error("target service name is empty")]
    MissingService,

    /// An Ingress backend was placed in another namespace.
    #[error("Ingress backend must live in namespace {namespace}, got {service_namespace}")]
    CrossNamespaceBackend {
        /// The descriptor namespace.
        namespace: String,
        /// The requested service namespace.
        service_namespace: String,
    },
}
