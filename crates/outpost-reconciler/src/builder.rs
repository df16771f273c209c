//! Routing spec construction.
//!
//! `build` turns a [`DesiredState`] into a kind-neutral [`RoutingSpec`].
//! Rendering into a concrete Ingress or HTTPRoute spec lives in
//! [`crate::kind`].

use crate::desired::{BackendPort, DesiredState};

/// Builder defaults taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefaults {
    /// Path prefix routed to the backend.
    pub path: String,
}

impl Default for RouteDefaults {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
        }
    }
}

/// A service backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Service name.
    pub service: String,
    /// Service namespace.
    pub namespace: String,
    /// Service port.
    pub port: BackendPort,
}

/// A prefix match routed to a single backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Matched path prefix.
    pub path_prefix: String,
    /// Backend receiving matched requests.
    pub backend: Backend,
}

/// Kind-neutral routing specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSpec {
    /// Routing rules, in order.
    pub rules: Vec<RouteRule>,
}

/// Compute the routing spec for `desired`.
#[must_use]
pub fn build(desired: &DesiredState, defaults: &RouteDefaults) -> RoutingSpec {
    RoutingSpec {
        rules: vec![RouteRule {
            path_prefix: defaults.path.clone(),
            backend: Backend {
                service: desired.service.name().to_string(),
                namespace: desired.service.namespace().to_string(),
                port: desired.port.clone(),
            },
        }],
    }
}
