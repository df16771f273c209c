//! Desired state derived from a descriptor.
//!
//! A [`DesiredState`] is validated once, when it is built. Everything
//! downstream (builder, convergence, resolution) reads it and never fails on
//! descriptor shape.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use outpost_core::{CoreError, ExposureMode, ObjectKey, ObjectOverride, Outpost, TargetPort};

/// Backend port, by number or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendPort {
    /// A positive port number.
    Number(i32),
    /// A non-empty port name.
    Name(String),
}

impl BackendPort {
    fn from_target(port: &TargetPort) -> Result<Self, CoreError> {
        match port {
            TargetPort::Number(n) if *n > 0 => Ok(Self::Number(*n)),
            // Port names must contain a letter.
            TargetPort::Name(name) if name.chars().any(|c| c.is_ascii_alphabetic()) => {
                Ok(Self::Name(name.clone()))
            }
            other => Err(CoreError::InvalidPort(other.to_string())),
        }
    }
}

/// Immutable input to a single exposure reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// Identity of the descriptor.
    pub descriptor: ObjectKey,
    /// Service receiving the traffic.
    pub service: ObjectKey,
    /// Service port.
    pub port: BackendPort,
    /// Routing object kind.
    pub mode: ExposureMode,
    /// Whether the resolved URL becomes the admin URL.
    pub preferred: bool,
    /// User override.
    pub overrides: Option<ObjectOverride>,
    /// Labels copied onto the routing object.
    pub labels: BTreeMap<String, String>,
    /// Controller reference to the descriptor; absent when it has no uid yet.
    pub owner: Option<OwnerReference>,
    /// Generation of the descriptor.
    pub generation: Option<i64>,
}

impl DesiredState {
    /// Build the desired state of `outpost`.
    ///
    /// Returns `Ok(None)` when the descriptor requests no exposure.
    ///
    /// # Errors
    ///
    /// Returns a `CoreError` when the descriptor lacks a name or namespace,
    /// names no service, carries an invalid port, or asks for a port form or
    /// backend namespace its exposure mode cannot express.
    pub fn from_outpost(outpost: &Outpost) -> Result<Option<Self>, CoreError> {
        let Some(expose) = outpost.spec.expose.as_ref() else {
            return Ok(None);
        };

        let name = outpost
            .metadata
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(CoreError::MissingIdentity("name"))?;
        let namespace = outpost
            .metadata
            .namespace
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(CoreError::MissingIdentity("namespace"))?;

        if expose.service.name.trim().is_empty() {
            return Err(CoreError::MissingService);
        }
        let service_namespace = expose
            .service
            .namespace
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(namespace);

        let port = BackendPort::from_target(&expose.port)?;

        match (expose.mode, &port) {
            (ExposureMode::Route, BackendPort::Name(port)) => {
                return Err(CoreError::UnsupportedPort {
                    mode: expose.mode,
                    port: port.clone(),
                });
            }
            (ExposureMode::Ingress, _) if service_namespace != namespace => {
                return Err(CoreError::CrossNamespaceBackend {
                    namespace: namespace.to_string(),
                    service_namespace: service_namespace.to_string(),
                });
            }
            _ => {}
        }

        Ok(Some(Self {
            descriptor: ObjectKey::new(namespace, name),
            service: ObjectKey::new(service_namespace, expose.service.name.clone()),
            port,
            mode: expose.mode,
            preferred: expose.preferred,
            overrides: expose.overrides.clone(),
            labels: outpost.labels().clone(),
            owner: outpost.controller_owner_ref(&()),
            generation: outpost.metadata.generation,
        }))
    }

    /// Key of the routing object managed for this descriptor.
    #[must_use]
    pub fn routing_key(&self, suffix: &str) -> ObjectKey {
        self.descriptor.child(suffix)
    }

    /// The override's raw spec fragment, if any.
    #[must_use]
    pub fn spec_override(&self) -> Option<&serde_json::Value> {
        self.overrides.as_ref().and_then(|o| o.spec.as_ref())
    }
}
