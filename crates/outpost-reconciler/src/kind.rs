//! Routing object kinds.
//!
//! [`RoutingKind`] is the seam between the kind-neutral pipeline and the two
//! concrete routing objects. Each implementation renders a [`RoutingSpec`]
//! into its own spec type and exposes the status fields the resolver reads.

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use outpost_core::gateway::{
    HTTPBackendRef, HTTPPathMatch, HTTPRouteMatch, HTTPRouteRule, PATH_MATCH_PREFIX,
};
use outpost_core::{ExposureMode, HTTPRoute, HTTPRouteSpec, ObjectKey};
use outpost_store::StoredObject;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::builder::{RouteRule, RoutingSpec};
use crate::desired::BackendPort;

/// Ingress path type matching on a path prefix.
pub const INGRESS_PATH_PREFIX: &str = "Prefix";

/// One load-balancer entry from a routing object's status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerEntry {
    /// DNS name, if the load balancer reports one.
    pub hostname: Option<String>,
    /// IP address, if the load balancer reports one.
    pub ip: Option<String>,
}

/// A routing object the engine can manage.
pub trait RoutingKind: StoredObject {
    /// The concrete spec type.
    type Spec: Serialize + DeserializeOwned + Clone + PartialEq + Send + 'static;

    /// Exposure mode this kind implements.
    const MODE: ExposureMode;

    /// Render the kind-neutral spec.
    fn render(spec: &RoutingSpec) -> Self::Spec;

    /// Replace the object's spec.
    fn set_spec(&mut self, spec: Self::Spec);

    /// Hostname set explicitly on the spec.
    fn explicit_hostname(&self) -> Option<String>;

    /// Parent object whose status carries this object's addresses.
    fn parent_ref(&self) -> Option<ObjectKey>;

    /// Load-balancer entries from the object's own status.
    fn load_balancer(&self) -> Vec<LoadBalancerEntry>;
}

fn ingress_path(rule: &RouteRule) -> HTTPIngressPath {
    let port = match &rule.backend.port {
        BackendPort::Number(n) => ServiceBackendPort {
            number: Some(*n),
            name: None,
        },
        BackendPort::Name(name) => ServiceBackendPort {
            number: None,
            name: Some(name.clone()),
        },
    };

    HTTPIngressPath {
        path: Some(rule.path_prefix.clone()),
        path_type: INGRESS_PATH_PREFIX.to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: rule.backend.service.clone(),
                port: Some(port),
            }),
            resource: None,
        },
    }
}

impl RoutingKind for Ingress {
    type Spec = IngressSpec;

    const MODE: ExposureMode = ExposureMode::Ingress;

    fn render(spec: &RoutingSpec) -> IngressSpec {
        IngressSpec {
            rules: Some(vec![IngressRule {
                host: None,
                http: Some(HTTPIngressRuleValue {
                    paths: spec.rules.iter().map(ingress_path).collect(),
                }),
            }]),
            ..Default::default()
        }
    }

    fn set_spec(&mut self, spec: IngressSpec) {
        self.spec = Some(spec);
    }

    fn explicit_hostname(&self) -> Option<String> {
        None
    }

    fn parent_ref(&self) -> Option<ObjectKey> {
        None
    }

    fn load_balancer(&self) -> Vec<LoadBalancerEntry> {
        self.status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| LoadBalancerEntry {
                        hostname: e.hostname.clone(),
                        ip: e.ip.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn route_rule(rule: &RouteRule) -> HTTPRouteRule {
    let port = match &rule.backend.port {
        BackendPort::Number(n) => Some(*n),
        BackendPort::Name(_) => None,
    };

    HTTPRouteRule {
        matches: Some(vec![HTTPRouteMatch {
            path: Some(HTTPPathMatch {
                type_: Some(PATH_MATCH_PREFIX.to_string()),
                value: Some(rule.path_prefix.clone()),
            }),
            method: None,
        }]),
        backend_refs: Some(vec![HTTPBackendRef {
            name: rule.backend.service.clone(),
            namespace: Some(rule.backend.namespace.clone()),
            port,
            ..Default::default()
        }]),
        timeouts: None,
    }
}

impl RoutingKind for HTTPRoute {
    type Spec = HTTPRouteSpec;

    const MODE: ExposureMode = ExposureMode::Route;

    fn render(spec: &RoutingSpec) -> HTTPRouteSpec {
        HTTPRouteSpec {
            parent_refs: None,
            hostnames: None,
            rules: Some(spec.rules.iter().map(route_rule).collect()),
        }
    }

    fn set_spec(&mut self, spec: HTTPRouteSpec) {
        self.spec = spec;
    }

    fn explicit_hostname(&self) -> Option<String> {
        self.spec
            .hostnames
            .as_ref()
            .and_then(|hosts| hosts.first())
            .filter(|host| !host.is_empty())
            .cloned()
    }

    fn parent_ref(&self) -> Option<ObjectKey> {
        let parent = self.first_parent()?;
        let namespace = parent
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or(self.metadata.namespace.as_deref())?;
        Some(ObjectKey::new(namespace, parent.name.clone()))
    }

    fn load_balancer(&self) -> Vec<LoadBalancerEntry> {
        Vec::new()
    }
}
