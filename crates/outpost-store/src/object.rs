//! Object kinds the store can hold.

use std::fmt::Debug;

use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ObjectMeta;
use kube::Resource;
use outpost_core::{Gateway, GatewaySpec, HTTPRoute, HTTPRouteSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A namespaced Kubernetes object the store can read and write.
pub trait StoredObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// A new, empty object with the given identity.
    fn blank(namespace: &str, name: &str) -> Self;

    /// The Kubernetes kind, used in store keys and logs.
    #[must_use]
    fn kind_name() -> String {
        Self::kind(&()).into_owned()
    }
}

fn identity(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

impl StoredObject for Ingress {
    fn blank(namespace: &str, name: &str) -> Self {
        Self {
            metadata: identity(namespace, name),
            ..Default::default()
        }
    }
}

impl StoredObject for HTTPRoute {
    fn blank(namespace: &str, name: &str) -> Self {
        let mut route = Self::new(name, HTTPRouteSpec::default());
        route.metadata = identity(namespace, name);
        route
    }
}

impl StoredObject for Gateway {
    fn blank(namespace: &str, name: &str) -> Self {
        let mut gateway = Self::new(name, GatewaySpec::default());
        gateway.metadata = identity(namespace, name);
        gateway
    }
}
