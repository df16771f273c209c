//! Admin URL resolution.
//!
//! Statuses are filled in by external controllers, possibly late and
//! possibly partially. The resolver walks an ordered list of host candidates
//! and takes the first that yields something. It keeps no state between
//! calls.

use std::time::Duration;

use outpost_core::Gateway;
use outpost_store::{within, ObjectStore};
use tracing::debug;

use crate::error::Result;
use crate::kind::RoutingKind;

/// Where a resolved host came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    /// Hostname set on the routing object's spec.
    ExplicitHostname,
    /// Address bound to the parent Gateway.
    ParentAddress,
    /// Hostname reported by the load balancer.
    LoadBalancerHostname,
    /// IP reported by the load balancer.
    LoadBalancerIp,
}

/// The outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved URL, if any host was found.
    pub url: Option<String>,
    /// Number of addresses observed on statuses.
    pub addresses: usize,
    /// Candidate that produced the host.
    pub source: Option<HostSource>,
}

impl Resolution {
    /// Whether any address has been observed.
    #[must_use]
    pub const fn has_addresses(&self) -> bool {
        self.addresses > 0
    }
}

type Candidate<'a> = &'a dyn Fn() -> Option<(String, HostSource)>;

fn first_non_empty<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick a host for `object`, given its parent Gateway if it has one.
#[must_use]
pub fn resolve_host<K: RoutingKind>(
    object: &K,
    parent: Option<&Gateway>,
) -> Option<(String, HostSource)> {
    let entries = object.load_balancer();

    let explicit = || object.explicit_hostname().map(|h| (h, HostSource::ExplicitHostname));
    let gateway = || {
        parent
            .and_then(|g| first_non_empty(g.addresses().iter().map(|a| Some(a.value.as_str()))))
            .map(|h| (h, HostSource::ParentAddress))
    };
    let lb_hostname = || {
        first_non_empty(entries.iter().map(|e| e.hostname.as_deref()))
            .map(|h| (h, HostSource::LoadBalancerHostname))
    };
    let lb_ip = || {
        first_non_empty(entries.iter().map(|e| e.ip.as_deref()))
            .map(|h| (h, HostSource::LoadBalancerIp))
    };

    let candidates: [Candidate<'_>; 4] = [&explicit, &gateway, &lb_hostname, &lb_ip];
    candidates.iter().find_map(|candidate| candidate())
}

/// Resolve the admin URL of `object`.
///
/// For kinds with a parent, the parent Gateway is read from `store` on every
/// call. A missing Gateway contributes nothing.
///
/// # Errors
///
/// Returns `ReconcileError::Store` when the Gateway lookup fails or times out.
pub async fn resolve<K, S>(store: &S, object: &K, timeout: Duration) -> Result<Resolution>
where
    K: RoutingKind,
    S: ObjectStore,
{
    let parent = match object.parent_ref() {
        Some(key) => {
            let gateway = within(timeout, store.get::<Gateway>(key.namespace(), key.name())).await?;
            if gateway.is_none() {
                debug!(gateway = %key, "Parent gateway not found");
            }
            gateway
        }
        None => None,
    };

    let addresses =
        object.load_balancer().len() + parent.as_ref().map_or(0, |g| g.addresses().len());

    let resolution = match resolve_host(object, parent.as_ref()) {
        Some((host, source)) => Resolution {
            url: Some(format!("http://{host}")),
            addresses,
            source: Some(source),
        },
        None => Resolution {
            url: None,
            addresses,
            source: None,
        },
    };

    debug!(
        kind = %K::MODE,
        url = ?resolution.url,
        addresses = resolution.addresses,
        "Resolved admin URL"
    );
    Ok(resolution)
}
