//! The `Outpost` descriptor CRD.
//!
//! An Outpost declares an in-cluster service that should be reachable from
//! outside the cluster, and how: through an Ingress or through a Gateway API
//! HTTPRoute. The engine reports the resulting admin URL back on its status.

use std::collections::BTreeMap;
use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Outpost describes the desired external exposure of a service.
///
/// Example:
/// ```yaml
/// apiVersion: outpost.dev/v1alpha1
/// kind: Outpost
/// metadata:
///   name: grafana
///   namespace: monitoring
/// spec:
///   expose:
///     mode: route
///     preferred: true
///     service:
///       name: grafana-service
///     port: 3000
///     override:
///       spec:
///         parentRefs:
///           - name: public
///             namespace: gateways
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "outpost.dev",
    version = "v1alpha1",
    kind = "Outpost",
    namespaced,
    status = "OutpostStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Mode","type":"string","jsonPath":".spec.expose.mode"}"#,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.adminUrl"}"#,
    printcolumn = r#"{"name":"Stage","type":"string","jsonPath":".status.stageStatus"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OutpostSpec {
    /// External exposure; when absent nothing is exposed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<ExposeSpec>,
}

/// How and what to expose.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposeSpec {
    /// Routing object kind to manage
    #[serde(default)]
    pub mode: ExposureMode,

    /// Service receiving the traffic
    pub service: ServiceRef,

    /// Service port, by number or by name
    pub port: TargetPort,

    /// Whether this exposure provides the descriptor's admin URL
    #[serde(default)]
    pub preferred: bool,

    /// Partial routing object merged over the computed one
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ObjectOverride>,
}

/// Ingress-style or route-style exposure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    /// A `networking.k8s.io/v1` Ingress.
    #[default]
    Ingress,
    /// A `gateway.networking.k8s.io/v1` HTTPRoute.
    Route,
}

impl ExposureMode {
    /// Kubernetes kind of the routing object for this mode.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ingress => "Ingress",
            Self::Route => "HTTPRoute",
        }
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Reference to the target service.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    /// Service name
    pub name: String,

    /// Service namespace; defaults to the descriptor namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A service port given by number or by name.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum TargetPort {
    /// Numeric port
    Number(i32),
    /// Named port
    Name(String),
}

impl fmt::Display for TargetPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// User-supplied partial routing object.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOverride {
    /// Labels and annotations added to the routing object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OverrideMetadata>,

    /// Raw spec fragment merged over the computed spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

/// Metadata carried by an override.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverrideMetadata {
    /// Extra labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Extra annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Progress of the last reconcile stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum StageStatus {
    /// The stage converged.
    Success,
    /// The stage is waiting on external infrastructure.
    InProgress,
    /// The stage failed and needs attention or a retry.
    Failed,
}

impl StageStatus {
    /// Whether the caller can stop re-invoking this stage.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Observed state written by the engine.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutpostStatus {
    /// Externally reachable admin URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Name of the last stage that ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    /// Result of the last stage that ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_status: Option<StageStatus>,
}

impl Outpost {
    /// Mutable access to the status, creating it when absent.
    pub fn status_or_default(&mut self) -> &mut OutpostStatus {
        self.status.get_or_insert_with(OutpostStatus::default)
    }

    /// The current admin URL, if any.
    #[must_use]
    pub fn admin_url(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.admin_url.as_deref())
    }
}
