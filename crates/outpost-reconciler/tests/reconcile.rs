//! End-to-end exposure reconciliation against the in-memory store.
//!
//! Run with:
//!   cargo test -p outpost-reconciler --test reconcile

use std::sync::Arc;

use k8s_openapi::api::networking::v1::{
    Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressStatus,
};
use kube::api::ObjectMeta;
use outpost_core::condition::find_condition;
use outpost_core::gateway::GatewayStatusAddress;
use outpost_core::{
    ConditionStatus, ExposeSpec, ExposureMode, Gateway, GatewayStatus, HTTPRoute, ObjectOverride,
    Outpost, OutpostSpec, ServiceRef, StageStatus, TargetPort, INVALID_MERGE,
};
use outpost_reconciler::{
    merge, ReconcileError, Reconciler, ReconcilerConfig, StageReconciler,
};
use outpost_store::{MemoryStore, StoredObject};
use serde_json::json;

// =============================================================================
// Fixtures
// =============================================================================

fn outpost(mode: ExposureMode, override_spec: Option<serde_json::Value>) -> Outpost {
    let mut outpost = Outpost::new(
        "grafana",
        OutpostSpec {
            expose: Some(ExposeSpec {
                mode,
                service: ServiceRef {
                    name: "grafana-service".to_string(),
                    namespace: None,
                },
                port: TargetPort::Number(3000),
                preferred: true,
                overrides: override_spec.map(|spec| ObjectOverride {
                    metadata: None,
                    spec: Some(spec),
                }),
            }),
        },
    );
    outpost.metadata = ObjectMeta {
        name: Some("grafana".to_string()),
        namespace: Some("monitoring".to_string()),
        uid: Some("9d3c2b1a-0000-4000-8000-00000000beef".to_string()),
        generation: Some(1),
        labels: Some([("app".to_string(), "grafana".to_string())].into()),
        ..Default::default()
    };
    outpost
}

fn lb_ip(ip: &str) -> IngressLoadBalancerIngress {
    IngressLoadBalancerIngress {
        ip: Some(ip.to_string()),
        ..Default::default()
    }
}

fn lb_hostname(hostname: &str) -> IngressLoadBalancerIngress {
    IngressLoadBalancerIngress {
        hostname: Some(hostname.to_string()),
        ..Default::default()
    }
}

/// Seed the Ingress as a load balancer controller would have left it.
fn seed_ingress_status(store: &MemoryStore, entries: Vec<IngressLoadBalancerIngress>) {
    let mut ingress = Ingress::blank("monitoring", "grafana-ingress");
    ingress.status = Some(IngressStatus {
        load_balancer: Some(IngressLoadBalancerStatus {
            ingress: Some(entries),
        }),
    });
    store.seed(&ingress).unwrap();
}

fn setup() -> (Arc<MemoryStore>, Reconciler<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let reconciler = Reconciler::try_new(Arc::clone(&store), ReconcilerConfig::default()).unwrap();
    (store, reconciler)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn builds_single_rule_single_backend() {
    let (store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Ingress, None);

    reconciler.reconcile(&mut descriptor).await;

    let ingress = store
        .peek::<Ingress>("monitoring", "grafana-ingress")
        .unwrap()
        .unwrap();
    let rules = ingress.spec.unwrap().rules.unwrap();
    assert_eq!(rules.len(), 1);
    let paths = &rules[0].http.as_ref().unwrap().paths;
    assert_eq!(paths.len(), 1);
    let service = paths[0].backend.service.as_ref().unwrap();
    assert_eq!(service.name, "grafana-service");
    assert_eq!(service.port.as_ref().unwrap().number, Some(3000));
}

#[tokio::test]
async fn second_reconcile_writes_nothing() {
    let (store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Ingress, Some(json!({"ingressClassName": "nginx"})));

    reconciler.reconcile(&mut descriptor).await;
    let writes = store.write_count();
    assert_eq!(writes, 1);

    reconciler.reconcile(&mut descriptor).await;
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn hostname_preferred_over_ip() {
    let (store, reconciler) = setup();
    seed_ingress_status(&store, vec![lb_ip("10.0.0.1"), lb_hostname("lb.example.com")]);
    let mut descriptor = outpost(ExposureMode::Ingress, None);

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::Success);
    assert_eq!(descriptor.admin_url(), Some("http://lb.example.com"));
}

#[tokio::test]
async fn empty_load_balancer_is_in_progress() {
    let (store, reconciler) = setup();
    seed_ingress_status(&store, Vec::new());
    let mut descriptor = outpost(ExposureMode::Ingress, None);
    descriptor.status_or_default().admin_url = Some("http://previous.example.com".to_string());

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::InProgress);
    let error = result.error.unwrap();
    assert!(matches!(error, ReconcileError::NotReady(ExposureMode::Ingress)));
    assert!(!error.to_string().is_empty());
    assert_eq!(descriptor.admin_url(), Some("http://previous.example.com"));
}

#[tokio::test]
async fn ip_only_load_balancer_succeeds() {
    let (store, reconciler) = setup();
    seed_ingress_status(&store, vec![lb_ip("10.0.0.1")]);
    let mut descriptor = outpost(ExposureMode::Ingress, None);

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::Success);
    assert!(result.error.is_none());
    assert_eq!(descriptor.admin_url(), Some("http://10.0.0.1"));
}

#[tokio::test]
async fn unknown_override_field_fails_without_upsert() {
    let (store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Ingress, Some(json!({"notAField": "value"})));

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::Failed);
    assert!(matches!(result.error, Some(ReconcileError::Merge(_))));
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.count::<Ingress>(), 0);

    let status = descriptor.status.as_ref().unwrap();
    let condition = find_condition(&status.conditions, INVALID_MERGE).unwrap();
    assert_eq!(condition.status, ConditionStatus::True);
    assert!(condition.message.contains("notAField"));
}

#[tokio::test]
async fn invalid_override_keeps_converged_object() {
    let (store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Ingress, None);
    reconciler.reconcile(&mut descriptor).await;

    let before = store.peek::<Ingress>("monitoring", "grafana-ingress").unwrap();
    assert!(before.is_some());
    let writes = store.write_count();

    if let Some(expose) = descriptor.spec.expose.as_mut() {
        expose.overrides = Some(ObjectOverride {
            metadata: None,
            spec: Some(json!({"notAField": {}})),
        });
    }
    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::Failed);
    assert!(matches!(result.error, Some(ReconcileError::Merge(_))));
    assert_eq!(store.peek::<Ingress>("monitoring", "grafana-ingress").unwrap(), before);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn fixed_override_clears_merge_condition() {
    let (_store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Ingress, Some(json!({"notAField": "value"})));
    reconciler.reconcile(&mut descriptor).await;

    if let Some(expose) = descriptor.spec.expose.as_mut() {
        expose.overrides = None;
    }
    reconciler.reconcile(&mut descriptor).await;

    let status = descriptor.status.as_ref().unwrap();
    assert!(find_condition(&status.conditions, INVALID_MERGE).is_none());
}

#[tokio::test]
async fn route_resolves_through_gateway() {
    let (store, reconciler) = setup();
    let mut gateway = Gateway::blank("gateways", "public");
    gateway.status = Some(GatewayStatus {
        addresses: Some(vec![GatewayStatusAddress {
            type_: Some("Hostname".to_string()),
            value: "public.example.com".to_string(),
        }]),
    });
    store.seed(&gateway).unwrap();

    let mut descriptor = outpost(
        ExposureMode::Route,
        Some(json!({"parentRefs": [{"name": "public", "namespace": "gateways"}]})),
    );

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::Success);
    assert_eq!(descriptor.admin_url(), Some("http://public.example.com"));

    let route = store
        .peek::<HTTPRoute>("monitoring", "grafana-route")
        .unwrap()
        .unwrap();
    let rules = route.spec.rules.unwrap();
    assert_eq!(rules.len(), 1);
    let backends = rules[0].backend_refs.as_ref().unwrap();
    assert_eq!(backends[0].port, Some(3000));
    assert_eq!(store.count::<Gateway>(), 1);
}

#[tokio::test]
async fn route_second_reconcile_writes_nothing() {
    let (store, reconciler) = setup();
    let mut descriptor = outpost(
        ExposureMode::Route,
        Some(json!({"parentRefs": [{"name": "public", "namespace": "gateways"}]})),
    );

    reconciler.reconcile(&mut descriptor).await;
    let writes = store.write_count();
    assert_eq!(writes, 1);
    let first = store.peek::<HTTPRoute>("monitoring", "grafana-route").unwrap();

    reconciler.reconcile(&mut descriptor).await;
    assert_eq!(store.write_count(), writes);
    assert_eq!(store.peek::<HTTPRoute>("monitoring", "grafana-route").unwrap(), first);
}

#[tokio::test]
async fn route_without_gateway_is_in_progress() {
    let (_store, reconciler) = setup();
    let mut descriptor = outpost(ExposureMode::Route, None);

    let result = reconciler.reconcile(&mut descriptor).await;

    assert_eq!(result.status, StageStatus::InProgress);
    assert!(descriptor.admin_url().is_none());
}

#[test]
fn merge_is_idempotent_for_route_specs() {
    let fragment = json!({"hostnames": ["grafana.example.com"]});
    let base = outpost_core::HTTPRouteSpec::default();

    let once = merge(base.clone(), Some(&fragment)).unwrap();
    let twice = merge(once.clone(), Some(&fragment)).unwrap();
    assert_eq!(once, twice);
    assert_eq!(merge(base.clone(), None).unwrap(), base);
}
