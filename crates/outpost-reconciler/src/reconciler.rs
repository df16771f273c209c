//! Stage reconciler entry point.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use outpost_core::{Condition, ExposureMode, HTTPRoute, Outpost, StageStatus};
use outpost_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::converge::converge;
use crate::desired::DesiredState;
use crate::error::Result;
use crate::kind::RoutingKind;
use crate::resolver::{resolve, Resolution};
use crate::stage::{report, StageResult, EXPOSE_STAGE};

/// One stage of descriptor reconciliation.
///
/// The caller invokes `reconcile` until the result is terminal. At most one
/// reconcile runs per descriptor at a time.
#[async_trait]
pub trait StageReconciler: Send + Sync {
    /// Stage name recorded on the descriptor status.
    fn name(&self) -> &'static str;

    /// Run the stage against `outpost`, updating its in-memory status.
    async fn reconcile(&self, outpost: &mut Outpost) -> StageResult;
}

/// Converges a descriptor's routing object and resolves its admin URL.
pub struct Reconciler<S> {
    store: Arc<S>,
    config: ReconcilerConfig,
}

impl<S: ObjectStore> Reconciler<S> {
    /// Create a reconciler over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    /// Create a reconciler after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Config` if the configuration is invalid.
    pub fn try_new(store: Arc<S>, config: ReconcilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store, config))
    }

    async fn expose<K: RoutingKind>(
        &self,
        desired: &DesiredState,
        conditions: &mut Vec<Condition>,
    ) -> Result<Option<Resolution>> {
        let converged = converge::<K, S>(&*self.store, desired, &self.config, conditions).await?;

        if !desired.preferred {
            debug!(key = %desired.descriptor, "Exposure not preferred, skipping URL resolution");
            return Ok(None);
        }

        let resolution = resolve(&*self.store, &converged.object, self.config.store_timeout()).await?;
        Ok(Some(resolution))
    }
}

#[async_trait]
impl<S: ObjectStore> StageReconciler for Reconciler<S> {
    fn name(&self) -> &'static str {
        EXPOSE_STAGE
    }

    async fn reconcile(&self, outpost: &mut Outpost) -> StageResult {
        let namespace = outpost.namespace().unwrap_or_default();
        let name = outpost.name_any();

        let result = match DesiredState::from_outpost(outpost) {
            Err(e) => StageResult::failed(e.into()),
            Ok(None) => {
                debug!(namespace = %namespace, name = %name, "No exposure requested");
                StageResult::success()
            }
            Ok(Some(desired)) => {
                let status = outpost.status_or_default();
                let outcome = match desired.mode {
                    ExposureMode::Ingress => {
                        self.expose::<Ingress>(&desired, &mut status.conditions).await
                    }
                    ExposureMode::Route => {
                        self.expose::<HTTPRoute>(&desired, &mut status.conditions).await
                    }
                };

                match outcome {
                    Err(e) => StageResult::failed(e),
                    Ok(resolution) => {
                        let result = report(desired.mode, resolution.as_ref());
                        if result.status == StageStatus::Success {
                            if let Some(url) = resolution.and_then(|r| r.url) {
                                status.admin_url = Some(url);
                            }
                        }
                        result
                    }
                }
            }
        };

        let status = outpost.status_or_default();
        status.stage = Some(EXPOSE_STAGE.to_string());
        status.stage_status = Some(result.status);

        match &result.error {
            None => info!(
                namespace = %namespace,
                name = %name,
                admin_url = ?status.admin_url,
                "Exposure stage succeeded"
            ),
            Some(e) if result.status == StageStatus::InProgress => {
                info!(namespace = %namespace, name = %name, reason = %e, "Exposure stage in progress");
            }
            Some(e) => warn!(
                namespace = %namespace,
                name = %name,
                error = %e,
                retriable = e.is_retriable(),
                "Exposure stage failed"
            ),
        }

        result
    }
}
