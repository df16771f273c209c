//! Routing object convergence.
//!
//! One call computes the desired spec, merges the user override, and pushes
//! the result through a single [`ObjectStore::create_or_update`]. The store
//! only writes when the mutated object differs from the live one, so a
//! converged object is left alone.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use outpost_core::condition::{remove_condition, set_condition};
use outpost_core::{Condition, ConditionStatus, OverrideMetadata, INVALID_MERGE};
use outpost_store::{within, ObjectStore, Operation};
use tracing::{debug, info, warn};

use crate::builder::build;
use crate::config::ReconcilerConfig;
use crate::desired::DesiredState;
use crate::error::{ReconcileError, Result};
use crate::kind::RoutingKind;
use crate::merge::merge;

/// The outcome of [`converge`].
#[derive(Debug, Clone)]
pub struct Converged<K> {
    /// The routing object as persisted.
    pub object: K,
    /// What the store did.
    pub operation: Operation,
    /// Whether the store was written.
    pub mutated: bool,
}

/// Make `owner` the controller of `object`.
///
/// An existing reference to the same owner is refreshed in place.
///
/// # Errors
///
/// Returns `ReconcileError::Ownership` when the owner is unknown or another
/// object already controls `object`.
pub fn set_controller_reference<K: Resource>(
    object: &mut K,
    owner: Option<&OwnerReference>,
) -> Result<()> {
    let owner = owner.ok_or_else(|| {
        ReconcileError::Ownership("descriptor has no uid to own the routing object".to_string())
    })?;

    let object_name = object.meta().name.clone().unwrap_or_default();
    let refs = object
        .meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(ReconcileError::Ownership(format!(
            "{object_name} is already controlled by {} {}",
            other.kind, other.name
        )));
    }

    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) => *existing = owner.clone(),
        None => refs.push(owner.clone()),
    }
    Ok(())
}

fn insert_all(target: &mut Option<BTreeMap<String, String>>, entries: &BTreeMap<String, String>) {
    if entries.is_empty() {
        return;
    }
    let map = target.get_or_insert_with(BTreeMap::new);
    for (key, value) in entries {
        map.insert(key.clone(), value.clone());
    }
}

/// Copy override labels and annotations onto `object`.
pub fn apply_override_metadata<K: Resource>(object: &mut K, metadata: Option<&OverrideMetadata>) {
    let Some(metadata) = metadata else {
        return;
    };
    let meta = object.meta_mut();
    insert_all(&mut meta.labels, &metadata.labels);
    insert_all(&mut meta.annotations, &metadata.annotations);
}

/// Copy the descriptor's labels onto `object`, keeping foreign labels.
pub fn apply_inherited_labels<K: Resource>(object: &mut K, labels: &BTreeMap<String, String>) {
    insert_all(&mut object.meta_mut().labels, labels);
}

/// Converge the routing object of kind `K` for `desired`.
///
/// Records or clears the `InvalidMerge` condition in `conditions`. A failed
/// merge returns before the store is touched.
///
/// # Errors
///
/// Returns `ReconcileError::Merge` for an unusable override,
/// `ReconcileError::Ownership` when the object cannot be owned, and
/// `ReconcileError::Store` for backend failures and timeouts.
pub async fn converge<K, S>(
    store: &S,
    desired: &DesiredState,
    config: &ReconcilerConfig,
    conditions: &mut Vec<Condition>,
) -> Result<Converged<K>>
where
    K: RoutingKind,
    S: ObjectStore,
{
    let key = desired.routing_key(config.suffix_for(K::MODE));
    let computed = K::render(&build(desired, &config.defaults()));

    let spec = match merge(computed, desired.spec_override()) {
        Ok(spec) => {
            if remove_condition(conditions, INVALID_MERGE) {
                debug!(key = %key, "Cleared merge condition");
            }
            spec
        }
        Err(e) => {
            warn!(kind = %K::MODE, key = %key, error = %e, "Override merge failed");
            set_condition(
                conditions,
                Condition::new(
                    INVALID_MERGE,
                    ConditionStatus::True,
                    format!("Invalid{}Override", K::MODE.kind()),
                    e.to_string(),
                )
                .with_generation(desired.generation),
            );
            return Err(e.into());
        }
    };

    let owner = desired.owner.clone();
    let metadata = desired.overrides.as_ref().and_then(|o| o.metadata.clone());
    let labels = desired.labels.clone();

    let applied = within(
        config.store_timeout(),
        store.create_or_update::<K, _, ReconcileError>(key.namespace(), key.name(), move |object| {
            object.set_spec(spec);
            set_controller_reference(object, owner.as_ref())?;
            apply_override_metadata(object, metadata.as_ref());
            apply_inherited_labels(object, &labels);
            Ok(())
        }),
    )
    .await?;

    let mutated = applied.operation.is_mutation();
    info!(
        kind = %K::MODE,
        namespace = key.namespace(),
        name = %applied.object.name_any(),
        operation = ?applied.operation,
        mutated,
        "Converged routing object"
    );

    Ok(Converged {
        object: applied.object,
        operation: applied.operation,
        mutated,
    })
}
