//! Kubernetes-backed storage implementation.
//!
//! Upserts are a read followed by a create or a replace. The replace carries
//! the `resourceVersion` that was read, so a concurrent writer makes the API
//! server reject the call with a conflict instead of silently losing an
//! update; a concurrent create is rejected as already existing. Either way
//! the error surfaces and the caller retries on its next reconcile.

use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::object::StoredObject;
use crate::{Applied, ObjectStore, Operation};

/// Field manager recorded on objects written by this store.
pub const FIELD_MANAGER: &str = "outpost";

/// A store backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store using in-cluster config or the local kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes client cannot be created.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Create a store with a pre-configured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoredObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoredObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn create_or_update<K, F, E>(
        &self,
        namespace: &str,
        name: &str,
        mutate: F,
    ) -> std::result::Result<Applied<K>, E>
    where
        K: StoredObject,
        F: FnOnce(&mut K) -> std::result::Result<(), E> + Send,
        E: From<StoreError> + Send,
    {
        let api = self.api::<K>(namespace);
        let current = api.get_opt(name).await.map_err(StoreError::from)?;

        let Some(live) = current else {
            let mut object = K::blank(namespace, name);
            mutate(&mut object)?;
            let created = api
                .create(&Self::post_params(), &object)
                .await
                .map_err(StoreError::from)?;
            info!(kind = %K::kind_name(), namespace, name, "Created object");
            return Ok(Applied {
                object: created,
                operation: Operation::Created,
            });
        };

        let mut object = live.clone();
        mutate(&mut object)?;

        if object == live {
            debug!(kind = %K::kind_name(), namespace, name, "Object already up to date");
            return Ok(Applied {
                object: live,
                operation: Operation::Unchanged,
            });
        }

        let updated = api
            .replace(name, &Self::post_params(), &object)
            .await
            .map_err(StoreError::from)?;
        info!(kind = %K::kind_name(), namespace, name, "Updated object");

        Ok(Applied {
            object: updated,
            operation: Operation::Updated,
        })
    }
}
