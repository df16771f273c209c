//! In-memory storage implementation.
//!
//! Objects are kept CBOR-encoded, keyed by kind, namespace and name, so the
//! store holds any [`StoredObject`] kind behind a single map. An upsert runs
//! entirely under one lock, which makes it a single logical operation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::object::StoredObject;
use crate::{Applied, ObjectStore, Operation};

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<Vec<u8>, Vec<u8>>,
    writes: usize,
    fail_gets: Option<String>,
    fail_writes: Option<String>,
}

/// A store that keeps objects in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an object as-is, as an external controller would.
    ///
    /// Seeding is not counted as a write.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no name or cannot be encoded.
    pub fn seed<K: StoredObject>(&self, object: &K) -> Result<()> {
        let key = Self::key_of(object)?;
        let bytes = Self::serialize(object)?;
        self.inner.lock().objects.insert(key, bytes);
        Ok(())
    }

    /// Read an object without going through the async trait.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes cannot be decoded.
    pub fn peek<K: StoredObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let key = keys::object_key(&K::kind_name(), namespace, name);
        self.inner
            .lock()
            .objects
            .get(&key)
            .map(|bytes| Self::deserialize(bytes))
            .transpose()
    }

    /// Number of creates and updates performed through `create_or_update`.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }

    /// Number of stored objects of kind `K`.
    #[must_use]
    pub fn count<K: StoredObject>(&self) -> usize {
        let prefix = keys::kind_prefix(&K::kind_name());
        self.inner
            .lock()
            .objects
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .count()
    }

    /// Make every `get` fail with `StoreError::Unavailable` until cleared.
    pub fn fail_gets(&self, reason: Option<&str>) {
        self.inner.lock().fail_gets = reason.map(str::to_string);
    }

    /// Make every `create_or_update` fail with `StoreError::Unavailable` until cleared.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.inner.lock().fail_writes = reason.map(str::to_string);
    }

    fn key_of<K: StoredObject>(object: &K) -> Result<Vec<u8>> {
        let meta = object.meta();
        let name = meta
            .name
            .as_deref()
            .ok_or_else(|| StoreError::Serialization("object has no name".to_string()))?;
        let namespace = meta.namespace.as_deref().unwrap_or("default");
        Ok(keys::object_key(&K::kind_name(), namespace, name))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoredObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        if let Some(reason) = self.inner.lock().fail_gets.clone() {
            return Err(StoreError::Unavailable(reason));
        }
        self.peek(namespace, name)
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
        let key = keys::object_key(&K::kind_name(), namespace, name);
        let mut inner = self.inner.lock();

        if let Some(reason) = inner.fail_writes.clone() {
            return Err(StoreError::Unavailable(reason).into());
        }

        let current: Option<K> = inner
            .objects
            .get(&key)
            .map(|bytes| Self::deserialize(bytes))
            .transpose()?;

        let mut object = current.clone().unwrap_or_else(|| K::blank(namespace, name));
        mutate(&mut object)?;

        let operation = match &current {
            None => Operation::Created,
            Some(live) if *live != object => Operation::Updated,
            Some(_) => Operation::Unchanged,
        };

        if operation.is_mutation() {
            let bytes = Self::serialize(&object)?;
            inner.objects.insert(key, bytes);
            inner.writes += 1;
        }

        debug!(
            kind = %K::kind_name(),
            namespace,
            name,
            operation = ?operation,
            "Applied object in memory store"
        );

        Ok(Applied { object, operation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::networking::v1::{
        Ingress, IngressLoadBalancerIngress, IngressLoadBalancerStatus, IngressStatus,
    };
    use outpost_core::{Gateway, HTTPRoute};

    fn label(ingress: &mut Ingress, value: &str) -> std::result::Result<(), StoreError> {
        ingress
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert("app".to_string(), value.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn create_then_unchanged_then_update() {
        let store = MemoryStore::new();

        let first = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |i| label(i, "a"))
            .await
            .unwrap();
        assert_eq!(first.operation, Operation::Created);

        let second = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |i| label(i, "a"))
            .await
            .unwrap();
        assert_eq!(second.operation, Operation::Unchanged);

        let third = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |i| label(i, "b"))
            .await
            .unwrap();
        assert_eq!(third.operation, Operation::Updated);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() {
        let store = MemoryStore::new();

        let result = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |_| {
                Err(StoreError::Unavailable("rejected".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.write_count(), 0);
        assert!(store.peek::<Ingress>("ns", "web").unwrap().is_none());
    }

    #[tokio::test]
    async fn seeded_status_survives_upsert() {
        let store = MemoryStore::new();
        let mut ingress = Ingress::blank("ns", "web");
        ingress.status = Some(IngressStatus {
            load_balancer: Some(IngressLoadBalancerStatus {
                ingress: Some(vec![IngressLoadBalancerIngress {
                    ip: Some("10.0.0.1".to_string()),
                    ..Default::default()
                }]),
            }),
        });
        store.seed(&ingress).unwrap();

        let applied = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |i| label(i, "a"))
            .await
            .unwrap();

        assert_eq!(applied.operation, Operation::Updated);
        assert_eq!(applied.object.status, ingress.status);
    }

    #[tokio::test]
    async fn kinds_are_kept_apart() {
        let store = MemoryStore::new();
        store.seed(&HTTPRoute::blank("ns", "web")).unwrap();
        store.seed(&Gateway::blank("ns", "web")).unwrap();

        assert_eq!(store.count::<HTTPRoute>(), 1);
        assert_eq!(store.count::<Gateway>(), 1);
        assert_eq!(store.count::<Ingress>(), 0);
        assert!(store.get::<Ingress>("ns", "web").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryStore::new();

        store.fail_gets(Some("api server down"));
        let err = store.get::<Ingress>("ns", "web").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        store.fail_gets(None);
        assert!(store.get::<Ingress>("ns", "web").await.is_ok());

        store.fail_writes(Some("read-only"));
        let result = store
            .create_or_update::<Ingress, _, StoreError>("ns", "web", |i| label(i, "a"))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
