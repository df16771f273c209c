//! Object store abstraction for outpost.
//!
//! The reconciler never talks to the cluster API directly. It reads and
//! upserts typed objects through the [`ObjectStore`] trait, which has two
//! implementations:
//!
//! - [`KubeStore`]: typed `kube::Api` calls against a live cluster
//! - [`MemoryStore`]: CBOR-encoded objects in memory, with failure injection
//!   and write counting for tests and dry runs
//!
//! # Example
//!
//! ```
//! use k8s_openapi::api::networking::v1::Ingress;
//! use outpost_store::{MemoryStore, ObjectStore, Operation, StoreError};
//!
//! # async fn example() -> Result<(), StoreError> {
//! let store = MemoryStore::new();
//!
//! let applied = store
//!     .create_or_update::<Ingress, _, StoreError>("monitoring", "grafana-ingress", |ingress| {
//!         ingress.metadata.labels = Some([("app".to_string(), "grafana".to_string())].into());
//!         Ok(())
//!     })
//!     .await?;
//! assert_eq!(applied.operation, Operation::Created);
//!
//! let fetched: Option<Ingress> = store.get("monitoring", "grafana-ingress").await?;
//! assert!(fetched.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cluster;
pub mod error;
pub mod keys;
pub mod memory;
pub mod object;

pub use cluster::KubeStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use object::StoredObject;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

/// What an upsert did to the stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// The object did not exist and was created.
    Created,
    /// The object existed and differed from the mutated copy.
    Updated,
    /// The mutated copy equalled the live object; nothing was written.
    Unchanged,
}

impl Operation {
    /// Whether the store was written.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

/// The outcome of [`ObjectStore::create_or_update`].
#[derive(Debug, Clone)]
pub struct Applied<K> {
    /// The object as persisted (or as found, when unchanged).
    pub object: K,
    /// What the store did.
    pub operation: Operation,
}

/// The storage trait for typed, namespaced objects.
///
/// Implementations must make `create_or_update` a single logical operation
/// for a given identity: two concurrent calls never both create the object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get an object by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails. A missing object is
    /// `Ok(None)`, not an error.
    async fn get<K: StoredObject>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Fetch the object (or start from a blank one), apply `mutate`, and
    /// persist the result if it differs from what is stored.
    ///
    /// Nothing is written when `mutate` fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `mutate`, or a backend error converted into `E`.
    async fn create_or_update<K, F, E>(
        &self,
        namespace: &str,
        name: &str,
        mutate: F,
    ) -> std::result::Result<Applied<K>, E>
    where
        K: StoredObject,
        F: FnOnce(&mut K) -> std::result::Result<(), E> + Send,
        E: From<StoreError> + Send;
}

/// Run a store call under a deadline.
///
/// # Errors
///
/// Returns `StoreError::Timeout` (converted into `E`) when `limit` elapses
/// first, otherwise whatever the call returned.
pub async fn within<T, E, Fut>(limit: Duration, call: Fut) -> std::result::Result<T, E>
where
    Fut: Future<Output = std::result::Result<T, E>>,
    E: From<StoreError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit).into()),
    }
}
