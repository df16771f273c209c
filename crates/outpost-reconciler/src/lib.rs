//! Exposure reconciliation for outpost descriptors.
//!
//! This crate turns an [`Outpost`](outpost_core::Outpost) into a converged
//! Ingress or HTTPRoute and reports the descriptor's admin URL. It handles:
//!
//! - Desired-state validation and routing spec construction
//! - Override merging with unknown-field detection
//! - Idempotent upserts carrying ownership and inherited labels
//! - Admin URL resolution over late, partial statuses
//! - A three-way stage signal for the caller's retry loop
//!
//! # Architecture
//!
//! ```text
//! Outpost ──▶ DesiredState ──▶ build ──▶ render ──▶ merge
//!                                                    │
//!                                                    ▼
//!                                  ObjectStore::create_or_update
//!                                                    │
//!                                                    ▼
//!              StageResult ◀── report ◀── resolve (object, Gateway)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use outpost_core::Outpost;
//! use outpost_reconciler::{Reconciler, ReconcilerConfig, StageReconciler};
//! use outpost_store::KubeStore;
//!
//! # async fn example(mut outpost: Outpost) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(KubeStore::try_default().await?);
//! let reconciler = Reconciler::try_new(store, ReconcilerConfig::from_env())?;
//!
//! let result = reconciler.reconcile(&mut outpost).await;
//! if !result.is_terminal() {
//!     // requeue
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod converge;
pub mod desired;
pub mod error;
pub mod kind;
pub mod merge;
pub mod reconciler;
pub mod resolver;
pub mod stage;

pub use builder::{build, Backend, RouteDefaults, RouteRule, RoutingSpec};
pub use config::ReconcilerConfig;
pub use converge::{converge, set_controller_reference, Converged};
pub use desired::{BackendPort, DesiredState};
pub use error::{MergeError, ReconcileError, Result};
pub use kind::{LoadBalancerEntry, RoutingKind};
pub use merge::merge;
pub use reconciler::{Reconciler, StageReconciler};
pub use resolver::{resolve, resolve_host, HostSource, Resolution};
pub use stage::{report, StageResult, EXPOSE_STAGE};
