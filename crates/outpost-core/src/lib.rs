//! Core resource types for outpost.
//!
//! This crate provides the foundational types shared by the store and the
//! reconciler:
//!
//! - **Descriptor**: the [`Outpost`] custom resource and its status
//! - **Gateway API**: the [`HTTPRoute`] and [`Gateway`] resources the engine reads and writes
//! - **Conditions**: status conditions and the helpers that maintain them
//! - **Keys**: namespaced object identities
//!
//! # Example
//!
//! ```
//! use outpost_core::{ExposeSpec, ExposureMode, ObjectKey, Outpost, OutpostSpec, ServiceRef, TargetPort};
//!
//! let outpost = Outpost::new(
//!     "grafana",
//!     OutpostSpec {
//!         expose: Some(ExposeSpec {
//!             mode: ExposureMode::Ingress,
//!             service: ServiceRef { name: "grafana-service".into(), namespace: None },
//!             port: TargetPort::Number(3000),
//!             preferred: true,
//!             overrides: None,
//!         }),
//!     },
//! );
//!
//! let key = ObjectKey::new("monitoring", "grafana").child("-ingress");
//! assert_eq!(key.to_string(), "monitoring/grafana-ingress");
//! # let _ = outpost;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod condition;
pub mod error;
pub mod gateway;
pub mod key;
pub mod outpost;

pub use condition::{Condition, ConditionStatus, INVALID_MERGE};
pub use error::{CoreError, Result};
pub use gateway::{Gateway, GatewaySpec, GatewayStatus, HTTPRoute, HTTPRouteSpec};
pub use key::ObjectKey;
pub use outpost::{
    ExposeSpec, ExposureMode, ObjectOverride, OverrideMetadata, Outpost, OutpostSpec,
    OutpostStatus, ServiceRef, StageStatus, TargetPort,
};
