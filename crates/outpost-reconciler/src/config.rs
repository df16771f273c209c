//! Reconciler configuration.

use std::time::Duration;

use outpost_core::ExposureMode;
use serde::{Deserialize, Serialize};

use crate::builder::RouteDefaults;
use crate::error::{ReconcileError, Result};

/// Configuration for the exposure reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Suffix appended to the descriptor name for managed Ingresses.
    pub ingress_suffix: String,
    /// Suffix appended to the descriptor name for managed HTTPRoutes.
    pub route_suffix: String,
    /// Path prefix routed to the service.
    pub default_path: String,
    /// Upper bound on a single store call, in seconds.
    pub store_timeout_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            ingress_suffix: "-ingress".to_string(),
            route_suffix: "-route".to_string(),
            default_path: "/".to_string(),
            store_timeout_secs: 30,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `OUTPOST_INGRESS_SUFFIX`: name suffix for managed Ingresses
    /// - `OUTPOST_ROUTE_SUFFIX`: name suffix for managed HTTPRoutes
    /// - `OUTPOST_DEFAULT_PATH`: routed path prefix
    /// - `OUTPOST_STORE_TIMEOUT_SECS`: store call deadline
    ///
    /// Unparseable numbers keep their default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("OUTPOST_INGRESS_SUFFIX") {
            config.ingress_suffix = val;
        }
        if let Ok(val) = std::env::var("OUTPOST_ROUTE_SUFFIX") {
            config.route_suffix = val;
        }
        if let Ok(val) = std::env::var("OUTPOST_DEFAULT_PATH") {
            config.default_path = val;
        }
        if let Ok(val) = std::env::var("OUTPOST_STORE_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                config.store_timeout_secs = n;
            }
        }

        config
    }

    /// Check that the configuration can produce valid objects.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Config` for an empty or colliding suffix,
    /// a path without a leading `/`, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.ingress_suffix.is_empty() || self.route_suffix.is_empty() {
            return Err(ReconcileError::Config("name suffixes must not be empty".into()));
        }
        if self.ingress_suffix == self.route_suffix {
            return Err(ReconcileError::Config(format!(
                "ingress and route suffixes collide: {}",
                self.ingress_suffix
            )));
        }
        if !self.default_path.starts_with('/') {
            return Err(ReconcileError::Config(format!(
                "default path must start with '/': {}",
                self.default_path
            )));
        }
        if self.store_timeout_secs == 0 {
            return Err(ReconcileError::Config("store timeout must be positive".into()));
        }
        Ok(())
    }

    /// Name suffix of the routing object for `mode`.
    #[must_use]
    pub fn suffix_for(&self, mode: ExposureMode) -> &str {
        match mode {
            ExposureMode::Ingress => &self.ingress_suffix,
            ExposureMode::Route => &self.route_suffix,
        }
    }

    /// Deadline applied to each store call.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Builder defaults derived from this configuration.
    #[must_use]
    pub fn defaults(&self) -> RouteDefaults {
        RouteDefaults {
            path: self.default_path.clone(),
        }
    }
}
