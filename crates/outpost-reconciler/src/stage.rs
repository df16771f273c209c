//! Stage outcomes.

use outpost_core::{ExposureMode, StageStatus};

use crate::error::ReconcileError;
use crate::resolver::Resolution;

/// Name recorded on the descriptor for the exposure stage.
pub const EXPOSE_STAGE: &str = "Expose";

/// The outcome of one stage run.
#[derive(Debug)]
pub struct StageResult {
    /// Progress signal for the caller's retry loop.
    pub status: StageStatus,
    /// Why the stage did not succeed.
    pub error: Option<ReconcileError>,
}

impl StageResult {
    /// A converged stage.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: StageStatus::Success,
            error: None,
        }
    }

    /// A stage waiting on external infrastructure.
    #[must_use]
    pub const fn in_progress(error: ReconcileError) -> Self {
        Self {
            status: StageStatus::InProgress,
            error: Some(error),
        }
    }

    /// A failed stage.
    #[must_use]
    pub const fn failed(error: ReconcileError) -> Self {
        Self {
            status: StageStatus::Failed,
            error: Some(error),
        }
    }

    /// Whether the caller can stop re-invoking this stage.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Map a resolution outcome to a stage result.
///
/// `None` means the resolver was not consulted because the exposure is not
/// the preferred one.
#[must_use]
pub fn report(mode: ExposureMode, resolution: Option<&Resolution>) -> StageResult {
    match resolution {
        None => StageResult::success(),
        Some(r) if !r.has_addresses() => StageResult::in_progress(ReconcileError::NotReady(mode)),
        Some(Resolution { url: None, .. }) => {
            StageResult::failed(ReconcileError::IncompleteSpec(mode))
        }
        Some(_) => StageResult::success(),
    }
}
