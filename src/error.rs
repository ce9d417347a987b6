// src/error.rs

//! Error taxonomy of the presentation engine.
//!
//! - Structural faults: the unit list or a unit's internal bookkeeping is
//!   inconsistent. The current show-list is aborted.
//! - Parameter faults: a unit is configured in a way it cannot be shown
//!   correctly. The current show-list is aborted, the process carries on.
//! - Surface and wait failures from the external collaborators.
//!
//! Timing anomalies (overruns) and buffer allocation failures are not errors:
//! they are absorbed and logged by the timing loop.

use crate::params::ParamError;
use crate::surface::SurfaceError;
use crate::timing::WaitError;
use crate::unit::OverlayKind;
use thiserror::Error;

/// Internal-consistency violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralFault {
    #[error("unit '{unit}' declares {timing_elements} timing elements for {groups} timing groups")]
    GroupCountMismatch {
        unit: String,
        groups: usize,
        timing_elements: usize,
    },
    #[error("unit '{unit}' with overlay {kind:?} cannot start a show-list")]
    OverlayFirst { unit: String, kind: OverlayKind },
    #[error("list-overlay unit '{unit}' must not be computed as late as possible")]
    LateListOverlay { unit: String },
    #[error("unit '{unit}' used before create_instance")]
    NotInstantiated { unit: String },
    #[error("unit '{unit}' tags timing group {index}, the limit is {limit}")]
    TooManyGroups {
        unit: String,
        index: usize,
        limit: usize,
    },
    #[error("timing group {index} of unit '{unit}' references group {reference}, which is not earlier")]
    BadReference {
        unit: String,
        index: usize,
        reference: usize,
    },
}

/// Errors surfaced by the presentation engine.
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("structural fault: {0}")]
    Structural(#[from] StructuralFault),
    #[error("parameter fault in unit '{unit}': {reason}")]
    Parameter { unit: String, reason: String },
    #[error("parameter lookup failed in unit '{unit}': {source}")]
    Lookup {
        unit: String,
        #[source]
        source: ParamError,
    },
    #[error("surface failure: {0}")]
    Surface(#[from] SurfaceError),
    #[error("timing wait failed: {0}")]
    Wait(#[from] WaitError),
    #[error("worker '{name}' failed: {reason}")]
    Worker { name: &'static str, reason: String },
}

impl PresentationError {
    pub fn lookup(unit: &str, source: ParamError) -> Self {
        PresentationError::Lookup {
            unit: unit.to_string(),
            source,
        }
    }

    pub fn parameter(unit: &str, reason: impl Into<String>) -> Self {
        PresentationError::Parameter {
            unit: unit.to_string(),
            reason: reason.into(),
        }
    }

    /// Structural faults abort the show-list and indicate a bug in the caller's
    /// unit list or a stimulus implementation.
    pub fn is_structural(&self) -> bool {
        matches!(self, PresentationError::Structural(_))
    }
}

pub type Result<T, E = PresentationError> = std::result::Result<T, E>;
