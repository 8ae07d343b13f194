//! Multi-step orchestration on top of the endpoint wrappers

pub mod space;

pub use space::{diff_access, AccessDiff, DesiredSpace, SpaceController, SpaceTransition};

use crate::api::ApiError;
use std::fmt;
use thiserror::Error;

/// What happened to a partially created object after a later step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    NotAttempted,
    Succeeded,
    Failed(String),
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::NotAttempted => f.write_str("no rollback needed"),
            RollbackOutcome::Succeeded => f.write_str("rolled back"),
            RollbackOutcome::Failed(e) => write!(f, "rollback failed: {e}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{step} failed: {source} ({rollback})")]
    Api {
        step: &'static str,
        #[source]
        source: ApiError,
        rollback: RollbackOutcome,
    },

    #[error("cancelled before {step} ({rollback})")]
    Cancelled {
        step: String,
        rollback: RollbackOutcome,
    },

    #[error("space {0} has deletion_protection enabled; disable it before destroying")]
    DeletionProtected(String),
}

impl ControllerError {
    pub(crate) fn api(step: &'static str, source: ApiError) -> Self {
        ControllerError::Api {
            step,
            source,
            rollback: RollbackOutcome::NotAttempted,
        }
    }

    pub(crate) fn cancelled(step: &str) -> Self {
        ControllerError::Cancelled {
            step: step.to_string(),
            rollback: RollbackOutcome::NotAttempted,
        }
    }

    pub(crate) fn with_rollback(self, outcome: RollbackOutcome) -> Self {
        match self {
            ControllerError::Api { step, source, .. } => ControllerError::Api {
                step,
                source,
                rollback: outcome,
            },
            ControllerError::Cancelled { step, .. } => ControllerError::Cancelled {
                step,
                rollback: outcome,
            },
            other => other,
        }
    }

    /// What happened to a partially created object, if anything was created
    pub fn rollback(&self) -> Option<&RollbackOutcome> {
        match self {
            ControllerError::Api { rollback, .. } | ControllerError::Cancelled { rollback, .. } => {
                Some(rollback)
            }
            ControllerError::DeletionProtected(_) => None,
        }
    }

    /// The API error behind this failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ControllerError::Api { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }
}
