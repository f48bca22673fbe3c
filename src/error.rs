//! Error types
//!
//! The tick itself never fails; these cover grid selection on a degenerate
//! arena and loading/validating tuning data.

use thiserror::Error;

/// Grid queries that need at least one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has no cells ({width}x{height})")]
    Empty { width: i32, height: i32 },
}

/// Tuning load and validation failures
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl TuningError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
