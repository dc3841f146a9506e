//! Error types for schedule generation and classification

use crate::operation::StepKey;
use thiserror::Error;

/// Schedule errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Operation code outside the vocabulary
    #[error("unknown operation kind: {0:?}")]
    UnknownOperationKind(char),

    /// Precedence edges do not form a DAG
    #[error("cyclic constraint set involving step {0}")]
    CyclicConstraintSet(StepKey),

    /// Schedule is missing a step, repeats one, or has incomplete compute parameters
    #[error("malformed schedule: {0}")]
    MalformedSchedule(String),

    /// Attempt bound reached without a matching candidate
    #[error("schedule search exhausted after {attempts} attempts")]
    SearchExhausted {
        /// Total candidates drawn across all restarts
        attempts: usize,
    },

    /// Threshold table or value range is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for schedule operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;
