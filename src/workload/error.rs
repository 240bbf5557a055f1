//! Error types for task-graph construction

use crate::error::{ControllerError, ErrorCode};
use thiserror::Error;

/// Result type for workload and graph operations
pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// Errors raised while partitioning work or wiring stages together.
///
/// Every variant is deterministic and depends only on the input, so none of
/// them is worth retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkloadError {
    #[error("Invalid partition: {reason}")]
    InvalidPartition { reason: String },

    #[error(
        "Stage '{stage}' needs one upstream task per task: it has {stage_tasks} tasks \
         but '{upstream}' has {upstream_tasks}"
    )]
    DependencyArityMismatch {
        stage: String,
        stage_tasks: usize,
        upstream: String,
        upstream_tasks: usize,
    },

    #[error("Unsupported parameter for algorithm '{algorithm}': {reason}")]
    UnsupportedAlgorithmParameter { algorithm: String, reason: String },

    #[error("Failure probability must be within [0.0, 1.0], got {0}")]
    InvalidFailureProbability(f64),

    #[error("Stage '{stage}' depends on '{upstream}', which has not been placed")]
    UnknownStage { stage: String, upstream: String },

    #[error("Stage '{0}' is declared more than once")]
    DuplicateStage(String),

    #[error("Stage '{0}' produced no tasks")]
    EmptyStage(String),

    #[error("Workflow has no stages")]
    EmptyWorkflow,

    #[error("Task '{task}' has an invalid dependency on '{dependency}'")]
    InvalidDependency { task: String, dependency: String },

    #[error("Task id '{0}' appears more than once")]
    DuplicateTaskId(String),
}

impl WorkloadError {
    pub fn invalid_partition(reason: impl Into<String>) -> Self {
        Self::InvalidPartition {
            reason: reason.into(),
        }
    }
}

/// Convert WorkloadError to ControllerError
impl From<WorkloadError> for ControllerError {
    fn from(err: WorkloadError) -> Self {
        let code = match &err {
            WorkloadError::InvalidPartition { .. } => ErrorCode::WORKLOAD_INVALID_PARTITION,
            WorkloadError::DependencyArityMismatch { .. } => ErrorCode::WORKLOAD_ARITY_MISMATCH,
            WorkloadError::UnsupportedAlgorithmParameter { .. } => {
                ErrorCode::WORKLOAD_UNSUPPORTED_PARAMETER
            }
            WorkloadError::InvalidFailureProbability(_) => ErrorCode::WORKLOAD_INVALID_PROBABILITY,
            WorkloadError::UnknownStage { .. } => ErrorCode::WORKLOAD_UNKNOWN_STAGE,
            WorkloadError::DuplicateStage(_) => ErrorCode::WORKLOAD_DUPLICATE_STAGE,
            WorkloadError::EmptyStage(_) | WorkloadError::EmptyWorkflow => {
                ErrorCode::WORKLOAD_EMPTY
            }
            WorkloadError::InvalidDependency { .. } | WorkloadError::DuplicateTaskId(_) => {
                ErrorCode::WORKLOAD_INVALID_GRAPH
            }
        };

        ControllerError::workload(code, err.to_string()).with_source(err)
    }
}
