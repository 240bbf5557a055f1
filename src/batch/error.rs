//! Error types for the batch service boundary

use crate::error::{ControllerError, ErrorCode};
use crate::workload::WorkloadError;
use thiserror::Error;

/// Result type for batch service operations
pub type BatchResult<T> = Result<T, BatchError>;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Job {0} already exists")]
    JobExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No access token configured for the batch service")]
    MissingCredentials,

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{failed} of {total} tasks were not added to job {job_id}: {details}")]
    TasksRejected {
        job_id: String,
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("Job is not valid for submission: {0}")]
    InvalidJob(#[from] WorkloadError),
}

impl BatchError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    fn code(&self) -> u16 {
        match self {
            BatchError::JobExists(_) => ErrorCode::SUBMIT_JOB_EXISTS,
            BatchError::NotFound(_) => ErrorCode::SUBMIT_NOT_FOUND,
            BatchError::MissingCredentials | BatchError::Unauthorized(_) => {
                ErrorCode::SUBMIT_UNAUTHORIZED
            }
            BatchError::Rejected { .. } => ErrorCode::SUBMIT_REJECTED,
            BatchError::Transport(_) => ErrorCode::SUBMIT_TRANSPORT,
            BatchError::TasksRejected { .. } => ErrorCode::SUBMIT_TASK_FAILED,
            BatchError::InvalidJob(_) => ErrorCode::WORKLOAD_INVALID_GRAPH,
        }
    }

    /// Convert into a pool-category error for `pool_id`.
    pub fn into_pool_error(self, pool_id: &str) -> ControllerError {
        let code = match &self {
            BatchError::NotFound(_) => ErrorCode::POOL_NOT_FOUND,
            BatchError::Rejected { .. } => ErrorCode::POOL_RESIZE_FAILED,
            other => other.code(),
        };
        ControllerError::pool(code, self.to_string(), Some(pool_id.to_string())).with_source(self)
    }
}

/// Convert BatchError to ControllerError
impl From<BatchError> for ControllerError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::InvalidJob(inner) => ControllerError::from(inner),
            other => {
                let job_id = match &other {
                    BatchError::JobExists(id) => Some(id.clone()),
                    BatchError::TasksRejected { job_id, .. } => Some(job_id.clone()),
                    _ => None,
                };
                ControllerError::submission(other.code(), other.to_string(), job_id)
                    .with_source(other)
            }
        }
    }
}
