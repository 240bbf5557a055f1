use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for the batch controller
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Workload error: {message}")]
    Workload {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Job submission failed: {message}")]
    Submission {
        code: u16,
        message: String,
        job_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Pool operation failed: {message}")]
    Pool {
        code: u16,
        message: String,
        pool_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ControllerError {
    /// Create a configuration error with specific code and file path
    pub fn config_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a workload error with specific code
    pub fn workload(code: u16, message: impl Into<String>) -> Self {
        Self::Workload {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a submission error with specific code and job id
    pub fn submission(code: u16, message: impl Into<String>, job_id: Option<String>) -> Self {
        Self::Submission {
            code,
            message: message.into(),
            job_id,
            source: None,
        }
    }

    /// Create a pool error with specific code and pool id
    pub fn pool(code: u16, message: impl Into<String>, pool_id: Option<String>) -> Self {
        Self::Pool {
            code,
            message: message.into(),
            pool_id,
            source: None,
        }
    }

    /// Create a validation error with default code
    pub fn validation(message: impl Into<String>) -> Self {
        Self::validation_with_code(ErrorCode::VALIDATION_GENERIC, message, None)
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Workload { source: src, .. }
            | Self::Submission { source: src, .. }
            | Self::Pool { source: src, .. }
            | Self::Validation { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Workload { message, .. }
            | Self::Submission { message, .. }
            | Self::Pool { message, .. }
            | Self::Validation { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Attach the job id to a submission error
    pub fn with_job_id(mut self, id: impl Into<String>) -> Self {
        if let Self::Submission { job_id, .. } = &mut self {
            *job_id = Some(id.into());
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Workload { .. } => 3,
            Self::Submission { .. } => 4,
            Self::Pool { .. } => 5,
            Self::Validation { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Workload { code, .. }
            | Self::Submission { code, .. }
            | Self::Pool { code, .. }
            | Self::Validation { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, path, .. } => match path {
                Some(p) => format!("Configuration problem in {}: {}", p.display(), message),
                None => format!("Configuration problem: {}", message),
            },
            Self::Workload { message, .. } => format!("Cannot build the task graph: {}", message),
            Self::Submission {
                message, job_id, ..
            } => match job_id {
                Some(id) => format!("Submitting job '{}' failed: {}", id, message),
                None => format!("Job submission failed: {}", message),
            },
            Self::Pool {
                message, pool_id, ..
            } => match pool_id {
                Some(id) => format!("Pool '{}': {}", id, message),
                None => format!("Pool error: {}", message),
            },
            Self::Validation { message, field, .. } => match field {
                Some(f) => format!("Validation error for '{}': {}", f, message),
                None => format!("Validation error: {}", message),
            },
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Workload, configuration and validation errors depend only on input
    /// and are never retryable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Submission { code, .. } | Self::Pool { code, .. }
                if *code == ErrorCode::SUBMIT_TRANSPORT
        )
    }
}

/// Type alias for Results using ControllerError
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Type alias for application Results (using anyhow for flexibility)
pub type AppResult<T> = anyhow::Result<T>;

impl From<serde_yaml::Error> for ControllerError {
    fn from(err: serde_yaml::Error) -> Self {
        ControllerError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax", None)
            .with_source(err)
    }
}

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        ControllerError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid JSON syntax", None)
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadError;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yml");
        let err = ControllerError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            "Cannot read configuration",
            Some(PathBuf::from("/etc/batch-controller/config.yml")),
        )
        .with_source(io_err)
        .with_context("while starting");

        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("[E1001]"));
        assert!(err.to_string().contains("while starting"));
        assert!(err.user_message().contains("/etc/batch-controller/config.yml"));
    }

    #[test]
    fn test_workload_error_conversion() {
        let err: ControllerError = WorkloadError::invalid_partition("5 tasks exceed 3 work items").into();

        assert!(matches!(err, ControllerError::Workload { .. }));
        assert_eq!(err.code(), ErrorCode::WORKLOAD_INVALID_PARTITION);
        assert_eq!(err.exit_code(), 3);
        assert!(!err.is_transient());
        assert!(err.to_string().contains("[E2001]"));
    }

    #[test]
    fn test_submission_ids_and_transience() {
        let err = ControllerError::submission(ErrorCode::SUBMIT_TRANSPORT, "connection reset", None)
            .with_job_id("azfinsim-1");

        assert!(err.is_transient());
        assert!(err.user_message().contains("azfinsim-1"));

        let pool = ControllerError::pool(
            ErrorCode::POOL_NOT_FOUND,
            "missing",
            Some("trame-pool".to_string()),
        );
        assert!(!pool.is_transient());
        assert_eq!(pool.exit_code(), 5);
        assert_eq!(pool.user_message(), "Pool 'trame-pool': missing");
    }
}
