//! Subcommand implementations

pub mod pool;
pub mod submit;

pub use pool::run_pool_command;
pub use submit::{build_job_request, run_submit_command, JobRequest};
