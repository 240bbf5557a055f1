//! Boundary to the remote batch compute service
//!
//! The controller core only ever talks to the service through the two traits
//! defined here. [`rest::BatchRestClient`] implements them over HTTP and
//! [`mock::MockBatchService`] records calls in memory for tests.

pub mod error;
pub mod job_id;
pub mod mock;
pub mod models;
pub mod rest;

pub use error::{BatchError, BatchResult};
pub use job_id::next_job_id;
pub use mock::{BatchCall, MockBatchService};
pub use models::PoolInfo;
pub use rest::BatchRestClient;

use crate::workload::{JobDescriptor, JobFamily, TaskDescriptor, TaskGraph, WorkloadResult};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Reference to a job that exists on the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub job_id: String,
    pub pool_id: String,
}

/// Creates jobs, enqueues their tasks and installs completion policies.
#[async_trait]
pub trait JobSubmissionAdapter: Send + Sync {
    /// Fresh job id for `family`; must not repeat within this process.
    fn generate_job_id(&self, family: JobFamily) -> String {
        next_job_id(family)
    }

    async fn create_job(
        &self,
        pool_id: &str,
        job_id: &str,
        uses_task_dependencies: bool,
    ) -> BatchResult<JobHandle>;

    async fn add_tasks(&self, job: &JobHandle, tasks: &[TaskDescriptor]) -> BatchResult<()>;

    async fn set_completion_policy(
        &self,
        job: &JobHandle,
        terminate_on_all_complete: bool,
    ) -> BatchResult<()>;

    /// Stop a job and its remaining tasks.
    async fn terminate_job(&self, job: &JobHandle, reason: &str) -> BatchResult<()>;
}

/// Resizes and inspects compute pools.
#[async_trait]
pub trait PoolController: Send + Sync {
    async fn resize(&self, pool_id: &str, target_size: u32) -> BatchResult<()>;

    async fn describe(&self, pool_id: &str) -> BatchResult<PoolInfo>;
}

/// Name a wired graph with a fresh id from `adapter` and validate it.
pub fn prepare_job(
    adapter: &dyn JobSubmissionAdapter,
    family: JobFamily,
    pool_id: &str,
    graph: TaskGraph,
) -> WorkloadResult<JobDescriptor> {
    let job_id = adapter.generate_job_id(family);
    JobDescriptor::new(job_id, pool_id, family, graph)
}

/// Submit a fully built job.
///
/// The task list is validated before the first call crosses the boundary.
/// The completion policy goes in last so the job cannot terminate before its
/// tasks have been enqueued. A job whose tasks could not all be added is
/// terminated before the error is returned.
pub async fn submit_job(
    adapter: &dyn JobSubmissionAdapter,
    job: &JobDescriptor,
) -> BatchResult<JobHandle> {
    job.validate()?;

    debug!(
        job_id = %job.id,
        pool_id = %job.pool_id,
        tasks = job.tasks.len(),
        "Creating job"
    );
    let handle = adapter
        .create_job(&job.pool_id, &job.id, job.uses_task_dependencies())
        .await?;

    if let Err(e) = adapter.add_tasks(&handle, &job.tasks).await {
        warn!(job_id = %handle.job_id, error = %e, "Adding tasks failed, terminating job");
        if let Err(cleanup) = adapter
            .terminate_job(&handle, "tasks could not be added")
            .await
        {
            warn!(job_id = %handle.job_id, error = %cleanup, "Failed to terminate job");
        }
        return Err(e);
    }
    adapter
        .set_completion_policy(&handle, job.on_all_tasks_complete.terminates())
        .await?;

    info!(
        job_id = %handle.job_id,
        pool_id = %handle.pool_id,
        tasks = job.tasks.len(),
        "Submitted job"
    );
    Ok(handle)
}
