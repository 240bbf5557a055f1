use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::{BatchError, BatchResult};
use super::models::PoolInfo;
use super::{JobHandle, JobSubmissionAdapter, PoolController};
use crate::workload::{TaskDescriptor, TaskId};

/// One call that crossed the service boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCall {
    CreateJob {
        pool_id: String,
        job_id: String,
        uses_task_dependencies: bool,
    },
    AddTasks {
        job_id: String,
        task_ids: Vec<TaskId>,
    },
    SetCompletionPolicy {
        job_id: String,
        terminate_on_all_complete: bool,
    },
    TerminateJob {
        job_id: String,
    },
    Resize {
        pool_id: String,
        target_size: u32,
    },
    Describe {
        pool_id: String,
    },
}

#[derive(Default)]
struct MockState {
    call_history: Vec<BatchCall>,
    jobs: HashMap<String, Vec<TaskDescriptor>>,
    pools: HashMap<String, PoolInfo>,
    rejected_tasks: HashSet<TaskId>,
    terminated_jobs: HashSet<String>,
    refuse_termination: bool,
    unreachable: bool,
}

/// In-memory batch service that records every call.
#[derive(Clone, Default)]
pub struct MockBatchService {
    state: Arc<Mutex<MockState>>,
}

impl MockBatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool so that `describe` and `resize` can find it.
    pub fn with_pool(self, pool_id: &str) -> Self {
        self.lock().pools.insert(
            pool_id.to_string(),
            PoolInfo {
                id: pool_id.to_string(),
                state: "active".to_string(),
                allocation_state: "steady".to_string(),
                dedicated_count: 0,
                low_priority_count: 0,
            },
        );
        self
    }

    /// Pretend a job with this id already exists.
    pub fn with_existing_job(self, job_id: &str) -> Self {
        self.lock().jobs.insert(job_id.to_string(), Vec::new());
        self
    }

    /// Make the service refuse the given task when it is added.
    pub fn reject_task(self, task_id: &str) -> Self {
        self.lock().rejected_tasks.insert(TaskId::from(task_id));
        self
    }

    /// Make `terminate_job` fail with a rejection.
    pub fn refuse_termination(self) -> Self {
        self.lock().refuse_termination = true;
        self
    }

    /// Fail every call with a transport error.
    pub fn unreachable(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    pub fn get_call_history(&self) -> Vec<BatchCall> {
        self.lock().call_history.clone()
    }

    pub fn job_tasks(&self, job_id: &str) -> Option<Vec<TaskDescriptor>> {
        self.lock().jobs.get(job_id).cloned()
    }

    pub fn is_terminated(&self, job_id: &str) -> bool {
        self.lock().terminated_jobs.contains(job_id)
    }

    pub fn pool(&self, pool_id: &str) -> Option<PoolInfo> {
        self.lock().pools.get(pool_id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: BatchCall) -> BatchResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.call_history.push(call);
        if state.unreachable {
            return Err(BatchError::Transport("connection refused".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl JobSubmissionAdapter for MockBatchService {
    async fn create_job(
        &self,
        pool_id: &str,
        job_id: &str,
        uses_task_dependencies: bool,
    ) -> BatchResult<JobHandle> {
        let mut state = self.record(BatchCall::CreateJob {
            pool_id: pool_id.to_string(),
            job_id: job_id.to_string(),
            uses_task_dependencies,
        })?;

        if state.jobs.contains_key(job_id) {
            return Err(BatchError::JobExists(job_id.to_string()));
        }
        state.jobs.insert(job_id.to_string(), Vec::new());

        Ok(JobHandle {
            job_id: job_id.to_string(),
            pool_id: pool_id.to_string(),
        })
    }

    async fn add_tasks(&self, job: &JobHandle, tasks: &[TaskDescriptor]) -> BatchResult<()> {
        let mut state = self.record(BatchCall::AddTasks {
            job_id: job.job_id.clone(),
            task_ids: tasks.iter().map(|t| t.id.clone()).collect(),
        })?;

        let rejected: Vec<String> = tasks
            .iter()
            .filter(|t| state.rejected_tasks.contains(&t.id))
            .map(|t| t.id.to_string())
            .collect();

        let accepted: Vec<TaskDescriptor> = tasks
            .iter()
            .filter(|t| !state.rejected_tasks.contains(&t.id))
            .cloned()
            .collect();

        let job_tasks = state
            .jobs
            .get_mut(&job.job_id)
            .ok_or_else(|| BatchError::NotFound(format!("job {}", job.job_id)))?;
        job_tasks.extend(accepted);

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(BatchError::TasksRejected {
                job_id: job.job_id.clone(),
                failed: rejected.len(),
                total: tasks.len(),
                details: rejected.join("; "),
            })
        }
    }

    async fn set_completion_policy(
        &self,
        job: &JobHandle,
        terminate_on_all_complete: bool,
    ) -> BatchResult<()> {
        let state = self.record(BatchCall::SetCompletionPolicy {
            job_id: job.job_id.clone(),
            terminate_on_all_complete,
        })?;

        if !state.jobs.contains_key(&job.job_id) {
            return Err(BatchError::NotFound(format!("job {}", job.job_id)));
        }
        Ok(())
    }

    async fn terminate_job(&self, job: &JobHandle, _reason: &str) -> BatchResult<()> {
        let mut state = self.record(BatchCall::TerminateJob {
            job_id: job.job_id.clone(),
        })?;

        if !state.jobs.contains_key(&job.job_id) {
            return Err(BatchError::NotFound(format!("job {}", job.job_id)));
        }
        if state.refuse_termination {
            return Err(BatchError::Rejected {
                status: 409,
                message: format!("job {} is being deleted", job.job_id),
            });
        }
        state.terminated_jobs.insert(job.job_id.clone());
        Ok(())
    }
}

#[async_trait]
impl PoolController for MockBatchService {
    async fn resize(&self, pool_id: &str, target_size: u32) -> BatchResult<()> {
        let mut state = self.record(BatchCall::Resize {
            pool_id: pool_id.to_string(),
            target_size,
        })?;

        let pool = state
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| BatchError::NotFound(format!("pool {}", pool_id)))?;
        pool.dedicated_count = target_size;
        pool.allocation_state = "resizing".to_string();
        Ok(())
    }

    async fn describe(&self, pool_id: &str) -> BatchResult<PoolInfo> {
        let state = self.record(BatchCall::Describe {
            pool_id: pool_id.to_string(),
        })?;

        state
            .pools
            .get(pool_id)
            .cloned()
            .ok_or_else(|| BatchError::NotFound(format!("pool {}", pool_id)))
    }
}
