//! Integration tests for the submission boundary using the in-memory service

use batch_controller::batch::{
    prepare_job, submit_job, BatchCall, BatchError, JobSubmissionAdapter, MockBatchService,
};
use batch_controller::error::{ControllerError, ErrorCode};
use batch_controller::workload::pipelines::{self, StagingPath};
use batch_controller::workload::{
    Algorithm, ContainerSettings, JobDescriptor, JobFamily, StageConfig, TaskId, TaskSpecBuilder,
    WorkRange,
};
use std::collections::HashSet;

fn workflow_job(adapter: &dyn JobSubmissionAdapter) -> JobDescriptor {
    let config = StageConfig::pricing(Algorithm::DeltaVega, 0.0).unwrap();
    let graph = pipelines::filesystem_workflow(
        WorkRange::new(0, 1000),
        4,
        &config,
        ContainerSettings::new("acr.io/azfinsim:latest", ""),
        &StagingPath::new("/mnt/data", "azfinsim"),
    )
    .unwrap();
    prepare_job(adapter, JobFamily::WorkflowFs, "azfinsim-pool", graph).unwrap()
}

#[tokio::test]
async fn test_calls_arrive_in_order() {
    let mock = MockBatchService::new();
    let job = workflow_job(&mock);
    let handle = submit_job(&mock, &job).await.unwrap();

    assert_eq!(handle.job_id, job.id);
    assert_eq!(handle.pool_id, "azfinsim-pool");

    let history = mock.get_call_history();
    assert_eq!(
        history,
        vec![
            BatchCall::CreateJob {
                pool_id: "azfinsim-pool".to_string(),
                job_id: job.id.clone(),
                uses_task_dependencies: true,
            },
            BatchCall::AddTasks {
                job_id: job.id.clone(),
                task_ids: job.tasks.iter().map(|t| t.id.clone()).collect(),
            },
            BatchCall::SetCompletionPolicy {
                job_id: job.id.clone(),
                terminate_on_all_complete: true,
            },
        ]
    );
    assert_eq!(mock.job_tasks(&job.id).unwrap(), job.tasks);
}

#[tokio::test]
async fn test_invalid_job_never_reaches_the_service() {
    let mock = MockBatchService::new();
    let mut job = workflow_job(&mock);
    job.tasks.swap(0, 1);

    let err = submit_job(&mock, &job).await.unwrap_err();
    assert!(matches!(err, BatchError::InvalidJob(_)));
    assert!(mock.get_call_history().is_empty());

    let err = ControllerError::from(err);
    assert_eq!(err.code(), ErrorCode::WORKLOAD_INVALID_GRAPH);
}

#[tokio::test]
async fn test_rejected_tasks_terminate_job() {
    let mock = MockBatchService::new().reject_task("price-2");
    let job = workflow_job(&mock);

    let err = submit_job(&mock, &job).await.unwrap_err();
    assert!(matches!(err, BatchError::TasksRejected { failed: 1, .. }));

    let history = mock.get_call_history();
    assert!(!history
        .iter()
        .any(|c| matches!(c, BatchCall::SetCompletionPolicy { .. })));
    assert_eq!(
        history.last(),
        Some(&BatchCall::TerminateJob {
            job_id: job.id.clone()
        })
    );
    assert!(mock.is_terminated(&job.id));
}

#[tokio::test]
async fn test_failed_cleanup_keeps_original_error() {
    let mock = MockBatchService::new()
        .reject_task("price-0")
        .refuse_termination();
    let job = workflow_job(&mock);

    let err = submit_job(&mock, &job).await.unwrap_err();
    assert!(matches!(err, BatchError::TasksRejected { .. }));
    assert!(mock
        .get_call_history()
        .iter()
        .any(|c| matches!(c, BatchCall::TerminateJob { .. })));
    assert!(!mock.is_terminated(&job.id));
}

#[tokio::test]
async fn test_existing_job_id_is_reported() {
    let mock = MockBatchService::new();
    let job = workflow_job(&mock);
    let mock = mock.with_existing_job(&job.id);

    let err = ControllerError::from(submit_job(&mock, &job).await.unwrap_err());
    assert_eq!(err.code(), ErrorCode::SUBMIT_JOB_EXISTS);
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_job_without_dependencies() {
    let mock = MockBatchService::new();
    let builder = TaskSpecBuilder::new(ContainerSettings::default());
    let graph = pipelines::cache_population(WorkRange::new(0, 100), 5, &builder).unwrap();
    let job = prepare_job(&mock, JobFamily::Cache, "azfinsim-pool", graph).unwrap();

    assert!(job.id.starts_with("cache-"));
    submit_job(&mock, &job).await.unwrap();
    assert!(matches!(
        mock.get_call_history()[0],
        BatchCall::CreateJob {
            uses_task_dependencies: false,
            ..
        }
    ));
}

#[test]
fn test_rapid_submissions_get_distinct_ids() {
    let mock = MockBatchService::new();
    let ids: HashSet<String> = (0..500)
        .map(|_| mock.generate_job_id(JobFamily::Azfinsim))
        .collect();
    assert_eq!(ids.len(), 500);
    assert!(ids.iter().all(|id| id.starts_with("azfinsim-")));
}

#[test]
fn test_submission_through_blocking_runtime() {
    let mock = MockBatchService::new();
    let job = workflow_job(&mock);
    let handle = tokio_test::block_on(submit_job(&mock, &job)).unwrap();
    assert_eq!(handle.job_id, job.id);
    assert!(job.task("merge-0").is_some());
    assert_eq!(
        job.task("merge-0").unwrap().dependencies,
        (0..4).map(|i| TaskId::for_stage("price", i)).collect::<Vec<_>>()
    );
}
