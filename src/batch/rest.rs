//! Batch service client over the REST API

use super::error::{BatchError, BatchResult};
use super::models::{
    completion_policy_name, JobAddParameter, JobPatchParameter, JobTerminateParameter, PoolInfo,
    PoolInformation, PoolResizeParameter, ServiceErrorBody, TaskAddCollectionParameter,
    TaskAddCollectionResult, TaskAddParameter,
};
use super::{JobHandle, JobSubmissionAdapter, PoolController};
use crate::workload::{CompletionPolicy, TaskDescriptor};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_VERSION: &str = "2024-07-01.20.0";

/// The service accepts at most this many tasks per collection request.
pub const MAX_TASKS_PER_REQUEST: usize = 100;

const ODATA_JSON: &str = "application/json; odata=minimalmetadata";

/// HTTP client for one batch account.
///
/// Authenticates with a bearer token obtained elsewhere (for example from
/// `az account get-access-token --resource https://batch.core.windows.net/`).
pub struct BatchRestClient {
    client: Client,
    endpoint: String,
    api_version: String,
    token: String,
}

impl BatchRestClient {
    pub fn new(
        endpoint: &str,
        api_version: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> BatchResult<Self> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(BatchError::MissingCredentials)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BatchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: normalize_endpoint(endpoint),
            api_version: api_version.into(),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.endpoint, path, self.api_version)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Request carrying `body` as the only content type the service accepts.
    fn json_request<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> BatchResult<RequestBuilder> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| BatchError::Transport(format!("Failed to encode request: {}", e)))?;
        Ok(self
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, ODATA_JSON)
            .body(bytes))
    }

    async fn add_chunk(&self, path: &str, chunk: &[TaskDescriptor]) -> BatchResult<Vec<String>> {
        let body = TaskAddCollectionParameter {
            value: chunk.iter().map(TaskAddParameter::from).collect(),
        };
        let response = self
            .send(self.json_request(Method::POST, path, &body)?, "add tasks")
            .await?;
        let result: TaskAddCollectionResult = response
            .json()
            .await
            .map_err(|e| BatchError::Transport(format!("Failed to parse response: {}", e)))?;

        Ok(result
            .value
            .into_iter()
            .filter(|r| !r.succeeded())
            .map(|r| match r.error {
                Some(error) => format!("{}: {}", r.task_id, error),
                None => format!("{}: {}", r.task_id, r.status),
            })
            .collect())
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> BatchResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| BatchError::Transport(format!("{} failed: {}", what, e)))?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response, what).await)
    }
}

/// Prefix a bare account host with `https://` and drop trailing slashes.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Combine per-task rejections with an error that stopped the remaining
/// chunks from being sent. `interrupted` carries the number of unsent tasks.
fn collect_rejections(
    job_id: &str,
    total: usize,
    mut failures: Vec<String>,
    interrupted: Option<(usize, BatchError)>,
) -> BatchResult<()> {
    let mut failed = failures.len();
    match interrupted {
        Some((_, err)) if failures.is_empty() => return Err(err),
        Some((unsent, err)) => {
            failures.push(format!("{} tasks not sent: {}", unsent, err));
            failed += unsent;
        }
        None if failures.is_empty() => return Ok(()),
        None => {}
    }

    warn!(job_id, failed, total, "Some tasks were not added");
    Err(BatchError::TasksRejected {
        job_id: job_id.to_string(),
        failed,
        total,
        details: failures.join("; "),
    })
}

async fn error_from_response(response: Response, what: &str) -> BatchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ServiceErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.to_string())
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            BatchError::Unauthorized(format!("{}: {}", what, detail))
        }
        StatusCode::NOT_FOUND => BatchError::NotFound(format!("{}: {}", what, detail)),
        status => BatchError::rejected(status.as_u16(), format!("{}: {}", what, detail)),
    }
}

#[async_trait]
impl JobSubmissionAdapter for BatchRestClient {
    async fn create_job(
        &self,
        pool_id: &str,
        job_id: &str,
        uses_task_dependencies: bool,
    ) -> BatchResult<JobHandle> {
        let body = JobAddParameter {
            id: job_id.to_string(),
            pool_info: PoolInformation {
                pool_id: pool_id.to_string(),
            },
            uses_task_dependencies,
            on_all_tasks_complete: completion_policy_name(CompletionPolicy::NoAction),
        };

        let request = self.json_request(Method::POST, "jobs", &body)?;
        match self.send(request, "create job").await {
            Ok(_) => {}
            Err(BatchError::Rejected { status: 409, .. }) => {
                return Err(BatchError::JobExists(job_id.to_string()))
            }
            Err(e) => return Err(e),
        }

        debug!(job_id, pool_id, uses_task_dependencies, "Created job");
        Ok(JobHandle {
            job_id: job_id.to_string(),
            pool_id: pool_id.to_string(),
        })
    }

    async fn add_tasks(&self, job: &JobHandle, tasks: &[TaskDescriptor]) -> BatchResult<()> {
        let path = format!("jobs/{}/addtaskcollection", job.job_id);
        let mut failures = Vec::new();
        let mut sent = 0;

        // Chunks go in task-list order, so dependencies are always enqueued
        // before their dependents.
        for chunk in tasks.chunks(MAX_TASKS_PER_REQUEST) {
            match self.add_chunk(&path, chunk).await {
                Ok(rejected) => failures.extend(rejected),
                Err(e) => {
                    let interrupted = Some((tasks.len() - sent, e));
                    return collect_rejections(&job.job_id, tasks.len(), failures, interrupted);
                }
            }
            sent += chunk.len();
            debug!(job_id = %job.job_id, count = chunk.len(), "Added task chunk");
        }

        collect_rejections(&job.job_id, tasks.len(), failures, None)
    }

    async fn set_completion_policy(
        &self,
        job: &JobHandle,
        terminate_on_all_complete: bool,
    ) -> BatchResult<()> {
        let policy = if terminate_on_all_complete {
            CompletionPolicy::TerminateJob
        } else {
            CompletionPolicy::NoAction
        };
        let body = JobPatchParameter {
            on_all_tasks_complete: completion_policy_name(policy),
        };
        let request =
            self.json_request(Method::PATCH, &format!("jobs/{}", job.job_id), &body)?;
        self.send(request, "update job").await?;
        Ok(())
    }

    async fn terminate_job(&self, job: &JobHandle, reason: &str) -> BatchResult<()> {
        let body = JobTerminateParameter {
            terminate_reason: reason.to_string(),
        };
        let path = format!("jobs/{}/terminate", job.job_id);
        self.send(self.json_request(Method::POST, &path, &body)?, "terminate job")
            .await?;
        debug!(job_id = %job.job_id, reason, "Terminated job");
        Ok(())
    }
}

#[async_trait]
impl PoolController for BatchRestClient {
    async fn resize(&self, pool_id: &str, target_size: u32) -> BatchResult<()> {
        let body = PoolResizeParameter {
            target_dedicated_nodes: target_size,
        };
        let request =
            self.json_request(Method::POST, &format!("pools/{}/resize", pool_id), &body)?;
        self.send(request, "resize pool").await?;
        debug!(pool_id, target_size, "Requested pool resize");
        Ok(())
    }

    async fn describe(&self, pool_id: &str) -> BatchResult<PoolInfo> {
        let request = self.client.get(self.url(&format!("pools/{}", pool_id)));
        let response = self.send(request, "get pool").await?;
        response
            .json()
            .await
            .map_err(|e| BatchError::Transport(format!("Failed to parse pool: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("mybatch.eastus.batch.azure.com"),
            "https://mybatch.eastus.batch.azure.com"
        );
        assert_eq!(
            normalize_endpoint("https://mybatch.eastus.batch.azure.com/"),
            "https://mybatch.eastus.batch.azure.com"
        );
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = BatchRestClient::new(
            "mybatch.eastus.batch.azure.com",
            DEFAULT_API_VERSION,
            Some("  ".to_string()),
            Duration::from_secs(30),
        )
        .err()
        .unwrap();
        assert!(matches!(err, BatchError::MissingCredentials));
    }

    fn client() -> BatchRestClient {
        BatchRestClient::new(
            "mybatch.eastus.batch.azure.com",
            DEFAULT_API_VERSION,
            Some("token".to_string()),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_body_requests_carry_one_content_type() {
        let client = client();
        let body = PoolResizeParameter {
            target_dedicated_nodes: 3,
        };
        let request = client
            .authorized(
                client
                    .json_request(Method::POST, "pools/azfinsim-pool/resize", &body)
                    .unwrap(),
            )
            .build()
            .unwrap();

        let content_types: Vec<_> = request.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(content_types[0], ODATA_JSON);
        assert!(request.headers().contains_key(reqwest::header::AUTHORIZATION));

        let sent: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({ "targetDedicatedNodes": 3 }));
    }

    #[test]
    fn test_rejections_survive_interrupted_upload() {
        let failures = vec!["price-2: TaskExists".to_string()];
        let interrupted = Some((50, BatchError::Transport("connection reset".to_string())));

        match collect_rejections("workflow-1", 250, failures, interrupted).unwrap_err() {
            BatchError::TasksRejected {
                failed,
                total,
                details,
                ..
            } => {
                assert_eq!(failed, 51);
                assert_eq!(total, 250);
                assert!(details.contains("price-2: TaskExists"));
                assert!(details.contains("50 tasks not sent"));
                assert!(details.contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_interruption_without_rejections_keeps_error() {
        let interrupted = Some((100, BatchError::Transport("timed out".to_string())));
        let err = collect_rejections("workflow-1", 100, Vec::new(), interrupted).unwrap_err();
        assert!(matches!(err, BatchError::Transport(_)));
        assert!(collect_rejections("workflow-1", 100, Vec::new(), None).is_ok());
    }

    #[test]
    fn test_url_building() {
        let client = BatchRestClient::new(
            "mybatch.eastus.batch.azure.com",
            "2024-07-01.20.0",
            Some("token".to_string()),
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(
            client.url("pools/azfinsim-pool/resize"),
            "https://mybatch.eastus.batch.azure.com/pools/azfinsim-pool/resize?api-version=2024-07-01.20.0"
        );
    }
}
