//! Request and response bodies of the batch service REST API

use crate::workload::{CompletionPolicy, TaskDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAddParameter {
    pub id: String,
    pub pool_info: PoolInformation,
    pub uses_task_dependencies: bool,
    pub on_all_tasks_complete: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInformation {
    pub pool_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatchParameter {
    pub on_all_tasks_complete: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTerminateParameter {
    pub terminate_reason: String,
}

pub fn completion_policy_name(policy: CompletionPolicy) -> &'static str {
    match policy {
        CompletionPolicy::NoAction => "noaction",
        CompletionPolicy::TerminateJob => "terminatejob",
    }
}

#[derive(Debug, Serialize)]
pub struct TaskAddCollectionParameter {
    pub value: Vec<TaskAddParameter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAddParameter {
    pub id: String,
    pub command_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_settings: Option<TaskContainerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identity: Option<UserIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<TaskDependencies>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContainerSettings {
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_run_options: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub auto_user: AutoUserSpecification,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoUserSpecification {
    pub scope: &'static str,
    pub elevation_level: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependencies {
    pub task_ids: Vec<String>,
}

impl From<&TaskDescriptor> for TaskAddParameter {
    fn from(task: &TaskDescriptor) -> Self {
        let container_settings = (!task.container_image.is_empty()).then(|| TaskContainerSettings {
            image_name: task.container_image.clone(),
            container_run_options: task.container_run_options.clone(),
        });

        let user_identity = task.requires_elevated_privilege.then(|| UserIdentity {
            auto_user: AutoUserSpecification {
                scope: "pool",
                elevation_level: "admin",
            },
        });

        let depends_on = (!task.dependencies.is_empty()).then(|| TaskDependencies {
            task_ids: task.dependencies.iter().map(|d| d.to_string()).collect(),
        });

        Self {
            id: task.id.to_string(),
            command_line: task.command_line.clone(),
            container_settings,
            user_identity,
            depends_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskAddCollectionResult {
    #[serde(default)]
    pub value: Vec<TaskAddResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAddResult {
    pub status: String,
    pub task_id: String,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

impl TaskAddResult {
    pub fn succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceErrorBody {
    pub error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    pub code: Option<String>,
    pub message: Option<ServiceErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceErrorMessage {
    pub value: Option<String>,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code.as_deref().unwrap_or("Unknown");
        match self.message.as_ref().and_then(|m| m.value.as_deref()) {
            Some(message) => write!(f, "{}: {}", code, message),
            None => f.write_str(code),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResizeParameter {
    pub target_dedicated_nodes: u32,
}

/// Snapshot of a pool as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub allocation_state: String,
    #[serde(default, rename = "currentDedicatedNodes")]
    pub dedicated_count: u32,
    #[serde(default, rename = "currentLowPriorityNodes")]
    pub low_priority_count: u32,
}

impl fmt::Display for PoolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pool:              {}", self.id)?;
        writeln!(f, "state:             {}", self.state)?;
        writeln!(f, "allocation state:  {}", self.allocation_state)?;
        writeln!(f, "dedicated nodes:   {}", self.dedicated_count)?;
        write!(f, "low-priority nodes: {}", self.low_priority_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::TaskId;
    use serde_json::json;

    fn task(elevated: bool, deps: Vec<&str>) -> TaskDescriptor {
        TaskDescriptor {
            id: TaskId::from("price-0"),
            command_line: "/bin/sh -c \"python3 -m azfinsim\"".to_string(),
            dependencies: deps.into_iter().map(TaskId::from).collect(),
            requires_elevated_privilege: elevated,
            container_image: "acr.io/azfinsim:latest".to_string(),
            container_run_options: String::new(),
        }
    }

    #[test]
    fn test_task_add_parameter_payload() {
        let param = TaskAddParameter::from(&task(true, vec!["split-0"]));
        let value = serde_json::to_value(&param).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "price-0",
                "commandLine": "/bin/sh -c \"python3 -m azfinsim\"",
                "containerSettings": { "imageName": "acr.io/azfinsim:latest" },
                "userIdentity": { "autoUser": { "scope": "pool", "elevationLevel": "admin" } },
                "dependsOn": { "taskIds": ["split-0"] }
            })
        );
    }

    #[test]
    fn test_plain_task_omits_optional_sections() {
        let value = serde_json::to_value(TaskAddParameter::from(&task(false, vec![]))).unwrap();
        assert!(value.get("userIdentity").is_none());
        assert!(value.get("dependsOn").is_none());
    }

    #[test]
    fn test_pool_info_from_service_json() {
        let info: PoolInfo = serde_json::from_value(json!({
            "id": "azfinsim-pool",
            "state": "active",
            "allocationState": "steady",
            "currentDedicatedNodes": 4,
            "currentLowPriorityNodes": 0,
            "vmSize": "standard_d2s_v3"
        }))
        .unwrap();

        assert_eq!(info.dedicated_count, 4);
        assert_eq!(info.allocation_state, "steady");
        assert!(info.to_string().contains("dedicated nodes:   4"));
    }
}
