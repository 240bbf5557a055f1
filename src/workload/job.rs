//! Job descriptors handed to the submission boundary

use super::error::{WorkloadError, WorkloadResult};
use super::graph::TaskGraph;
use super::task::{TaskDescriptor, TaskId};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Workload family; determines the job-id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobFamily {
    Azfinsim,
    Cache,
    Workflow,
    WorkflowFs,
    LuleshCatalyst,
    GeneratorFs,
    SplitFs,
    PricingFs,
    MergeFs,
}

impl JobFamily {
    pub fn prefix(&self) -> &'static str {
        match self {
            JobFamily::Azfinsim => "azfinsim",
            JobFamily::Cache => "cache",
            JobFamily::Workflow => "workflow",
            JobFamily::WorkflowFs => "workflow-fs",
            JobFamily::LuleshCatalyst => "lulesh-catalyst",
            JobFamily::GeneratorFs => "generator-fs",
            JobFamily::SplitFs => "split-fs",
            JobFamily::PricingFs => "pricing-fs",
            JobFamily::MergeFs => "merge-fs",
        }
    }
}

impl fmt::Display for JobFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// What the service does once every task of the job has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    NoAction,
    #[default]
    TerminateJob,
}

impl CompletionPolicy {
    pub fn terminates(&self) -> bool {
        matches!(self, CompletionPolicy::TerminateJob)
    }
}

/// A fully built and validated job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub pool_id: String,
    pub family: JobFamily,
    pub tasks: Vec<TaskDescriptor>,
    pub on_all_tasks_complete: CompletionPolicy,
}

impl JobDescriptor {
    /// Assemble a job from a wired graph. The task list is validated here so
    /// that nothing malformed ever reaches the submission boundary.
    pub fn new(
        id: impl Into<String>,
        pool_id: impl Into<String>,
        family: JobFamily,
        graph: TaskGraph,
    ) -> WorkloadResult<Self> {
        let job = Self {
            id: id.into(),
            pool_id: pool_id.into(),
            family,
            tasks: graph.into_tasks(),
            on_all_tasks_complete: CompletionPolicy::TerminateJob,
        };
        job.validate()?;
        Ok(job)
    }

    /// Whether any task carries dependencies; the service must be told
    /// up front when a job uses them.
    pub fn uses_task_dependencies(&self) -> bool {
        self.tasks.iter().any(|t| !t.dependencies.is_empty())
    }

    pub fn task(&self, id: &str) -> Option<&TaskDescriptor> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    /// Check that the task list is non-empty, ids are unique and every
    /// dependency names a task placed earlier in the list.
    pub fn validate(&self) -> WorkloadResult<()> {
        if self.tasks.is_empty() {
            return Err(WorkloadError::EmptyWorkflow);
        }

        let mut seen: HashSet<&TaskId> = HashSet::new();
        for task in &self.tasks {
            if let Some(dep) = task.dependencies.iter().find(|d| !seen.contains(d)) {
                return Err(WorkloadError::InvalidDependency {
                    task: task.id.to_string(),
                    dependency: dep.to_string(),
                });
            }
            if !seen.insert(&task.id) {
                return Err(WorkloadError::DuplicateTaskId(task.id.to_string()));
            }
        }

        Ok(())
    }

    /// Directed graph with an edge from each dependency to its dependent.
    pub fn dependency_graph(&self) -> DiGraph<&TaskId, ()> {
        let mut graph = DiGraph::new();
        let mut nodes: HashMap<&TaskId, NodeIndex> = HashMap::new();

        for task in &self.tasks {
            let node = graph.add_node(&task.id);
            nodes.insert(&task.id, node);
        }
        for task in &self.tasks {
            for dep in &task.dependencies {
                if let (Some(&from), Some(&to)) = (nodes.get(dep), nodes.get(&task.id)) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        graph
    }

    /// Number of tasks on the longest dependency chain, i.e. how many
    /// scheduling waves the job needs at minimum.
    pub fn depth(&self) -> usize {
        let graph = self.dependency_graph();
        let Ok(order) = toposort(&graph, None) else {
            return 0;
        };

        let mut level: HashMap<NodeIndex, usize> = HashMap::new();
        for node in order {
            let own = graph
                .neighbors_directed(node, Direction::Incoming)
                .filter_map(|up| level.get(&up))
                .max()
                .map_or(1, |l| l + 1);
            level.insert(node, own);
        }
        level.into_values().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::graph::{DependencyRule, WorkflowGraphBuilder};
    use crate::workload::range::WorkRange;
    use crate::workload::task::{ContainerSettings, TaskSpecBuilder};

    fn graph() -> TaskGraph {
        let builder = TaskSpecBuilder::new(ContainerSettings::new("img", ""));
        WorkflowGraphBuilder::new()
            .stage("generate", DependencyRule::None, || {
                Ok(vec![builder.generator(WorkRange::new(0, 10))])
            })
            .stage("price", DependencyRule::positional("generate"), || {
                Ok(vec![builder.generator(WorkRange::new(0, 10))])
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_job_defaults_to_terminate() {
        let job = JobDescriptor::new("workflow-1", "azfinsim-pool", JobFamily::Workflow, graph())
            .unwrap();

        assert_eq!(job.on_all_tasks_complete, CompletionPolicy::TerminateJob);
        assert!(job.uses_task_dependencies());
        assert_eq!(job.tasks.len(), 2);
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let mut job =
            JobDescriptor::new("workflow-1", "pool", JobFamily::Workflow, graph()).unwrap();
        job.tasks.swap(0, 1);

        let err = job.validate().unwrap_err();
        assert_eq!(
            err,
            WorkloadError::InvalidDependency {
                task: "price-0".to_string(),
                dependency: "generate-0".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut job =
            JobDescriptor::new("workflow-1", "pool", JobFamily::Workflow, graph()).unwrap();
        job.tasks[1].id = job.tasks[0].id.clone();
        job.tasks[1].dependencies.clear();

        assert_eq!(
            job.validate().unwrap_err(),
            WorkloadError::DuplicateTaskId("generate-0".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_empty_task_list() {
        let mut job =
            JobDescriptor::new("workflow-1", "pool", JobFamily::Workflow, graph()).unwrap();
        job.tasks.clear();
        assert_eq!(job.validate().unwrap_err(), WorkloadError::EmptyWorkflow);
    }

    #[test]
    fn test_depth_counts_longest_chain() {
        let job = JobDescriptor::new("workflow-1", "pool", JobFamily::Workflow, graph()).unwrap();
        assert_eq!(job.depth(), 2);
        assert_eq!(job.dependency_graph().edge_count(), 1);
    }

    #[test]
    fn test_family_prefixes() {
        assert_eq!(JobFamily::LuleshCatalyst.prefix(), "lulesh-catalyst");
        assert_eq!(JobFamily::WorkflowFs.to_string(), "workflow-fs");
        assert_eq!(
            serde_json::to_string(&JobFamily::PricingFs).unwrap(),
            "\"pricing-fs\""
        );
    }
}
