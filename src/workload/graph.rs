//! Workflow graph construction
//!
//! Stages are placed in declaration order. A stage may only reference stages
//! that were placed before it, so every dependency edge points backwards in
//! the final task list and the graph is acyclic by construction.

use super::error::{WorkloadError, WorkloadResult};
use super::task::{TaskDescriptor, TaskId, TaskSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

/// Ordered tasks produced by one stage. Order matters for positional rules.
pub type StageResult = Vec<TaskSpec>;

/// How the tasks of a stage depend on an earlier stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "stage")]
pub enum DependencyRule {
    /// No dependencies
    None,
    /// Task `i` depends on task `i` of the named stage
    Positional(String),
    /// Every task depends on every task of the named stage
    AllOf(String),
}

impl DependencyRule {
    pub fn positional(stage: impl Into<String>) -> Self {
        Self::Positional(stage.into())
    }

    pub fn all_of(stage: impl Into<String>) -> Self {
        Self::AllOf(stage.into())
    }

    fn upstream(&self) -> Option<&str> {
        match self {
            DependencyRule::None => None,
            DependencyRule::Positional(stage) | DependencyRule::AllOf(stage) => Some(stage),
        }
    }
}

type StageProducer<'a> = Box<dyn FnOnce() -> WorkloadResult<StageResult> + 'a>;

struct StageDecl<'a> {
    name: String,
    rule: DependencyRule,
    produce: StageProducer<'a>,
}

/// A stage after placement: its name and the slice of the task list it owns
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlacedStage {
    name: String,
    tasks: Range<usize>,
}

/// The wired task list of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    tasks: Vec<TaskDescriptor>,
    stages: Vec<PlacedStage>,
}

impl TaskGraph {
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    /// Tasks placed by the stage called `name`.
    pub fn stage_tasks(&self, name: &str) -> Option<&[TaskDescriptor]> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| &self.tasks[s.tasks.clone()])
    }

    pub fn into_tasks(self) -> Vec<TaskDescriptor> {
        self.tasks
    }
}

/// Composes stages into a single [`TaskGraph`].
///
/// Stage producers run lazily inside [`WorkflowGraphBuilder::build`], in
/// declaration order, and the first error aborts the whole build.
#[derive(Default)]
pub struct WorkflowGraphBuilder<'a> {
    stages: Vec<StageDecl<'a>>,
}

impl<'a> WorkflowGraphBuilder<'a> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stage<F>(mut self, name: impl Into<String>, rule: DependencyRule, produce: F) -> Self
    where
        F: FnOnce() -> WorkloadResult<StageResult> + 'a,
    {
        self.stages.push(StageDecl {
            name: name.into(),
            rule,
            produce: Box::new(produce),
        });
        self
    }

    pub fn build(self) -> WorkloadResult<TaskGraph> {
        if self.stages.is_empty() {
            return Err(WorkloadError::EmptyWorkflow);
        }

        let mut tasks: Vec<TaskDescriptor> = Vec::new();
        let mut placed: Vec<PlacedStage> = Vec::new();
        let mut index: HashMap<String, Range<usize>> = HashMap::new();

        for decl in self.stages {
            if index.contains_key(&decl.name) {
                return Err(WorkloadError::DuplicateStage(decl.name));
            }

            let upstream = match decl.rule.upstream() {
                Some(upstream) => Some(index.get(upstream).cloned().ok_or_else(|| {
                    WorkloadError::UnknownStage {
                        stage: decl.name.clone(),
                        upstream: upstream.to_string(),
                    }
                })?),
                None => None,
            };

            let specs = (decl.produce)()?;
            if specs.is_empty() {
                return Err(WorkloadError::EmptyStage(decl.name));
            }

            if let (DependencyRule::Positional(upstream_name), Some(upstream)) =
                (&decl.rule, &upstream)
            {
                if upstream.len() != specs.len() {
                    return Err(WorkloadError::DependencyArityMismatch {
                        stage: decl.name,
                        stage_tasks: specs.len(),
                        upstream: upstream_name.clone(),
                        upstream_tasks: upstream.len(),
                    });
                }
            }

            let offset = tasks.len();
            for (i, spec) in specs.into_iter().enumerate() {
                let dependencies = match (&decl.rule, &upstream) {
                    (DependencyRule::Positional(_), Some(up)) => {
                        vec![tasks[up.start + i].id.clone()]
                    }
                    (DependencyRule::AllOf(_), Some(up)) => {
                        tasks[up.clone()].iter().map(|t| t.id.clone()).collect()
                    }
                    _ => Vec::new(),
                };
                let id = TaskId::for_stage(&decl.name, i);
                tasks.push(TaskDescriptor::from_spec(id, spec, dependencies));
            }

            let range = offset..tasks.len();
            debug!(
                stage = %decl.name,
                tasks = range.len(),
                rule = ?decl.rule,
                "Placed workflow stage"
            );
            index.insert(decl.name.clone(), range.clone());
            placed.push(PlacedStage {
                name: decl.name,
                tasks: range,
            });
        }

        Ok(TaskGraph {
            tasks,
            stages: placed,
        })
    }
}
