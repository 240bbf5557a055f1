//! Workload partitioning and task-graph construction
//!
//! Everything in this module is pure and synchronous: it turns a work range,
//! a task count and stage parameters into a validated [`JobDescriptor`]
//! without touching the network. Submission lives in [`crate::batch`].

pub mod algorithm;
pub mod command;
pub mod error;
pub mod graph;
pub mod job;
pub mod pipelines;
pub mod range;
pub mod task;

pub use algorithm::{Algorithm, StageConfig, SyntheticParams};
pub use command::{CacheSource, WorkerCommand, WorkerCommandBuilder};
pub use error::{WorkloadError, WorkloadResult};
pub use graph::{DependencyRule, StageResult, TaskGraph, WorkflowGraphBuilder};
pub use job::{CompletionPolicy, JobDescriptor, JobFamily};
pub use pipelines::{CatalystRun, StagingPath};
pub use range::{task_count, WorkRange};
pub use task::{ContainerSettings, TaskDescriptor, TaskId, TaskSpec, TaskSpecBuilder};
