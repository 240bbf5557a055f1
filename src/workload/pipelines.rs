//! Pipeline shapes used by the controller
//!
//! Each function only wires stages; partitioning and task building happen
//! inside the stage producers so any input error surfaces from
//! [`WorkflowGraphBuilder::build`] before anything is submitted.

use super::algorithm::StageConfig;
use super::command::WorkerCommandBuilder;
use super::error::WorkloadResult;
use super::graph::{DependencyRule, TaskGraph, WorkflowGraphBuilder};
use super::range::WorkRange;
use super::task::{ContainerSettings, TaskSpecBuilder};
use serde::{Deserialize, Serialize};

pub const GENERATE_STAGE: &str = "generate";
pub const SPLIT_STAGE: &str = "split";
pub const PRICE_STAGE: &str = "price";
pub const MERGE_STAGE: &str = "merge";
pub const CATALYST_STAGE: &str = "catalyst";

/// Shared mount plus the per-run working directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingPath {
    pub shared_path: String,
    pub workdir: String,
}

impl StagingPath {
    pub fn new(shared_path: impl Into<String>, workdir: impl Into<String>) -> Self {
        Self {
            shared_path: shared_path.into(),
            workdir: workdir.into(),
        }
    }

    /// Directory that every stage of a filesystem workflow reads and writes.
    pub fn cache_path(&self) -> String {
        format!(
            "{}/{}",
            self.shared_path.trim_end_matches('/'),
            self.workdir.trim_matches('/')
        )
    }
}

/// Pricing tasks over `range`, one per partition.
pub fn pricing(
    range: WorkRange,
    tasks: usize,
    config: &StageConfig,
    builder: &TaskSpecBuilder,
) -> WorkloadResult<TaskGraph> {
    WorkflowGraphBuilder::new()
        .stage(PRICE_STAGE, DependencyRule::None, || {
            Ok(range
                .partition(tasks)?
                .into_iter()
                .map(|r| builder.pricing(r, config))
                .collect())
        })
        .build()
}

/// Cache population only: trade generator tasks, one per partition.
pub fn cache_population(
    range: WorkRange,
    tasks: usize,
    builder: &TaskSpecBuilder,
) -> WorkloadResult<TaskGraph> {
    WorkflowGraphBuilder::new()
        .stage(GENERATE_STAGE, DependencyRule::None, || {
            generate_stage(range, tasks, builder)
        })
        .build()
}

/// Generate then price, with pricing task `i` waiting on generator `i`.
pub fn generate_and_price(
    range: WorkRange,
    tasks: usize,
    config: &StageConfig,
    builder: &TaskSpecBuilder,
) -> WorkloadResult<TaskGraph> {
    WorkflowGraphBuilder::new()
        .stage(GENERATE_STAGE, DependencyRule::None, || {
            generate_stage(range, tasks, builder)
        })
        .stage(PRICE_STAGE, DependencyRule::positional(GENERATE_STAGE), || {
            Ok(range
                .partition(tasks)?
                .into_iter()
                .map(|r| builder.pricing(r, config))
                .collect())
        })
        .build()
}

/// Four-stage filesystem workflow: one generator writes every trade into the
/// staging directory, one splitter cuts it into `tasks` parts, `tasks`
/// pricing tasks run in parallel and a single merge collects the results.
pub fn filesystem_workflow(
    range: WorkRange,
    tasks: usize,
    config: &StageConfig,
    container: ContainerSettings,
    staging: &StagingPath,
) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container).filesystem(staging.cache_path());
    let parts = range.partition(tasks)?;

    WorkflowGraphBuilder::new()
        .stage(GENERATE_STAGE, DependencyRule::None, || {
            Ok(vec![builder.generator(range)])
        })
        .stage(SPLIT_STAGE, DependencyRule::positional(GENERATE_STAGE), || {
            Ok(vec![builder.split(parts.len())])
        })
        .stage(PRICE_STAGE, DependencyRule::all_of(SPLIT_STAGE), || {
            Ok(parts.iter().map(|r| builder.pricing(*r, config)).collect())
        })
        .stage(MERGE_STAGE, DependencyRule::all_of(PRICE_STAGE), || {
            Ok(vec![builder.merge(parts.len())])
        })
        .build()
}

/// Standalone generator step of the filesystem workflow.
pub fn filesystem_generate(
    range: WorkRange,
    container: ContainerSettings,
    staging: &StagingPath,
) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container).filesystem(staging.cache_path());
    // rejects an empty range
    range.partition(1)?;
    WorkflowGraphBuilder::new()
        .stage(GENERATE_STAGE, DependencyRule::None, || {
            Ok(vec![builder.generator(range)])
        })
        .build()
}

/// Standalone split step of the filesystem workflow.
pub fn filesystem_split(
    range: WorkRange,
    tasks: usize,
    container: ContainerSettings,
    staging: &StagingPath,
) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container).filesystem(staging.cache_path());
    let parts = range.partition(tasks)?.len();
    WorkflowGraphBuilder::new()
        .stage(SPLIT_STAGE, DependencyRule::None, || Ok(vec![builder.split(parts)]))
        .build()
}

/// Standalone pricing step of the filesystem workflow.
pub fn filesystem_pricing(
    range: WorkRange,
    tasks: usize,
    config: &StageConfig,
    container: ContainerSettings,
    staging: &StagingPath,
) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container).filesystem(staging.cache_path());
    pricing(range, tasks, config, &builder)
}

/// Standalone merge step of the filesystem workflow.
pub fn filesystem_merge(
    range: WorkRange,
    tasks: usize,
    container: ContainerSettings,
    staging: &StagingPath,
) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container).filesystem(staging.cache_path());
    let parts = range.partition(tasks)?.len();
    WorkflowGraphBuilder::new()
        .stage(MERGE_STAGE, DependencyRule::None, || Ok(vec![builder.merge(parts)]))
        .build()
}

/// Parameters of a Catalyst-enabled LULESH run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalystRun {
    pub size: u32,
    pub iterations: u32,
}

impl Default for CatalystRun {
    fn default() -> Self {
        Self {
            size: 30,
            iterations: 50,
        }
    }
}

pub const CATALYST_SCRIPT: &str = "/opt/input/script.py";

/// Image of the LULESH/Catalyst worker hosted in `registry`.
pub fn catalyst_image(registry: &str) -> String {
    format!("{}.azurecr.io/lulesh/lulesh-catalyst:latest", registry)
}

/// A single LULESH simulation task with in-situ Catalyst visualization.
pub fn catalyst(run: CatalystRun, container: ContainerSettings) -> WorkloadResult<TaskGraph> {
    let builder = TaskSpecBuilder::new(container);
    WorkflowGraphBuilder::new()
        .stage(CATALYST_STAGE, DependencyRule::None, || {
            let command = WorkerCommandBuilder::entrypoint()
                .flag("-p")
                .value("-s", run.size)
                .value("-i", run.iterations)
                .value("-x", CATALYST_SCRIPT)
                .build();
            Ok(vec![builder.custom(command)])
        })
        .build()
}

fn generate_stage(
    range: WorkRange,
    tasks: usize,
    builder: &TaskSpecBuilder,
) -> WorkloadResult<super::graph::StageResult> {
    Ok(range
        .partition(tasks)?
        .into_iter()
        .map(|r| builder.generator(r))
        .collect())
}
