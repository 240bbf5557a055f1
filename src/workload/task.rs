//! Task specifications and descriptors

use super::algorithm::StageConfig;
use super::command::{CacheSource, WorkerCommand, WorkerCommandBuilder};
use super::range::WorkRange;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PRICING_MODULE: &str = "azfinsim";
pub const GENERATOR_MODULE: &str = "azfinsim.generator";
pub const SPLIT_MODULE: &str = "azfinsim.split";
pub const MERGE_MODULE: &str = "azfinsim.merge";

/// Identifier of a task, unique within its job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Id of the task at `index` within the stage called `stage`.
    pub fn for_stage(stage: &str, index: usize) -> Self {
        Self(format!("{}-{}", stage, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Container image and `docker run` options passed through to each task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerSettings {
    pub image: String,
    #[serde(default)]
    pub run_options: String,
}

impl ContainerSettings {
    pub fn new(image: impl Into<String>, run_options: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            run_options: run_options.into(),
        }
    }
}

/// A task before it is placed in a workflow: no id and no dependencies yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub command: WorkerCommand,
    pub container: ContainerSettings,
    pub requires_elevated_privilege: bool,
}

/// A placed task, ready to be handed to the submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub command_line: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    pub requires_elevated_privilege: bool,
    pub container_image: String,
    pub container_run_options: String,
}

impl TaskDescriptor {
    /// Place `spec` under `id` with the given dependencies.
    pub fn from_spec(id: TaskId, spec: TaskSpec, dependencies: Vec<TaskId>) -> Self {
        Self {
            id,
            command_line: spec.command.render(),
            dependencies,
            requires_elevated_privilege: spec.requires_elevated_privilege,
            container_image: spec.container.image,
            container_run_options: spec.container.run_options,
        }
    }
}

/// Builds one [`TaskSpec`] per sub-range.
///
/// Building is pure: it only assembles data. Tasks default to running without
/// elevated privilege against the Redis cache; [`TaskSpecBuilder::filesystem`]
/// switches to a shared mount, which needs admin rights on the node.
#[derive(Debug, Clone)]
pub struct TaskSpecBuilder {
    container: ContainerSettings,
    cache: CacheSource,
    elevated: bool,
}

impl TaskSpecBuilder {
    pub fn new(container: ContainerSettings) -> Self {
        Self {
            container,
            cache: CacheSource::Redis,
            elevated: false,
        }
    }

    /// Stage through a shared filesystem path instead of the cache.
    pub fn filesystem(mut self, path: impl Into<String>) -> Self {
        self.cache = CacheSource::filesystem(path);
        self.elevated = true;
        self
    }

    /// Pricing task over `range`.
    pub fn pricing(&self, range: WorkRange, config: &StageConfig) -> TaskSpec {
        let mut builder = WorkerCommandBuilder::python_module(PRICING_MODULE)
            .value("--start-trade", range.start())
            .value("--trade-window", range.count())
            .value("--failure", config.failure())
            .value("--algorithm", config.algorithm());

        if let Some(synthetic) = config.synthetic_params() {
            builder = builder
                .value("--delay-start", synthetic.delay_start)
                .value("--mem-usage", synthetic.mem_usage)
                .value("--task-duration", synthetic.task_duration);
        }

        self.spec(builder.cache(&self.cache).build())
    }

    /// Trade generation task populating the cache for `range`.
    pub fn generator(&self, range: WorkRange) -> TaskSpec {
        let command = WorkerCommandBuilder::python_module(GENERATOR_MODULE)
            .value("--start-trade", range.start())
            .value("--trade-window", range.count())
            .cache(&self.cache)
            .build();
        self.spec(command)
    }

    /// Task splitting the generated trades into `parts` chunks.
    pub fn split(&self, parts: usize) -> TaskSpec {
        let command = WorkerCommandBuilder::python_module(SPLIT_MODULE)
            .value("--parts", parts)
            .cache(&self.cache)
            .build();
        self.spec(command)
    }

    /// Task merging `parts` pricing results into one.
    pub fn merge(&self, parts: usize) -> TaskSpec {
        let command = WorkerCommandBuilder::python_module(MERGE_MODULE)
            .value("--parts", parts)
            .cache(&self.cache)
            .build();
        self.spec(command)
    }

    /// Task running an arbitrary worker command with this builder's settings.
    pub fn custom(&self, command: WorkerCommand) -> TaskSpec {
        self.spec(command)
    }

    fn spec(&self, command: WorkerCommand) -> TaskSpec {
        TaskSpec {
            command,
            container: self.container.clone(),
            requires_elevated_privilege: self.elevated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::algorithm::{Algorithm, SyntheticParams};

    fn builder() -> TaskSpecBuilder {
        TaskSpecBuilder::new(ContainerSettings::new("registry.io/azfinsim:latest", "--rm"))
    }

    const SYNTHETIC_FLAGS: [&str; 3] = ["--delay-start", "--mem-usage", "--task-duration"];

    #[test]
    fn test_pricing_command_line() {
        let config = StageConfig::pricing(Algorithm::DeltaVega, 0.25).unwrap();
        let spec = builder().pricing(WorkRange::new(250, 250), &config);

        assert_eq!(
            spec.command.render(),
            "/bin/sh -c \"python3 -m azfinsim --start-trade 250 --trade-window 250 \
             --failure 0.25 --algorithm deltavega --cache-type redis \
             --arguments $AZ_BATCH_JOB_PREP_WORKING_DIR/azfinsim.$AZ_BATCH_JOB_ID.args\""
        );
        assert!(!spec.requires_elevated_privilege);
        assert_eq!(spec.container.image, "registry.io/azfinsim:latest");
        assert_eq!(spec.container.run_options, "--rm");
    }

    #[test]
    fn test_synthetic_flags_only_for_synthetic() {
        let range = WorkRange::new(0, 10);

        for algorithm in [Algorithm::DeltaVega, Algorithm::PvOnly] {
            let config = StageConfig::pricing(algorithm, 0.0).unwrap();
            let spec = builder().pricing(range, &config);
            for flag in SYNTHETIC_FLAGS {
                assert!(!spec.command.has_flag(flag), "{} leaked into {}", flag, algorithm);
            }
        }

        let params = SyntheticParams {
            delay_start: 3,
            mem_usage: 64,
            task_duration: 500,
        };
        let config = StageConfig::synthetic(0.1, params).unwrap();
        let spec = builder().pricing(range, &config);
        assert_eq!(spec.command.value_of("--delay-start"), Some("3"));
        assert_eq!(spec.command.value_of("--mem-usage"), Some("64"));
        assert_eq!(spec.command.value_of("--task-duration"), Some("500"));
        assert!(spec
            .command
            .render()
            .contains("--delay-start 3 --mem-usage 64 --task-duration 500"));
    }

    #[test]
    fn test_filesystem_tasks_are_elevated() {
        let fs = builder().filesystem("/mnt/data/run-1");
        let spec = fs.generator(WorkRange::new(0, 100));

        assert!(spec.requires_elevated_privilege);
        assert_eq!(spec.command.value_of("--cache-type"), Some("filesystem"));
        assert_eq!(spec.command.value_of("--cache-path"), Some("/mnt/data/run-1"));
        assert!(!spec.command.has_flag("--arguments"));
    }

    #[test]
    fn test_split_and_merge_carry_part_count() {
        let fs = builder().filesystem("/mnt/data");
        assert_eq!(fs.split(3).command.value_of("--parts"), Some("3"));
        assert_eq!(fs.merge(3).command.value_of("--parts"), Some("3"));
    }

    #[test]
    fn test_descriptor_from_spec() {
        let spec = builder().generator(WorkRange::new(0, 5));
        let descriptor = TaskDescriptor::from_spec(
            TaskId::for_stage("generate", 0),
            spec.clone(),
            vec![],
        );

        assert_eq!(descriptor.id.as_str(), "generate-0");
        assert_eq!(descriptor.command_line, spec.command.render());
        assert!(descriptor.dependencies.is_empty());
    }
}
