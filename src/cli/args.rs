//! CLI argument structures
//!
//! Every workload subcommand shares the same trade-range flags; pricing and
//! filesystem variants flatten in their extra groups.

use crate::workload::{
    task_count, Algorithm, StageConfig, SyntheticParams, WorkRange, WorkloadError, WorkloadResult,
};
use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Drive compute pools and submit batch workloads
#[derive(Parser, Debug)]
#[command(name = "batch-controller")]
#[command(about = "batch-controller - Submit risk-pricing and simulation jobs to a batch service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Batch account endpoint
    #[arg(short = 'e', long, global = true, value_name = "HOST")]
    pub batch_endpoint: Option<String>,

    /// Print the validated job as JSON instead of submitting it
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resize or inspect the pool of an application
    Pool {
        /// Application whose pool to operate on
        #[arg(long, value_name = "APP")]
        app: Application,

        /// Set the target number of dedicated nodes
        #[arg(long, value_name = "SIZE", conflicts_with = "info", required_unless_present = "info")]
        resize: Option<u32>,

        /// Show pool state and node counts
        #[arg(long)]
        info: bool,
    },

    /// Price trades already present in the cache
    Job {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        pricing: PricingArgs,
    },

    /// Populate the cache with generated trades
    Cache {
        #[command(flatten)]
        workload: WorkloadArgs,
    },

    /// Generate trades then price them, task by task
    Workflow {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        pricing: PricingArgs,
    },

    /// Generate trades into the shared filesystem
    #[command(name = "generator-fs")]
    GeneratorFs {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Split the generated trades file into one part per task
    #[command(name = "split-fs")]
    SplitFs {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Price split trade files in the shared filesystem
    #[command(name = "pricing-fs")]
    PricingFs {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        pricing: PricingArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Merge priced parts back into a single results file
    #[command(name = "merge-fs")]
    MergeFs {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Generate, split, price and merge through the shared filesystem
    #[command(name = "workflow-fs")]
    WorkflowFs {
        #[command(flatten)]
        workload: WorkloadArgs,

        #[command(flatten)]
        pricing: PricingArgs,

        #[command(flatten)]
        staging: StagingArgs,
    },

    /// Run the LULESH simulation with Catalyst in-situ visualization
    Catalyst {
        /// Problem size per domain
        #[arg(short = 's', long, default_value = "30")]
        size: u32,

        /// Number of simulation iterations
        #[arg(short = 'i', long, default_value = "50")]
        iterations: u32,

        /// Container registry hosting the simulation image
        #[arg(long, value_name = "NAME")]
        registry: Option<String>,
    },
}

/// Trade range and fan-out shared by every workload subcommand
#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    /// First trade number
    #[arg(short = 's', long, default_value = "0", allow_negative_numbers = true)]
    pub start_trade: i64,

    /// Number of trades to process
    #[arg(short = 'w', long, default_value = "0", allow_negative_numbers = true)]
    pub trade_window: i64,

    /// Number of tasks to split the window into
    #[arg(short = 't', long, default_value = "1", allow_negative_numbers = true)]
    pub tasks: i64,

    /// Worker container image, overriding the configured one
    #[arg(short = 'i', long, value_name = "IMAGE")]
    pub container_image: Option<String>,
}

impl WorkloadArgs {
    pub fn range(&self) -> WorkloadResult<WorkRange> {
        WorkRange::from_signed(self.start_trade, self.trade_window)
    }

    pub fn task_count(&self) -> WorkloadResult<usize> {
        task_count(self.tasks)
    }
}

/// Pricing algorithm selection and its knobs
#[derive(Args, Debug, Clone)]
pub struct PricingArgs {
    /// Pricing algorithm: deltavega, pvonly or synthetic
    #[arg(short = 'a', long, default_value = "deltavega")]
    pub algorithm: Algorithm,

    /// Inject random task failure with this probability
    #[arg(long, default_value = "0.0")]
    pub failure: f64,

    /// Startup delay in seconds (synthetic only, default 0)
    #[arg(short = 'd', long, value_name = "SECONDS")]
    pub delay_start: Option<u64>,

    /// Memory usage per task in MB (synthetic only, default 16)
    #[arg(short = 'm', long, value_name = "MB")]
    pub mem_usage: Option<u64>,

    /// Task duration in milliseconds (synthetic only, default 20)
    #[arg(long, value_name = "MS")]
    pub task_duration: Option<u64>,
}

impl PricingArgs {
    /// Validated stage parameters.
    ///
    /// Synthetic knobs fall back to their defaults when the algorithm is
    /// synthetic and are refused for any other algorithm.
    pub fn stage_config(&self) -> WorkloadResult<StageConfig> {
        if self.algorithm.is_synthetic() {
            let defaults = SyntheticParams::default();
            let params = SyntheticParams {
                delay_start: self.delay_start.unwrap_or(defaults.delay_start),
                mem_usage: self.mem_usage.unwrap_or(defaults.mem_usage),
                task_duration: self.task_duration.unwrap_or(defaults.task_duration),
            };
            return StageConfig::synthetic(self.failure, params);
        }

        let supplied: Vec<&str> = [
            ("--delay-start", self.delay_start.is_some()),
            ("--mem-usage", self.mem_usage.is_some()),
            ("--task-duration", self.task_duration.is_some()),
        ]
        .into_iter()
        .filter_map(|(flag, set)| set.then_some(flag))
        .collect();

        if !supplied.is_empty() {
            return Err(WorkloadError::UnsupportedAlgorithmParameter {
                algorithm: self.algorithm.to_string(),
                reason: format!("{} only apply to algorithm 'synthetic'", supplied.join(", ")),
            });
        }

        StageConfig::pricing(self.algorithm, self.failure)
    }
}

/// Location of the shared filesystem staging area
#[derive(Args, Debug, Clone, Default)]
pub struct StagingArgs {
    /// Mount point of the shared volume on the compute nodes
    #[arg(long, value_name = "PATH")]
    pub shared_path: Option<String>,

    /// Directory under the shared path used for this run
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<String>,
}

/// Applications that own a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    Azfinsim,
    LuleshCatalyst,
    Trame,
}

impl Application {
    pub fn as_str(&self) -> &'static str {
        match self {
            Application::Azfinsim => "azfinsim",
            Application::LuleshCatalyst => "lulesh-catalyst",
            Application::Trame => "trame",
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Application {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azfinsim" => Ok(Application::Azfinsim),
            "lulesh-catalyst" => Ok(Application::LuleshCatalyst),
            "trame" => Ok(Application::Trame),
            other => Err(format!(
                "unknown application '{}', expected one of: azfinsim, lulesh-catalyst, trame",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = parse(&[
            "batch-controller",
            "-vv",
            "-e",
            "mybatch.eastus.batch.azure.com",
            "--dry-run",
            "cache",
            "--trade-window",
            "100",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
        assert_eq!(
            cli.batch_endpoint.as_deref(),
            Some("mybatch.eastus.batch.azure.com")
        );
        assert!(matches!(cli.command, Some(Commands::Cache { .. })));
    }

    #[test]
    fn test_job_defaults() {
        let cli = parse(&["batch-controller", "job"]);
        match cli.command {
            Some(Commands::Job { workload, pricing }) => {
                assert_eq!(workload.start_trade, 0);
                assert_eq!(workload.trade_window, 0);
                assert_eq!(workload.tasks, 1);
                assert_eq!(pricing.algorithm, Algorithm::DeltaVega);
                assert_eq!(pricing.failure, 0.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_negative_values_reach_validation() {
        let cli = parse(&["batch-controller", "job", "--tasks", "-2", "-w", "10"]);
        let Some(Commands::Job { workload, .. }) = cli.command else {
            panic!("expected job command");
        };
        assert!(matches!(
            workload.task_count(),
            Err(WorkloadError::InvalidPartition { .. })
        ));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result = Cli::try_parse_from(["batch-controller", "job", "--algorithm", "montecarlo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_synthetic_defaults_applied() {
        let pricing = PricingArgs {
            algorithm: Algorithm::Synthetic,
            failure: 0.1,
            delay_start: None,
            mem_usage: Some(64),
            task_duration: None,
        };
        let config = pricing.stage_config().unwrap();
        let params = config.synthetic_params().unwrap();
        assert_eq!(params.delay_start, 0);
        assert_eq!(params.mem_usage, 64);
        assert_eq!(params.task_duration, 20);
    }

    #[test]
    fn test_synthetic_knobs_refused_for_other_algorithms() {
        let pricing = PricingArgs {
            algorithm: Algorithm::PvOnly,
            failure: 0.0,
            delay_start: Some(5),
            mem_usage: None,
            task_duration: None,
        };
        let err = pricing.stage_config().unwrap_err();
        assert!(matches!(err, WorkloadError::UnsupportedAlgorithmParameter { .. }));
    }

    #[test]
    fn test_pool_requires_an_action() {
        assert!(Cli::try_parse_from(["batch-controller", "pool", "--app", "trame"]).is_err());
        assert!(Cli::try_parse_from([
            "batch-controller",
            "pool",
            "--app",
            "trame",
            "--resize",
            "2",
            "--info"
        ])
        .is_err());

        let cli = parse(&["batch-controller", "pool", "--app", "lulesh-catalyst", "--resize", "3"]);
        match cli.command {
            Some(Commands::Pool { app, resize, info }) => {
                assert_eq!(app, Application::LuleshCatalyst);
                assert_eq!(resize, Some(3));
                assert!(!info);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
