//! Workload subcommands: build the task graph, then submit or print it

use crate::batch::{prepare_job, submit_job, BatchRestClient, JobSubmissionAdapter, MockBatchService};
use crate::cli::args::{Commands, StagingArgs, WorkloadArgs};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ErrorCode, Result};
use crate::workload::pipelines::{self, CatalystRun};
use crate::workload::{ContainerSettings, JobDescriptor, JobFamily, StagingPath, TaskGraph, TaskSpecBuilder};
use tracing::{debug, info};

/// A fully wired task graph and where it should run
#[derive(Debug)]
pub struct JobRequest {
    pub family: JobFamily,
    pub pool_id: String,
    pub graph: TaskGraph,
}

/// Translate a workload subcommand into its task graph.
///
/// Returns `None` for subcommands that do not submit a job.
pub fn build_job_request(
    command: &Commands,
    config: &ControllerConfig,
) -> Result<Option<JobRequest>> {
    let azfinsim_pool = config.pools.azfinsim.clone();

    let (family, pool_id, graph) = match command {
        Commands::Pool { .. } => return Ok(None),
        Commands::Job { workload, pricing } => {
            let builder = TaskSpecBuilder::new(container(workload, config));
            let graph = pipelines::pricing(
                workload.range()?,
                workload.task_count()?,
                &pricing.stage_config()?,
                &builder,
            )?;
            (JobFamily::Azfinsim, azfinsim_pool, graph)
        }
        Commands::Cache { workload } => {
            let builder = TaskSpecBuilder::new(container(workload, config));
            let graph =
                pipelines::cache_population(workload.range()?, workload.task_count()?, &builder)?;
            (JobFamily::Cache, azfinsim_pool, graph)
        }
        Commands::Workflow { workload, pricing } => {
            let builder = TaskSpecBuilder::new(container(workload, config));
            let graph = pipelines::generate_and_price(
                workload.range()?,
                workload.task_count()?,
                &pricing.stage_config()?,
                &builder,
            )?;
            (JobFamily::Workflow, azfinsim_pool, graph)
        }
        Commands::GeneratorFs { workload, staging } => {
            let graph = pipelines::filesystem_generate(
                workload.range()?,
                fs_container(workload, config),
                &staging_path(staging, config),
            )?;
            (JobFamily::GeneratorFs, azfinsim_pool, graph)
        }
        Commands::SplitFs { workload, staging } => {
            let graph = pipelines::filesystem_split(
                workload.range()?,
                workload.task_count()?,
                fs_container(workload, config),
                &staging_path(staging, config),
            )?;
            (JobFamily::SplitFs, azfinsim_pool, graph)
        }
        Commands::PricingFs {
            workload,
            pricing,
            staging,
        } => {
            let graph = pipelines::filesystem_pricing(
                workload.range()?,
                workload.task_count()?,
                &pricing.stage_config()?,
                fs_container(workload, config),
                &staging_path(staging, config),
            )?;
            (JobFamily::PricingFs, azfinsim_pool, graph)
        }
        Commands::MergeFs { workload, staging } => {
            let graph = pipelines::filesystem_merge(
                workload.range()?,
                workload.task_count()?,
                fs_container(workload, config),
                &staging_path(staging, config),
            )?;
            (JobFamily::MergeFs, azfinsim_pool, graph)
        }
        Commands::WorkflowFs {
            workload,
            pricing,
            staging,
        } => {
            let graph = pipelines::filesystem_workflow(
                workload.range()?,
                workload.task_count()?,
                &pricing.stage_config()?,
                fs_container(workload, config),
                &staging_path(staging, config),
            )?;
            (JobFamily::WorkflowFs, azfinsim_pool, graph)
        }
        Commands::Catalyst {
            size,
            iterations,
            registry,
        } => {
            let registry = registry
                .as_deref()
                .or(config.container.registry.as_deref())
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| {
                    ControllerError::validation_with_code(
                        ErrorCode::VALIDATION_REQUIRED_FIELD,
                        "a container registry is required; pass --registry or set container.registry",
                        Some("registry".to_string()),
                    )
                })?;
            let container = ContainerSettings::new(
                pipelines::catalyst_image(registry),
                config.container.run_options.clone(),
            );
            let run = CatalystRun {
                size: *size,
                iterations: *iterations,
            };
            let graph = pipelines::catalyst(run, container)?;
            (JobFamily::LuleshCatalyst, config.pools.lulesh_catalyst.clone(), graph)
        }
    };

    debug!(
        family = %family,
        pool_id = %pool_id,
        tasks = graph.tasks().len(),
        "Built task graph"
    );
    Ok(Some(JobRequest {
        family,
        pool_id,
        graph,
    }))
}

fn container(workload: &WorkloadArgs, config: &ControllerConfig) -> ContainerSettings {
    let image = workload
        .container_image
        .clone()
        .unwrap_or_else(|| config.container.image.clone());
    ContainerSettings::new(image, config.container.run_options.clone())
}

fn fs_container(workload: &WorkloadArgs, config: &ControllerConfig) -> ContainerSettings {
    let mut settings = container(workload, config);
    let extra = config.filesystem.run_options.trim();
    if !extra.is_empty() {
        settings.run_options = if settings.run_options.trim().is_empty() {
            extra.to_string()
        } else {
            format!("{} {}", settings.run_options.trim(), extra)
        };
    }
    settings
}

fn staging_path(staging: &StagingArgs, config: &ControllerConfig) -> StagingPath {
    StagingPath::new(
        staging
            .shared_path
            .clone()
            .unwrap_or_else(|| config.filesystem.shared_path.clone()),
        staging
            .workdir
            .clone()
            .unwrap_or_else(|| config.filesystem.workdir.clone()),
    )
}

/// Build the job for `request` and hand it to the batch service, or print it
/// as JSON when `dry_run` is set.
pub async fn run_submit_command(
    request: JobRequest,
    config: &ControllerConfig,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let adapter = MockBatchService::new();
        let job = prepare_job(&adapter, request.family, &request.pool_id, request.graph)?;
        submit_job(&adapter, &job).await?;
        print_job(&job)?;
        return Ok(());
    }

    let client = BatchRestClient::new(
        config.endpoint()?,
        config.batch.api_version.clone(),
        config.batch.access_token.clone(),
        config.batch.timeout(),
    )?;
    submit(&client, request).await
}

async fn submit(adapter: &dyn JobSubmissionAdapter, request: JobRequest) -> Result<()> {
    let job = prepare_job(adapter, request.family, &request.pool_id, request.graph)?;
    let handle = submit_job(adapter, &job)
        .await
        .map_err(|e| ControllerError::from(e).with_job_id(job.id.clone()))?;

    info!(job_id = %handle.job_id, depth = job.depth(), "Job accepted");
    println!(
        "Submitted job {} to pool {} ({} tasks)",
        handle.job_id,
        handle.pool_id,
        job.tasks.len()
    );
    Ok(())
}

fn print_job(job: &JobDescriptor) -> Result<()> {
    let json = serde_json::to_string_pretty(job).map_err(|e| {
        ControllerError::other(format!("Failed to serialize job {}", job.id)).with_source(e)
    })?;
    println!("{}", json);
    debug!(job_id = %job.id, depth = job.depth(), "Dry run complete");
    Ok(())
}
