//! Command routing and execution

use crate::cli::args::{Cli, Commands};
use crate::cli::commands::{build_job_request, run_pool_command, run_submit_command};
use crate::config::ControllerConfig;
use crate::error::{AppResult, ControllerError};

/// Apply flags that override configuration values
pub fn apply_cli_overrides(cli: &Cli, config: &mut ControllerConfig) {
    if let Some(endpoint) = &cli.batch_endpoint {
        config.batch.endpoint = Some(endpoint.clone());
    }
}

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(cli: Cli, config: ControllerConfig) -> AppResult<()> {
    let mut config = config;
    apply_cli_overrides(&cli, &mut config);

    let command = cli
        .command
        .ok_or_else(|| ControllerError::validation("no subcommand given"))?;

    match &command {
        Commands::Pool { app, resize, .. } => {
            run_pool_command(*app, *resize, &config, cli.dry_run).await?
        }
        _ => {
            if let Some(request) = build_job_request(&command, &config)? {
                run_submit_command(request, &config, cli.dry_run).await?
            }
        }
    }
    Ok(())
}
