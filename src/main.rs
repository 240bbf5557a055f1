use batch_controller::cli::{execute_command, Cli};
use batch_controller::config::ControllerConfig;
use batch_controller::error::{describe_error_code, ControllerError};
use clap::{CommandFactory, Parser};
use tracing::{debug, error, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.command.is_none() {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: failed to print usage: {}", e);
        }
        std::process::exit(2);
    }

    let config = match ControllerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };

    init_tracing(cli.verbose, config.log_level.as_deref());

    debug!("batch-controller started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = execute_command(cli, config).await {
        match e.downcast::<ControllerError>() {
            Ok(e) => exit_with(e),
            Err(other) => {
                error!("Fatal error: {:#}", other);
                eprintln!("Error: {:#}", other);
                std::process::exit(1);
            }
        }
    }
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    let log_level = match (verbose, configured) {
        (0, Some(level)) => level.to_string(),
        (0, None) => "info".to_string(),
        (1, _) => "debug".to_string(),
        (2, _) => "trace".to_string(),
        _ => "trace,hyper=debug,reqwest=debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .init();
}

fn exit_with(e: ControllerError) -> ! {
    error!("Fatal error: {}", e);
    eprintln!("Error: {}", e.user_message());
    eprintln!("  code: E{:04} ({})", e.code(), describe_error_code(e.code()));
    if e.is_transient() {
        eprintln!("  the batch service could not be reached; retrying may succeed");
    }
    std::process::exit(e.exit_code());
}
