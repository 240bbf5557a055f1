use crate::batch::{BatchRestClient, PoolController};
use crate::cli::args::Application;
use crate::config::ControllerConfig;
use crate::error::Result;
use tracing::info;

/// Pool configured for `app`
pub fn pool_id(app: Application, config: &ControllerConfig) -> &str {
    match app {
        Application::Azfinsim => config.pools.azfinsim.as_str(),
        Application::LuleshCatalyst => config.pools.lulesh_catalyst.as_str(),
        Application::Trame => config.pools.trame.as_str(),
    }
}

pub async fn run_pool_command(
    app: Application,
    resize: Option<u32>,
    config: &ControllerConfig,
    dry_run: bool,
) -> Result<()> {
    let pool_id = pool_id(app, config);

    if dry_run {
        match resize {
            Some(size) => println!("Would resize pool {} to {} dedicated nodes", pool_id, size),
            None => println!("Would describe pool {}", pool_id),
        }
        return Ok(());
    }

    let client = BatchRestClient::new(
        config.endpoint()?,
        config.batch.api_version.clone(),
        config.batch.access_token.clone(),
        config.batch.timeout(),
    )?;
    execute(&client, pool_id, resize).await
}

async fn execute(controller: &dyn PoolController, pool_id: &str, resize: Option<u32>) -> Result<()> {
    match resize {
        Some(size) => {
            controller.resize(pool_id, size).await.map_err(|e| {
                e.into_pool_error(pool_id)
                    .with_context(format!("resizing to {} nodes", size))
            })?;
            info!(pool_id, target = size, "Pool resize requested");
            println!("Resizing pool {} to {} dedicated nodes", pool_id, size);
        }
        None => {
            let pool = controller
                .describe(pool_id)
                .await
                .map_err(|e| e.into_pool_error(pool_id))?;
            println!("{}", pool);
        }
    }
    Ok(())
}
