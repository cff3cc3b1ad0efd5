//! `gofer-ext-cron`: the cron extension process.

use gofer_cron::{CronConfig, CronExtension};
use gofer_extension::{Harness, SystemConfig, init_logging};
use gofer_host::HostClient;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = SystemConfig::from_env()?;
    init_logging(&config.log_level, config.log_format)?;

    let cron_config = CronConfig::from_system(&config)?;
    let host = HostClient::new(&config.host_client_config())?;

    info!(
        extension_id = %config.extension_id,
        tick_interval_secs = cron_config.tick_interval.as_secs(),
        "Starting cron extension"
    );

    let extension = CronExtension::new(cron_config);
    Harness::new(config, Arc::new(extension), Arc::new(host))
        .run()
        .await?;

    Ok(())
}
