//! `gofer-ext-github`: the GitHub webhook extension process.

use gofer_extension::{Harness, SystemConfig, init_logging};
use gofer_github::{GithubConfig, GithubExtension};
use gofer_host::HostClient;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = SystemConfig::from_env()?;
    init_logging(&config.log_level, config.log_format)?;

    let github_config = GithubConfig::from_system(&config)?;
    let host = HostClient::new(&config.host_client_config())?;
    let extension = GithubExtension::new(&github_config, config.request_timeout())?;

    info!(
        extension_id = %config.extension_id,
        api_url = %github_config.api_url,
        check_reports = extension.reports_checks(),
        "Starting GitHub extension"
    );

    Harness::new(config, Arc::new(extension), Arc::new(host))
        .run()
        .await?;

    Ok(())
}
