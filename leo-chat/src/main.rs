//! Leo Chat - Main entry point.

use anyhow::Result;
use leo_common::config::Config;
use leo_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Leo Chat v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    leo_chat::start_server(&config).await
}
