use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;

use tracing::{error, info, warn};

use hattrick::{AppConfig, AppServices, Logger, RunOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // guards are kept alive to flush logs and keep sentry connected until the very end
    let _guards = Logger::init(config.cargo_env, config.sentry_dsn.clone());

    info!("logger and env prepped...");

    let services = AppServices::new(config).context("failed to prepare services")?;

    let outcome = match services.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("run aborted: {}", e);
            return Err(e).context("run aborted");
        }
    };

    match outcome {
        RunOutcome::Written { channels, path } => {
            info!("done! {} valid channels", channels);
            info!("playlist: {}", path.display());
        }
        RunOutcome::NoChannels => warn!("no channels found, exiting"),
        RunOutcome::NothingFound => warn!("no valid stream found, playlist not written"),
    }

    Ok(())
}
