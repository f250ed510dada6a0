use anyhow::Result;
use clap::Parser;

use updock_core::config::UpdockConfig;
use updock_daemon::cli::DaemonCli;
use updock_daemon::logging;
use updock_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonCli::parse();

    let mut config = UpdockConfig::load(&args.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", args.config.display(), e))?;

    // CLI flags outrank the config file and environment overrides.
    if let Some(level) = args.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.general.log_format = format;
    }
    if let Some(pid_file) = args.pid_file {
        config.general.pid_file = pid_file;
    }
    if args.dry_run {
        config.updater.dry_run = true;
    }
    if args.once {
        config.updater.run_once = true;
    }

    if args.validate {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        println!("configuration OK: {}", args.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "updock-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("updock-daemon shut down");
    Ok(())
}
