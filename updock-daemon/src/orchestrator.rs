//! Daemon assembly and lifecycle management.
//!
//! The [`Orchestrator`] wires the update engine together: it validates
//! configuration, installs the metrics recorder, connects the Docker
//! client, spawns the notifier, and drives the updater pipeline until a
//! shutdown signal arrives (or the single pass finishes in run-once
//! mode).

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use updock_core::config::UpdockConfig;
use updock_core::event::NotifyEvent;
use updock_core::pipeline::{HealthStatus, Pipeline};
use updock_updater::{
    BollardDockerClient, SystemToolRunner, Updater, UpdaterBuilder, UpdaterConfig,
};

use crate::metrics_server;
use crate::notifier;

/// The main daemon orchestrator.
///
/// Owns the updater pipeline and the notifier task, and manages PID file
/// handling plus graceful shutdown on SIGTERM/SIGINT.
pub struct Orchestrator {
    config: UpdockConfig,
    updater: Updater<BollardDockerClient, SystemToolRunner>,
    event_rx: Option<mpsc::Receiver<NotifyEvent>>,
    shutdown_tx: broadcast::Sender<()>,
    start_time: Instant,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Load configuration from disk and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, validation
    /// fails, or the Docker socket is unreachable.
    #[allow(dead_code)] // Public API for tests
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = UpdockConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: UpdockConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if !config.updater.enabled {
            return Err(anyhow::anyhow!(
                "updater is disabled in config; nothing to run"
            ));
        }

        // Install metrics recorder before anything records
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let updater_config = UpdaterConfig::from_core(&config)
            .map_err(|e| anyhow::anyhow!("invalid updater config: {}", e))?;

        tracing::info!(socket = %updater_config.docker_socket, "connecting to docker");
        let docker = Arc::new(BollardDockerClient::connect_with_socket(
            &updater_config.docker_socket,
        )?);
        let runner = SystemToolRunner::new(updater_config.tool_timeout);

        let (updater, event_rx) = UpdaterBuilder::new(updater_config)
            .docker(docker)
            .runner(runner)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build updater: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!("orchestrator initialized");

        Ok(Self {
            config,
            updater,
            event_rx,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Start the updater and block until shutdown.
    ///
    /// In run-once mode this returns after the single pass completes.
    /// Otherwise it blocks until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        if !self.config.general.pid_file.is_empty() {
            write_pid_file(Path::new(&self.config.general.pid_file))?;
        }

        let mut notifier_task = self.event_rx.take().map(|rx| {
            notifier::spawn_notifier(
                rx,
                self.config.notify.clone(),
                self.shutdown_tx.subscribe(),
            )
        });

        if let Err(e) = self.updater.start().await {
            tracing::error!(error = %e, "updater failed to start");
            self.cleanup_pid_file();
            return Err(e.into());
        }

        let mut uptime_task = self.config.metrics.enabled.then(|| {
            spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe())
        });

        if self.config.updater.run_once {
            tracing::info!("run-once mode; waiting for pass to complete");
            self.updater.wait_done().await;
        } else {
            tracing::info!("entering main loop");
            let signal = wait_for_shutdown_signal().await?;
            tracing::info!(signal = signal, "shutdown signal received");
        }

        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.updater.stop().await {
            tracing::error!(error = %e, "failed to stop updater");
        }

        if let Some(task) = notifier_task.take() {
            let _ = task.await;
        }
        if let Some(task) = uptime_task.take() {
            let _ = task.await;
        }

        self.cleanup_pid_file();
        Ok(())
    }

    /// Current health of the updater pipeline.
    #[allow(dead_code)] // Public API for introspection
    pub async fn health(&self) -> HealthStatus {
        self.updater.health_check().await
    }

    /// Get a reference to the loaded configuration.
    #[allow(dead_code)] // Public API for introspection
    pub fn config(&self) -> &UpdockConfig {
        &self.config
    }

    fn cleanup_pid_file(&self) {
        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }
    }
}

/// Wait for SIGTERM or SIGINT; returns the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Refuses to overwrite an existing file so a second daemon instance
/// fails fast. Creation uses `create_new` so the existence check and the
/// write are one atomic operation.
fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    // Reject anything that is not a regular file (symlink swap).
    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on shutdown; logs instead of failing.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Record daemon-level metrics once at startup.
fn record_daemon_metrics() {
    use updock_core::metrics as m;
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Periodically refresh the uptime gauge for Prometheus scrapes.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use updock_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
