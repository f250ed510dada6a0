//! Updater pipeline lifecycle.
//!
//! [`Updater`] owns the reconciliation loop as a spawned tokio task and
//! implements the [`Pipeline`] trait the daemon drives. Construction
//! goes through [`UpdaterBuilder`], which hands back the notification
//! receiver alongside the updater.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use updock_core::error::{PipelineError, UpdockError};
use updock_core::event::NotifyEvent;
use updock_core::pipeline::{HealthStatus, Pipeline};

use crate::command::ToolRunner;
use crate::config::UpdaterConfig;
use crate::docker::DockerClient;
use crate::error::UpdaterError;
use crate::reconciler::Reconciler;

/// Default capacity of the notification channel.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdaterState {
    Initialized,
    Running,
    Stopped,
}

impl UpdaterState {
    fn name(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Container update pipeline.
///
/// Runs reconciliation passes on the configured interval until stopped,
/// or exactly once in run-once mode.
pub struct Updater<C, R> {
    state: UpdaterState,
    config: UpdaterConfig,
    docker: Arc<C>,
    reconciler: Option<Reconciler<C, R>>,
    task: Option<JoinHandle<()>>,
    finished: Arc<AtomicBool>,
    done: Arc<Notify>,
    passes: Arc<AtomicU64>,
}

impl<C, R> std::fmt::Debug for Updater<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: DockerClient, R: ToolRunner> Updater<C, R> {
    /// Number of completed passes.
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Current lifecycle state name, for logs.
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Waits until the pass loop has exited.
    ///
    /// Only returns for run-once updaters or after [`Pipeline::stop`];
    /// a periodic loop never finishes on its own.
    pub async fn wait_done(&self) {
        loop {
            let notified = self.done.notified();
            if self.finished.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

impl<C: DockerClient, R: ToolRunner> Pipeline for Updater<C, R> {
    async fn start(&mut self) -> Result<(), UpdockError> {
        match self.state {
            UpdaterState::Running => return Err(PipelineError::AlreadyRunning.into()),
            UpdaterState::Stopped => {
                return Err(
                    PipelineError::InitFailed("updater was already stopped".to_owned()).into(),
                );
            }
            UpdaterState::Initialized => {}
        }

        self.docker
            .ping()
            .await
            .map_err(|e| PipelineError::InitFailed(format!("docker unreachable: {e}")))?;

        let mut reconciler = self
            .reconciler
            .take()
            .ok_or_else(|| PipelineError::InitFailed("reconciler already consumed".to_owned()))?;

        let config = self.config.clone();
        let finished = Arc::clone(&self.finished);
        let done = Arc::clone(&self.done);
        let passes = Arc::clone(&self.passes);

        let task = tokio::spawn(async move {
            if config.dry_run {
                reconciler.announce_dry_run().await;
            }
            loop {
                let summary = reconciler.run_pass().await;
                passes.fetch_add(1, Ordering::Relaxed);
                if config.run_once {
                    info!(%summary, "single pass complete");
                    break;
                }
                tokio::time::sleep(config.check_interval).await;
            }
            finished.store(true, Ordering::SeqCst);
            done.notify_waiters();
        });

        self.task = Some(task);
        self.state = UpdaterState::Running;
        info!(
            interval_secs = self.config.check_interval.as_secs(),
            dry_run = self.config.dry_run,
            run_once = self.config.run_once,
            "updater started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), UpdockError> {
        if self.state != UpdaterState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                warn!(error = %e, "updater task ended abnormally");
            }
        }
        self.finished.store(true, Ordering::SeqCst);
        self.done.notify_waiters();
        self.state = UpdaterState::Stopped;
        info!("updater stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            UpdaterState::Initialized => HealthStatus::Degraded("not started".to_owned()),
            UpdaterState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
            UpdaterState::Running => match self.docker.ping().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Degraded(format!("docker unreachable: {e}")),
            },
        }
    }
}

/// Builder for [`Updater`].
///
/// `build` returns the updater together with the receiving half of the
/// notification channel, or `None` when notifications are disabled.
pub struct UpdaterBuilder<C, R> {
    config: UpdaterConfig,
    docker: Option<Arc<C>>,
    runner: Option<R>,
    events: bool,
    event_capacity: usize,
}

impl<C: DockerClient, R: ToolRunner> UpdaterBuilder<C, R> {
    /// Creates a builder from a validated config.
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            docker: None,
            runner: None,
            events: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the Docker client.
    pub fn docker(mut self, docker: Arc<C>) -> Self {
        self.docker = Some(docker);
        self
    }

    /// Sets the external tool runner.
    pub fn runner(mut self, runner: R) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Disables the notification channel entirely.
    pub fn without_events(mut self) -> Self {
        self.events = false;
        self
    }

    /// Overrides the notification channel capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Builds the updater and the notification receiver.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::Config` when the Docker client or tool
    /// runner is missing.
    pub fn build(self) -> Result<(Updater<C, R>, Option<mpsc::Receiver<NotifyEvent>>), UpdaterError>
    {
        let docker = self.docker.ok_or_else(|| UpdaterError::Config {
            field: "docker".to_owned(),
            reason: "docker client is required".to_owned(),
        })?;
        let runner = self.runner.ok_or_else(|| UpdaterError::Config {
            field: "runner".to_owned(),
            reason: "tool runner is required".to_owned(),
        })?;

        let (event_tx, event_rx) = if self.events {
            let (tx, rx) = mpsc::channel(self.event_capacity);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let reconciler = Reconciler::new(
            self.config.clone(),
            Arc::clone(&docker),
            runner,
            event_tx,
        );

        Ok((
            Updater {
                state: UpdaterState::Initialized,
                config: self.config,
                docker,
                reconciler: Some(reconciler),
                task: None,
                finished: Arc::new(AtomicBool::new(false)),
                done: Arc::new(Notify::new()),
                passes: Arc::new(AtomicU64::new(0)),
            },
            event_rx,
        ))
    }
}
