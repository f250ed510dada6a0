//! Reconciliation pass over the running container fleet.
//!
//! One pass lists the running containers and walks them sequentially:
//! skip list, tag check, rate limiter, freshness check, then the update
//! path for that container's deployment mode. Every failure is contained
//! at the container boundary; a broken container never aborts the pass
//! for the rest of the fleet. After the walk, unused images are pruned.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use updock_core::event::NotifyEvent;
use updock_core::metrics as metric_names;
use updock_core::types::{PassSummary, Severity, UpdateOutcome};

use crate::command::ToolRunner;
use crate::config::UpdaterConfig;
use crate::context::DeploymentContext;
use crate::docker::DockerClient;
use crate::error::UpdaterError;
use crate::executor::UpdateExecutor;
use crate::freshness::FreshnessChecker;
use crate::limiter::RateLimiter;
use crate::sweeper::CleanupSweeper;

/// Maps an update failure to the severity reported to the notifier.
///
/// A failed recreate left a container down, so it outranks everything
/// else. Tool failures mean an update was attempted and did not land.
/// Pull failures leave the fleet exactly as it was.
fn severity_for(err: &UpdaterError) -> Severity {
    match err {
        UpdaterError::Recreate { .. } => Severity::Critical,
        UpdaterError::ExternalTool { .. } => Severity::High,
        UpdaterError::ImagePull { .. } => Severity::Medium,
        UpdaterError::Prune(_) => Severity::Low,
        _ => Severity::Medium,
    }
}

/// Walks the container fleet once per invocation and applies updates.
pub struct Reconciler<C, R> {
    config: UpdaterConfig,
    docker: Arc<C>,
    checker: FreshnessChecker,
    executor: UpdateExecutor<C, R>,
    sweeper: CleanupSweeper<C>,
    limiter: RateLimiter,
    event_tx: Option<mpsc::Sender<NotifyEvent>>,
}

impl<C: DockerClient, R: ToolRunner> Reconciler<C, R> {
    /// Creates a reconciler over the given Docker client and tool runner.
    pub fn new(
        config: UpdaterConfig,
        docker: Arc<C>,
        runner: R,
        event_tx: Option<mpsc::Sender<NotifyEvent>>,
    ) -> Self {
        let checker = FreshnessChecker::new(config.dry_run);
        let executor = UpdateExecutor::new(
            Arc::clone(&docker),
            runner,
            config.compose_bin.clone(),
            config.dry_run,
        );
        let sweeper = CleanupSweeper::new(Arc::clone(&docker), config.dry_run);
        let limiter = RateLimiter::new(config.check_interval);
        Self {
            config,
            docker,
            checker,
            executor,
            sweeper,
            limiter,
            event_tx,
        }
    }

    /// Runs one pass at the current instant.
    pub async fn run_pass(&mut self) -> PassSummary {
        self.run_pass_at(Instant::now()).await
    }

    /// Runs one pass, evaluating the rate limiter at `now`.
    pub async fn run_pass_at(&mut self, now: Instant) -> PassSummary {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let mut summary = PassSummary::default();

        let containers = match self.docker.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                warn!(error = %e, "failed to list containers; skipping pass");
                self.emit(NotifyEvent::error(
                    "daemon",
                    &format!("failed to list containers: {e}"),
                    Severity::High,
                    &trace_id,
                ))
                .await;
                return summary;
            }
        };

        metrics::gauge!(metric_names::UPDATER_MONITORED_CONTAINERS)
            .set(containers.len() as f64);
        info!(containers = containers.len(), trace_id = %trace_id, "starting pass");

        for record in &containers {
            if self.config.is_skipped(&record.name) {
                debug!(container = %record.name, "on skip list");
                summary.skipped += 1;
                continue;
            }

            let Some(image) = record.image.clone() else {
                debug!(container = %record.name, "untagged image; skipping");
                summary.skipped += 1;
                continue;
            };

            if !self.limiter.acquire(&record.name, now) {
                debug!(
                    container = %record.name,
                    remaining_secs = self.limiter.remaining(&record.name, now).as_secs(),
                    "within check cooldown"
                );
                summary.skipped += 1;
                continue;
            }

            summary.checked += 1;
            metrics::counter!(metric_names::UPDATER_CONTAINERS_CHECKED_TOTAL).increment(1);

            let context = DeploymentContext::resolve(record);

            let outcome = match self
                .checker
                .check(self.docker.as_ref(), &image, &record.image_id)
                .await
            {
                Ok(report) if !report.newer => UpdateOutcome::UpToDate,
                Ok(_) => match self.executor.apply(record, &image, &context).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(container = %record.name, error = %e, "update failed");
                        UpdateOutcome::Failed {
                            severity: severity_for(&e),
                            reason: e.to_string(),
                        }
                    }
                },
                Err(e) => {
                    warn!(container = %record.name, error = %e, "freshness check failed");
                    UpdateOutcome::Failed {
                        severity: severity_for(&e),
                        reason: e.to_string(),
                    }
                }
            };

            match outcome {
                UpdateOutcome::UpToDate => {
                    debug!(container = %record.name, image = %image, "up to date");
                    self.emit(NotifyEvent::up_to_date(&record.name, &trace_id)).await;
                }
                UpdateOutcome::Updated { image } => {
                    info!(container = %record.name, image = %image, mode = context.mode_name(), "updated");
                    summary.updated += 1;
                    metrics::counter!(metric_names::UPDATER_UPDATES_APPLIED_TOTAL).increment(1);
                    self.emit(NotifyEvent::update(&record.name, &image, &trace_id)).await;
                }
                UpdateOutcome::Skipped { reason } => {
                    debug!(container = %record.name, %reason, "update skipped");
                    summary.skipped += 1;
                    metrics::counter!(metric_names::UPDATER_CONTAINERS_SKIPPED_TOTAL).increment(1);
                    self.emit(NotifyEvent::info(format!(
                        "dry-run: would update {} ({}) to {}: {}",
                        record.name,
                        context.mode_name(),
                        image,
                        self.executor.dry_run_plan(record, &image, &context),
                    )))
                    .await;
                }
                UpdateOutcome::Failed { severity, reason } => {
                    summary.failed += 1;
                    metrics::counter!(metric_names::UPDATER_UPDATE_FAILURES_TOTAL).increment(1);
                    self.emit(NotifyEvent::error(&record.name, &reason, severity, &trace_id))
                        .await;
                }
            }
        }

        if self.config.prune_after_pass {
            match self.sweeper.sweep().await {
                Ok(reclaimed) => {
                    summary.reclaimed_bytes = reclaimed;
                    metrics::counter!(metric_names::UPDATER_PRUNED_BYTES_TOTAL)
                        .increment(reclaimed);
                    if reclaimed > 0 {
                        self.emit(NotifyEvent::cleanup(reclaimed, &trace_id)).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "image prune failed");
                    self.emit(NotifyEvent::error(
                        "daemon",
                        &e.to_string(),
                        severity_for(&e),
                        &trace_id,
                    ))
                    .await;
                }
            }
        }

        metrics::counter!(metric_names::UPDATER_PASSES_TOTAL).increment(1);
        info!(
            %summary,
            tracked = self.limiter.tracked(),
            trace_id = %trace_id,
            "pass finished"
        );
        summary
    }

    /// Emits the one-time dry-run banner.
    pub async fn announce_dry_run(&self) {
        info!("dry-run mode active; no changes will be made");
        self.emit(NotifyEvent::dry_run_banner()).await;
    }

    async fn emit(&self, event: NotifyEvent) {
        if let Some(tx) = &self.event_tx
            && tx.send(event).await.is_err()
        {
            warn!("notify channel closed; dropping event");
        }
    }
}
