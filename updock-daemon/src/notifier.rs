//! Notification delivery.
//!
//! Drains the engine's [`NotifyEvent`] channel in a background task.
//! Every event is logged; when a webhook is configured the rendered
//! message is also POSTed as JSON. Delivery failures are counted and
//! logged, never propagated back into the update engine.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use updock_core::config::NotifyConfig;
use updock_core::event::{NotifyEvent, NotifyKind};
use updock_core::metrics as metric_names;
use updock_core::types::Severity;

/// Renders the human-readable message for a notification.
pub fn format_message(event: &NotifyEvent) -> String {
    match &event.kind {
        NotifyKind::DryRunBanner => {
            "dry-run mode active: reporting what would change, applying nothing".to_owned()
        }
        NotifyKind::Update { subject, image } => {
            format!("updated {subject} to {image}")
        }
        NotifyKind::UpToDate { subject } => format!("{subject} is up to date"),
        NotifyKind::Error { subject, detail } => {
            format!("[{}] {subject}: {detail}", event.severity)
        }
        NotifyKind::Cleanup { reclaimed_bytes } => {
            format!(
                "cleanup reclaimed {:.2} MB of unused images",
                *reclaimed_bytes as f64 / 1_048_576.0
            )
        }
        NotifyKind::Info { message } => message.clone(),
    }
}

/// Spawn the notification delivery task.
///
/// The task runs until the event channel closes or a shutdown signal
/// arrives. When `config.enabled` is false events are only logged.
pub fn spawn_notifier(
    mut event_rx: mpsc::Receiver<NotifyEvent>,
    config: NotifyConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = if config.enabled {
            match reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    error!(error = %e, "failed to build webhook client; logging only");
                    None
                }
            }
        } else {
            None
        };

        loop {
            tokio::select! {
                event_result = event_rx.recv() => {
                    match event_result {
                        Some(event) => {
                            deliver(&event, client.as_ref(), &config.webhook_url).await;
                        }
                        None => {
                            debug!("notify channel closed, exiting notifier");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Drain anything already queued before exiting.
                    while let Ok(event) = event_rx.try_recv() {
                        deliver(&event, client.as_ref(), &config.webhook_url).await;
                    }
                    debug!("notifier shutting down");
                    break;
                }
            }
        }
    })
}

async fn deliver(event: &NotifyEvent, client: Option<&reqwest::Client>, webhook_url: &str) {
    let message = format_message(event);

    metrics::counter!(
        metric_names::NOTIFIER_EVENTS_TOTAL,
        metric_names::LABEL_KIND => event.kind.name()
    )
    .increment(1);

    match event.severity {
        Severity::Critical | Severity::High => {
            error!(kind = event.kind.name(), trace_id = %event.metadata.trace_id, "{message}");
        }
        Severity::Medium => {
            warn!(kind = event.kind.name(), trace_id = %event.metadata.trace_id, "{message}");
        }
        _ => {
            info!(kind = event.kind.name(), trace_id = %event.metadata.trace_id, "{message}");
        }
    }

    let Some(client) = client else { return };

    let payload = serde_json::json!({ "text": message });
    match client.post(webhook_url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(kind = event.kind.name(), "webhook delivered");
        }
        Ok(response) => {
            warn!(
                status = %response.status(),
                kind = event.kind.name(),
                "webhook returned non-success status"
            );
            metrics::counter!(metric_names::NOTIFIER_DELIVERY_FAILURES_TOTAL).increment(1);
        }
        Err(e) => {
            warn!(error = %e, kind = event.kind.name(), "webhook delivery failed");
            metrics::counter!(metric_names::NOTIFIER_DELIVERY_FAILURES_TOTAL).increment(1);
        }
    }
}
