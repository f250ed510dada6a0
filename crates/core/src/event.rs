//! Event system — notifications emitted by the update engine.
//!
//! The engine never talks to a notification transport directly. It emits
//! [`NotifyEvent`]s over an mpsc channel; the daemon decides where they
//! go (webhook, log, or both). [`EventMetadata`] carries the trace id
//! that links every event of one reconciliation pass.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::Severity;

// --- module name constants ---

/// Update engine module name.
pub const MODULE_UPDATER: &str = "updater";
/// Daemon module name.
pub const MODULE_DAEMON: &str = "daemon";

// --- event type constants ---

/// Notification event type.
pub const EVENT_TYPE_NOTIFY: &str = "notify";

/// Metadata common to all events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// When the event was produced.
    pub timestamp: SystemTime,
    /// Module that produced the event (e.g. "updater").
    pub source_module: String,
    /// Trace id linking events of the same flow.
    pub trace_id: String,
}

impl EventMetadata {
    /// Creates metadata reusing an existing trace id.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// Creates metadata with a fresh UUID v4 trace id.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// Base trait implemented by all event types.
///
/// `Send + Sync + 'static` bounds guarantee safe transfer over
/// `tokio::mpsc` channels.
pub trait Event: Send + Sync + 'static {
    /// Unique event id (UUID v4).
    fn event_id(&self) -> &str;

    /// Event metadata (timestamp, source module, trace id).
    fn metadata(&self) -> &EventMetadata;

    /// Event type name, used for logging and routing.
    fn event_type(&self) -> &str;
}

/// What a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    /// Emitted once at startup when dry-run mode is active.
    DryRunBanner,
    /// An update was applied to a container or service.
    Update {
        /// Container or service name.
        subject: String,
        /// Image the subject was updated to.
        image: String,
    },
    /// A container was checked and is already current.
    UpToDate {
        /// Container name.
        subject: String,
    },
    /// A per-container or pass-level error.
    Error {
        /// Container name or pass-level subject.
        subject: String,
        /// Error detail.
        detail: String,
    },
    /// The cleanup sweep reclaimed disk space.
    Cleanup {
        /// Bytes reclaimed by the image prune.
        reclaimed_bytes: u64,
    },
    /// Free-form informational message.
    Info {
        /// Message text.
        message: String,
    },
}

impl NotifyKind {
    /// Stable kind name for metric labels and routing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DryRunBanner => "dry_run_banner",
            Self::Update { .. } => "update",
            Self::UpToDate { .. } => "up_to_date",
            Self::Error { .. } => "error",
            Self::Cleanup { .. } => "cleanup",
            Self::Info { .. } => "info",
        }
    }
}

/// Notification event emitted by the update engine.
#[derive(Debug, Clone)]
pub struct NotifyEvent {
    /// Unique event id.
    pub id: String,
    /// Event metadata.
    pub metadata: EventMetadata,
    /// What the notification is about.
    pub kind: NotifyKind,
    /// Severity of the notification.
    pub severity: Severity,
}

impl NotifyEvent {
    /// Creates an event with a fresh trace.
    pub fn new(kind: NotifyKind, severity: Severity) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_UPDATER),
            kind,
            severity,
        }
    }

    /// Creates an event linked to an existing trace.
    pub fn with_trace(kind: NotifyKind, severity: Severity, trace_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_UPDATER, trace_id),
            kind,
            severity,
        }
    }

    /// Dry-run banner, emitted once at startup.
    pub fn dry_run_banner() -> Self {
        Self::new(NotifyKind::DryRunBanner, Severity::Info)
    }

    /// An applied update.
    pub fn update(
        subject: impl Into<String>,
        image: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self::with_trace(
            NotifyKind::Update {
                subject: subject.into(),
                image: image.into(),
            },
            Severity::Info,
            trace_id,
        )
    }

    /// A container confirmed current.
    pub fn up_to_date(subject: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::with_trace(
            NotifyKind::UpToDate {
                subject: subject.into(),
            },
            Severity::Info,
            trace_id,
        )
    }

    /// An error notification at the given severity.
    pub fn error(
        subject: impl Into<String>,
        detail: impl Into<String>,
        severity: Severity,
        trace_id: impl Into<String>,
    ) -> Self {
        Self::with_trace(
            NotifyKind::Error {
                subject: subject.into(),
                detail: detail.into(),
            },
            severity,
            trace_id,
        )
    }

    /// A cleanup report.
    pub fn cleanup(reclaimed_bytes: u64, trace_id: impl Into<String>) -> Self {
        Self::with_trace(
            NotifyKind::Cleanup { reclaimed_bytes },
            Severity::Info,
            trace_id,
        )
    }

    /// A free-form informational message.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(
            NotifyKind::Info {
                message: message.into(),
            },
            Severity::Info,
        )
    }
}

impl Event for NotifyEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_NOTIFY
    }
}

impl fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NotifyEvent[{}] kind={} severity={}",
            &self.id[..8.min(self.id.len())],
            self.kind.name(),
            self.severity,
        )
    }
}

/// Renders a SystemTime as Unix seconds for display.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => format!("{}", duration.as_secs()),
        Err(_) => "unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_new_preserves_trace_id() {
        let meta = EventMetadata::new("updater", "trace-abc-123");
        assert_eq!(meta.source_module, "updater");
        assert_eq!(meta.trace_id, "trace-abc-123");
        assert!(meta.timestamp <= SystemTime::now());
    }

    #[test]
    fn metadata_with_new_trace_generates_uuid() {
        let meta = EventMetadata::with_new_trace("updater");
        // UUID v4 format: 8-4-4-4-12
        assert_eq!(meta.trace_id.len(), 36);
        assert_eq!(meta.trace_id.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn notify_event_implements_event_trait() {
        let event = NotifyEvent::dry_run_banner();
        assert_eq!(event.event_type(), "notify");
        assert!(!event.event_id().is_empty());
        assert_eq!(event.metadata().source_module, "updater");
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(NotifyKind::DryRunBanner.name(), "dry_run_banner");
        assert_eq!(
            NotifyKind::Update {
                subject: "web".to_owned(),
                image: "nginx:latest".to_owned()
            }
            .name(),
            "update"
        );
        assert_eq!(
            NotifyKind::UpToDate {
                subject: "web".to_owned()
            }
            .name(),
            "up_to_date"
        );
        assert_eq!(
            NotifyKind::Error {
                subject: "web".to_owned(),
                detail: "boom".to_owned()
            }
            .name(),
            "error"
        );
        assert_eq!(NotifyKind::Cleanup { reclaimed_bytes: 0 }.name(), "cleanup");
        assert_eq!(
            NotifyKind::Info {
                message: "hello".to_owned()
            }
            .name(),
            "info"
        );
    }

    #[test]
    fn update_event_links_trace() {
        let event = NotifyEvent::update("web", "nginx:latest", "pass-trace-1");
        assert_eq!(event.metadata.trace_id, "pass-trace-1");
        assert!(matches!(event.kind, NotifyKind::Update { .. }));
    }

    #[test]
    fn error_event_carries_severity() {
        let event = NotifyEvent::error("web", "create failed", Severity::Critical, "t");
        assert_eq!(event.severity, Severity::Critical);
    }

    #[test]
    fn notify_event_display() {
        let event = NotifyEvent::cleanup(2048, "t");
        let display = event.to_string();
        assert!(display.contains("cleanup"));
        assert!(display.contains("NotifyEvent"));
    }

    #[test]
    fn events_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<NotifyEvent>();
    }
}
