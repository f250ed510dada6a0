//! Domain types shared across all updock crates.
//!
//! The updater engine and the daemon exchange data exclusively through
//! these types and the events built on top of them.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Severity level for outcomes and notifications.
///
/// `Ord` is implemented so severities can be compared
/// (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// Informational.
    #[default]
    Info,
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical — operator attention required.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A single published port of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Container-side port and protocol, e.g. `"80/tcp"`.
    pub container_port: String,
    /// Host IP the port is bound to (empty means all interfaces).
    pub host_ip: String,
    /// Host-side port.
    pub host_port: String,
}

/// A single mount of a container, identified by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountBinding {
    /// Host path or volume name.
    pub source: String,
    /// Mount point inside the container.
    pub destination: String,
    /// Mount mode, e.g. `"rw"` or `"ro"`.
    pub mode: String,
}

/// Read-only snapshot of a running container.
///
/// Captures both the identity needed for update decisions (image
/// reference, image id, labels) and the runtime spec needed to recreate
/// the container under the same name (ports, env, mounts, restart policy,
/// network mode). Updock never mutates a record; replacing a container
/// produces a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container id.
    pub id: String,
    /// Container name without the leading slash.
    pub name: String,
    /// Image reference the container was started from.
    ///
    /// `None` for containers running an untagged image; those cannot be
    /// checked for updates and are skipped.
    pub image: Option<String>,
    /// Id of the image the container is currently running.
    pub image_id: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
    /// Published ports.
    pub ports: Vec<PortBinding>,
    /// Environment variables in `KEY=value` form.
    pub env: Vec<String>,
    /// Mounts.
    pub mounts: Vec<MountBinding>,
    /// Restart policy name, e.g. `"unless-stopped"`.
    pub restart_policy: Option<String>,
    /// Network mode, e.g. `"bridge"` or `"host"`.
    pub network_mode: Option<String>,
    /// Creation time.
    pub created_at: SystemTime,
}

impl fmt::Display for ContainerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) image={}",
            self.name,
            &self.id[..12.min(self.id.len())],
            self.image.as_deref().unwrap_or("<untagged>"),
        )
    }
}

/// Terminal outcome of processing one container in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// The running image matches the newest available image.
    UpToDate,
    /// An update was applied.
    Updated {
        /// Image reference the container was updated to.
        image: String,
    },
    /// The container was not processed.
    Skipped {
        /// Why it was skipped (skip list, cooldown, dry-run, untagged).
        reason: String,
    },
    /// The update was attempted and failed.
    Failed {
        /// How bad the failure is. `Critical` means the container may be
        /// left absent (recreate failure after removal).
        severity: Severity,
        /// Failure detail, including tool stderr where applicable.
        reason: String,
    },
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up-to-date"),
            Self::Updated { image } => write!(f, "updated to {image}"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { severity, reason } => write!(f, "failed [{severity}] {reason}"),
        }
    }
}

/// Aggregate result of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Containers that went through a freshness check.
    pub checked: u64,
    /// Updates applied.
    pub updated: u64,
    /// Per-container failures.
    pub failed: u64,
    /// Containers skipped (skip list, cooldown, untagged, dry-run).
    pub skipped: u64,
    /// Bytes reclaimed by the cleanup sweep.
    pub reclaimed_bytes: u64,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} updated={} failed={} skipped={} reclaimed={}B",
            self.checked, self.updated, self.failed, self.skipped, self.reclaimed_bytes,
        )
    }
}
