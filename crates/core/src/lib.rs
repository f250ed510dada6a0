#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- re-exports of the main types ---
// The core types of each module are usable straight from the crate root.

// errors
pub use error::{ConfigError, NotifyError, PipelineError, UpdateError, UpdockError};

// config
pub use config::UpdockConfig;

// events
pub use event::{Event, EventMetadata, NotifyEvent, NotifyKind};

// pipeline trait
pub use pipeline::{HealthStatus, Pipeline};

// domain types
pub use types::{
    ContainerRecord, MountBinding, PassSummary, PortBinding, Severity, UpdateOutcome,
};
