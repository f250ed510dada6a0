//! Container update engine.
//!
//! Periodically reconciles the running container fleet against what
//! registries serve: a pass lists running containers, rate-limits
//! per-container checks, pulls each image reference, and applies updates
//! along the path a container's deployment mode requires (orchestrator
//! service rollout, compose refresh, or standalone recreation).
//! Notifications stream out as [`updock_core::NotifyEvent`]s.
//!
//! The entry point is [`UpdaterBuilder`], which wires a [`DockerClient`]
//! and a [`ToolRunner`] into an [`Updater`] pipeline.

pub mod command;
pub mod config;
pub mod context;
pub mod docker;
pub mod error;
pub mod executor;
pub mod freshness;
pub mod limiter;
pub mod reconciler;
pub mod sweeper;
pub mod updater;

pub use command::{SystemToolRunner, ToolOutput, ToolRunner};
pub use config::UpdaterConfig;
pub use context::DeploymentContext;
pub use docker::{BollardDockerClient, DockerClient};
pub use error::UpdaterError;
pub use executor::UpdateExecutor;
pub use freshness::{FreshnessChecker, FreshnessReport};
pub use limiter::RateLimiter;
pub use reconciler::Reconciler;
pub use sweeper::CleanupSweeper;
pub use updater::{Updater, UpdaterBuilder};
