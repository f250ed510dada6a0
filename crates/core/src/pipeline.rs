//! Pipeline trait — the lifecycle contract between the daemon and modules.

use std::future::Future;

use crate::error::UpdockError;

/// Health of a running module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational with reduced capability (e.g. Docker unreachable).
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

impl HealthStatus {
    /// Returns true for `Healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Returns true for `Degraded`.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Returns true for `Unhealthy`.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// Lifecycle contract implemented by long-running modules.
///
/// The daemon drives every module through the same
/// start / stop / health_check cycle.
pub trait Pipeline: Send {
    /// Starts the module and spawns its background tasks.
    fn start(&mut self) -> impl Future<Output = Result<(), UpdockError>> + Send;

    /// Stops the module and joins its background tasks.
    fn stop(&mut self) -> impl Future<Output = Result<(), UpdockError>> + Send;

    /// Reports the module's current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
