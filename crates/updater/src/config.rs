//! Updater engine configuration.
//!
//! [`UpdaterConfig`] is the validated, engine-facing form of the
//! `[updater]` section of `updock.toml`. Conversion from the file form
//! happens in [`UpdaterConfig::from_core`]; everything downstream works
//! with durations and owned lists instead of raw seconds and strings.

use std::time::Duration;

use updock_core::config::UpdockConfig;

use crate::error::UpdaterError;

/// Minimum allowed check interval.
pub const MIN_CHECK_INTERVAL_SECS: u64 = 1;
/// Maximum allowed check interval (24 hours).
pub const MAX_CHECK_INTERVAL_SECS: u64 = 86_400;
/// Maximum allowed external tool timeout (1 hour).
pub const MAX_TOOL_TIMEOUT_SECS: u64 = 3_600;

/// Validated updater engine configuration.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Docker socket path.
    pub docker_socket: String,
    /// Interval between passes; also the per-container check cooldown.
    pub check_interval: Duration,
    /// Container names excluded from checking.
    pub skip_containers: Vec<String>,
    /// Report what would change without mutating anything.
    pub dry_run: bool,
    /// Run a single pass and stop.
    pub run_once: bool,
    /// Prune unused images after each pass.
    pub prune_after_pass: bool,
    /// Compose CLI binary.
    pub compose_bin: String,
    /// Timeout for external tool invocations.
    pub tool_timeout: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            check_interval: Duration::from_secs(300),
            skip_containers: Vec::new(),
            dry_run: false,
            run_once: false,
            prune_after_pass: true,
            compose_bin: "docker-compose".to_owned(),
            tool_timeout: Duration::from_secs(300),
        }
    }
}

impl UpdaterConfig {
    /// Builds a validated engine config from the loaded file config.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::Config` when a field is out of range.
    pub fn from_core(config: &UpdockConfig) -> Result<Self, UpdaterError> {
        let section = &config.updater;
        let result = Self {
            docker_socket: section.docker_socket.clone(),
            check_interval: Duration::from_secs(section.check_interval_secs),
            skip_containers: section.skip_containers.clone(),
            dry_run: section.dry_run,
            run_once: section.run_once,
            prune_after_pass: section.prune_after_pass,
            compose_bin: section.compose_bin.clone(),
            tool_timeout: Duration::from_secs(section.tool_timeout_secs),
        };
        result.validate()?;
        Ok(result)
    }

    /// Validates field ranges.
    pub fn validate(&self) -> Result<(), UpdaterError> {
        if self.docker_socket.is_empty() {
            return Err(UpdaterError::Config {
                field: "docker_socket".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        let interval = self.check_interval.as_secs();
        if !(MIN_CHECK_INTERVAL_SECS..=MAX_CHECK_INTERVAL_SECS).contains(&interval) {
            return Err(UpdaterError::Config {
                field: "check_interval_secs".to_owned(),
                reason: format!(
                    "must be between {MIN_CHECK_INTERVAL_SECS} and {MAX_CHECK_INTERVAL_SECS}, got {interval}"
                ),
            });
        }
        if self.compose_bin.is_empty() {
            return Err(UpdaterError::Config {
                field: "compose_bin".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        let timeout = self.tool_timeout.as_secs();
        if timeout == 0 || timeout > MAX_TOOL_TIMEOUT_SECS {
            return Err(UpdaterError::Config {
                field: "tool_timeout_secs".to_owned(),
                reason: format!("must be between 1 and {MAX_TOOL_TIMEOUT_SECS}, got {timeout}"),
            });
        }
        Ok(())
    }

    /// Whether a container name is on the skip list.
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_containers.iter().any(|s| s == name)
    }
}
