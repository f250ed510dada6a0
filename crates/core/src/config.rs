//! Configuration — `updock.toml` parsing and runtime settings.
//!
//! [`UpdockConfig`] is the top-level structure holding every section.
//!
//! # Loading precedence
//! 1. CLI arguments (highest)
//! 2. Environment variables (`UPDOCK_UPDATER_DRY_RUN=true` form)
//! 3. Config file (`updock.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), updock_core::error::UpdockError> {
//! use updock_core::config::UpdockConfig;
//!
//! // Load from file and apply env overrides
//! let config = UpdockConfig::load("updock.toml").await?;
//!
//! // Or parse a TOML string directly
//! let config = UpdockConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, UpdockError};

/// Top-level updock configuration.
///
/// Mirrors the structure of `updock.toml`. Each component reads only its
/// own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdockConfig {
    /// General settings (logging, pid file).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Update engine settings.
    #[serde(default)]
    pub updater: UpdaterSection,
    /// Notification settings.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Metrics endpoint settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl UpdockConfig {
    /// Loads configuration from a TOML file and applies env overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UpdockError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file (no env overrides).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UpdockError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UpdockError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                UpdockError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, UpdockError> {
        toml::from_str(toml_str).map_err(|e| {
            UpdockError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides settings from environment variables.
    ///
    /// Naming rule: `UPDOCK_{SECTION}_{FIELD}`,
    /// e.g. `UPDOCK_UPDATER_CHECK_INTERVAL_SECS=600`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "UPDOCK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "UPDOCK_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "UPDOCK_GENERAL_PID_FILE");

        // Updater
        override_bool(&mut self.updater.enabled, "UPDOCK_UPDATER_ENABLED");
        override_string(
            &mut self.updater.docker_socket,
            "UPDOCK_UPDATER_DOCKER_SOCKET",
        );
        override_u64(
            &mut self.updater.check_interval_secs,
            "UPDOCK_UPDATER_CHECK_INTERVAL_SECS",
        );
        override_csv(
            &mut self.updater.skip_containers,
            "UPDOCK_UPDATER_SKIP_CONTAINERS",
        );
        override_bool(&mut self.updater.dry_run, "UPDOCK_UPDATER_DRY_RUN");
        override_bool(&mut self.updater.run_once, "UPDOCK_UPDATER_RUN_ONCE");
        override_bool(
            &mut self.updater.prune_after_pass,
            "UPDOCK_UPDATER_PRUNE_AFTER_PASS",
        );
        override_string(&mut self.updater.compose_bin, "UPDOCK_UPDATER_COMPOSE_BIN");
        override_u64(
            &mut self.updater.tool_timeout_secs,
            "UPDOCK_UPDATER_TOOL_TIMEOUT_SECS",
        );

        // Notify
        override_bool(&mut self.notify.enabled, "UPDOCK_NOTIFY_ENABLED");
        override_string(&mut self.notify.webhook_url, "UPDOCK_NOTIFY_WEBHOOK_URL");
        override_u64(&mut self.notify.timeout_secs, "UPDOCK_NOTIFY_TIMEOUT_SECS");

        // Metrics
        override_bool(&mut self.metrics.enabled, "UPDOCK_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "UPDOCK_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "UPDOCK_METRICS_PORT");
    }

    /// Validates all settings.
    pub fn validate(&self) -> Result<(), UpdockError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.updater.enabled {
            if self.updater.check_interval_secs == 0
                || self.updater.check_interval_secs > 86_400
            {
                return Err(ConfigError::InvalidValue {
                    field: "updater.check_interval_secs".to_owned(),
                    reason: "must be 1-86400".to_owned(),
                }
                .into());
            }

            if self.updater.docker_socket.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "updater.docker_socket".to_owned(),
                    reason: "must not be empty when updater is enabled".to_owned(),
                }
                .into());
            }

            if self.updater.compose_bin.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "updater.compose_bin".to_owned(),
                    reason: "must not be empty when updater is enabled".to_owned(),
                }
                .into());
            }
        }

        if self.notify.enabled && self.notify.webhook_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "notify.webhook_url".to_owned(),
                reason: "must not be empty when notify is enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
    /// PID file path.
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: "/var/run/updock.pid".to_owned(),
        }
    }
}

/// Update engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterSection {
    /// Whether the update engine runs.
    pub enabled: bool,
    /// Docker socket path.
    pub docker_socket: String,
    /// Pass interval and per-container cooldown (seconds).
    pub check_interval_secs: u64,
    /// Container names never checked for updates.
    pub skip_containers: Vec<String>,
    /// Simulate updates without performing any mutating operation.
    pub dry_run: bool,
    /// Run a single pass and exit instead of looping.
    pub run_once: bool,
    /// Prune unused images after each pass.
    pub prune_after_pass: bool,
    /// Compose binary used for compose-managed services.
    pub compose_bin: String,
    /// Timeout for external tool invocations (seconds).
    pub tool_timeout_secs: u64,
}

impl Default for UpdaterSection {
    fn default() -> Self {
        Self {
            enabled: true,
            docker_socket: "/var/run/docker.sock".to_owned(),
            check_interval_secs: 300,
            skip_containers: Vec::new(),
            dry_run: false,
            run_once: false,
            prune_after_pass: true,
            compose_bin: "docker-compose".to_owned(),
            tool_timeout_secs: 300,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Whether webhook delivery is enabled; events are logged either way.
    pub enabled: bool,
    /// Webhook URL notifications are POSTed to.
    pub webhook_url: String,
    /// Delivery timeout (seconds).
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Metrics endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the Prometheus endpoint is served.
    pub enabled: bool,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub port: u16,
    /// Scrape endpoint path.
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = UpdockConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(config.updater.enabled);
        assert_eq!(config.updater.check_interval_secs, 300);
        assert!(!config.updater.dry_run);
        assert!(!config.notify.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = UpdockConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = UpdockConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.updater.compose_bin, "docker-compose");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[updater]
check_interval_secs = 60
skip_containers = ["db", "cache"]
"#;
        let config = UpdockConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format keeps its default
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.updater.check_interval_secs, 60);
        assert_eq!(config.updater.skip_containers, vec!["db", "cache"]);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
pid_file = "/tmp/updock.pid"

[updater]
enabled = true
docker_socket = "/run/docker.sock"
check_interval_secs = 120
skip_containers = ["db"]
dry_run = true
run_once = true
prune_after_pass = false
compose_bin = "docker-compose"
tool_timeout_secs = 60

[notify]
enabled = true
webhook_url = "https://hooks.example.com/updock"
timeout_secs = 5

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9999
"#;
        let config = UpdockConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert!(config.updater.dry_run);
        assert!(config.updater.run_once);
        assert!(!config.updater.prune_after_pass);
        assert_eq!(config.notify.webhook_url, "https://hooks.example.com/updock");
        assert_eq!(config.metrics.port, 9999);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = UpdockConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            UpdockError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = UpdockConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = UpdockConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_interval_when_enabled() {
        let mut config = UpdockConfig::default();
        config.updater.check_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("check_interval_secs"));
    }

    #[test]
    fn validate_skips_interval_when_disabled() {
        let mut config = UpdockConfig::default();
        config.updater.enabled = false;
        config.updater.check_interval_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_webhook_when_notify_enabled() {
        let mut config = UpdockConfig::default();
        config.notify.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("webhook_url"));
    }

    #[test]
    #[serial]
    fn env_override_interval_and_skip_list() {
        let mut config = UpdockConfig::default();
        // SAFETY: serialized test, no concurrent env access.
        unsafe {
            std::env::set_var("UPDOCK_UPDATER_CHECK_INTERVAL_SECS", "600");
            std::env::set_var("UPDOCK_UPDATER_SKIP_CONTAINERS", "db, cache");
        }
        config.apply_env_overrides();
        assert_eq!(config.updater.check_interval_secs, 600);
        assert_eq!(config.updater.skip_containers, vec!["db", "cache"]);
        unsafe {
            std::env::remove_var("UPDOCK_UPDATER_CHECK_INTERVAL_SECS");
            std::env::remove_var("UPDOCK_UPDATER_SKIP_CONTAINERS");
        }
    }

    #[test]
    #[serial]
    fn env_override_invalid_bool_keeps_original() {
        let mut config = UpdockConfig::default();
        // SAFETY: serialized test, no concurrent env access.
        unsafe { std::env::set_var("UPDOCK_UPDATER_DRY_RUN", "not-a-bool") };
        config.apply_env_overrides();
        assert!(!config.updater.dry_run);
        unsafe { std::env::remove_var("UPDOCK_UPDATER_DRY_RUN") };
    }

    #[test]
    #[serial]
    fn env_override_missing_var_keeps_original() {
        let mut config = UpdockConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.updater.check_interval_secs, 300);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = UpdockConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = UpdockConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.updater.check_interval_secs,
            parsed.updater.check_interval_secs
        );
        assert_eq!(config.metrics.port, parsed.metrics.port);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = UpdockConfig::from_file("/nonexistent/path/updock.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            UpdockError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
