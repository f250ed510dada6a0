//! Error types — per-domain error definitions.

/// Top-level updock error type.
#[derive(Debug, thiserror::Error)]
pub enum UpdockError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline lifecycle errors.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Update engine errors.
    #[error("update error: {0}")]
    Update(#[from] UpdateError),

    /// Notification delivery errors.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config parse failure.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// Invalid config value.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Pipeline lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// start() called while already running.
    #[error("pipeline already running")]
    AlreadyRunning,

    /// stop() called while not running.
    #[error("pipeline not running")]
    NotRunning,

    /// Pipeline initialization failed.
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// Channel send failed.
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// Channel receive failed.
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),
}

/// Update engine errors, as seen by upper layers.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Docker API call failed.
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Image pull failed.
    #[error("image pull failed for '{image}': {reason}")]
    ImagePull { image: String, reason: String },

    /// An external CLI tool exited unsuccessfully.
    #[error("external tool '{tool}' failed: {stderr}")]
    ExternalTool { tool: String, stderr: String },

    /// Recreating a standalone container failed.
    #[error("recreate failed for container '{container}': {reason}")]
    Recreate { container: String, reason: String },

    /// Image prune failed.
    #[error("image prune failed: {0}")]
    Prune(String),

    /// Container not found.
    #[error("container not found: {0}")]
    NotFound(String),
}

/// Notification delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Webhook delivery failed.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "updater.check_interval_secs".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("check_interval_secs"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn pipeline_error_display() {
        assert!(
            PipelineError::AlreadyRunning
                .to_string()
                .contains("already running")
        );
        assert!(PipelineError::NotRunning.to_string().contains("not running"));
    }

    #[test]
    fn update_error_external_tool_carries_stderr() {
        let err = UpdateError::ExternalTool {
            tool: "docker-compose".to_owned(),
            stderr: "no such service: api".to_owned(),
        };
        assert!(err.to_string().contains("no such service: api"));
    }

    #[test]
    fn update_error_recreate_display() {
        let err = UpdateError::Recreate {
            container: "web".to_owned(),
            reason: "create returned 500".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("web"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn top_level_wraps_domains() {
        let err: UpdockError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, UpdockError::Config(_)));

        let err: UpdockError = PipelineError::AlreadyRunning.into();
        assert!(matches!(err, UpdockError::Pipeline(_)));

        let err: UpdockError = UpdateError::Prune("oom".to_owned()).into();
        assert!(matches!(err, UpdockError::Update(_)));
    }
}
