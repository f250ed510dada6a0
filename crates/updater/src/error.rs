//! Updater error types.
//!
//! [`UpdaterError`] covers every failure inside the update engine.
//! `From<UpdaterError> for UpdockError` lets upper layers propagate
//! naturally with the `?` operator.

use updock_core::error::{UpdateError, UpdockError};

/// Update engine domain errors.
///
/// Covers Docker API calls, image pulls, external tool invocations,
/// standalone recreation, pruning, and configuration.
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    /// Docker API call failed.
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker socket connection failed.
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Image pull failed.
    #[error("image pull failed for '{image}': {reason}")]
    ImagePull {
        /// Image reference that could not be pulled.
        image: String,
        /// Pull failure detail.
        reason: String,
    },

    /// An external CLI tool exited unsuccessfully or could not be run.
    #[error("external tool '{tool}' failed: {stderr}")]
    ExternalTool {
        /// Tool name including the subcommand, e.g. "docker service update".
        tool: String,
        /// Captured stderr, verbatim.
        stderr: String,
    },

    /// Recreating a standalone container failed after the old one was
    /// removed. The container may be absent.
    #[error("recreate failed for container '{container}': {reason}")]
    Recreate {
        /// Container name.
        container: String,
        /// Failure detail.
        reason: String,
    },

    /// Image prune failed.
    #[error("image prune failed: {0}")]
    Prune(String),

    /// Container not found.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Configuration error.
    #[error("config error: {field}: {reason}")]
    Config {
        /// Config field name.
        field: String,
        /// Error detail.
        reason: String,
    },

    /// Channel communication error.
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<UpdaterError> for UpdockError {
    fn from(err: UpdaterError) -> Self {
        match &err {
            UpdaterError::DockerApi(msg) | UpdaterError::DockerConnection(msg) => {
                UpdockError::Update(UpdateError::DockerApi(msg.clone()))
            }
            UpdaterError::ImagePull { image, reason } => {
                UpdockError::Update(UpdateError::ImagePull {
                    image: image.clone(),
                    reason: reason.clone(),
                })
            }
            UpdaterError::ExternalTool { tool, stderr } => {
                UpdockError::Update(UpdateError::ExternalTool {
                    tool: tool.clone(),
                    stderr: stderr.clone(),
                })
            }
            UpdaterError::Recreate { container, reason } => {
                UpdockError::Update(UpdateError::Recreate {
                    container: container.clone(),
                    reason: reason.clone(),
                })
            }
            UpdaterError::Prune(msg) => UpdockError::Update(UpdateError::Prune(msg.clone())),
            UpdaterError::ContainerNotFound(id) => {
                UpdockError::Update(UpdateError::NotFound(id.clone()))
            }
            UpdaterError::Config { .. } | UpdaterError::Channel(_) => {
                UpdockError::Update(UpdateError::DockerApi(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_pull_display() {
        let err = UpdaterError::ImagePull {
            image: "nginx:latest".to_owned(),
            reason: "registry unreachable".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nginx:latest"));
        assert!(msg.contains("registry unreachable"));
    }

    #[test]
    fn external_tool_display_carries_stderr_verbatim() {
        let err = UpdaterError::ExternalTool {
            tool: "docker-compose".to_owned(),
            stderr: "ERROR: no such service: api\n".to_owned(),
        };
        assert!(err.to_string().contains("ERROR: no such service: api"));
    }

    #[test]
    fn recreate_display() {
        let err = UpdaterError::Recreate {
            container: "web".to_owned(),
            reason: "create returned 500".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("web"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn config_display() {
        let err = UpdaterError::Config {
            field: "check_interval_secs".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        assert!(err.to_string().contains("check_interval_secs"));
    }

    #[test]
    fn converts_to_updock_error_image_pull() {
        let err = UpdaterError::ImagePull {
            image: "nginx".to_owned(),
            reason: "404".to_owned(),
        };
        let top: UpdockError = err.into();
        assert!(matches!(
            top,
            UpdockError::Update(UpdateError::ImagePull { .. })
        ));
    }

    #[test]
    fn converts_to_updock_error_external_tool() {
        let err = UpdaterError::ExternalTool {
            tool: "docker".to_owned(),
            stderr: "boom".to_owned(),
        };
        let top: UpdockError = err.into();
        assert!(matches!(
            top,
            UpdockError::Update(UpdateError::ExternalTool { .. })
        ));
    }

    #[test]
    fn converts_to_updock_error_recreate() {
        let err = UpdaterError::Recreate {
            container: "web".to_owned(),
            reason: "boom".to_owned(),
        };
        let top: UpdockError = err.into();
        assert!(matches!(
            top,
            UpdockError::Update(UpdateError::Recreate { .. })
        ));
    }

    #[test]
    fn converts_to_updock_error_not_found() {
        let err = UpdaterError::ContainerNotFound("xyz".to_owned());
        let top: UpdockError = err.into();
        assert!(matches!(top, UpdockError::Update(UpdateError::NotFound(_))));
    }
}
