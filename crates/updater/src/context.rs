//! Deployment mode resolution.
//!
//! Docker attaches well-known labels to containers it manages through an
//! orchestrator stack or a compose project. [`DeploymentContext::resolve`]
//! reads those labels to decide which update path applies to a container:
//! swarm service update, compose service refresh, or standalone
//! stop-remove-recreate.

use updock_core::types::ContainerRecord;

/// Label set by the orchestrator on stack-managed containers.
pub const LABEL_STACK_NAMESPACE: &str = "com.docker.stack.namespace";
/// Label set by compose with the project name.
pub const LABEL_COMPOSE_PROJECT: &str = "com.docker.compose.project";
/// Label set by compose with the service name.
pub const LABEL_COMPOSE_SERVICE: &str = "com.docker.compose.service";

/// How a container is managed, resolved from its labels.
///
/// Resolution is total: every container maps to exactly one variant.
/// Orchestrator labels win over compose labels when both are present,
/// since the stack owns the service definition in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentContext {
    /// Managed by an orchestrator stack; updated via `docker service update`.
    OrchestratorService {
        /// Fully qualified service name, `{stack}_{container name}`.
        service: String,
    },
    /// Managed by a compose project; updated via compose pull + up.
    ComposeService {
        /// Compose project name.
        project: String,
        /// Compose service name.
        service: String,
    },
    /// Plain `docker run` container; updated by recreation.
    Standalone,
}

impl DeploymentContext {
    /// Resolves the deployment mode for a container from its labels.
    pub fn resolve(record: &ContainerRecord) -> Self {
        if let Some(stack) = record.labels.get(LABEL_STACK_NAMESPACE)
            && !stack.is_empty()
        {
            return Self::OrchestratorService {
                service: format!("{stack}_{}", record.name),
            };
        }

        if let (Some(project), Some(service)) = (
            record.labels.get(LABEL_COMPOSE_PROJECT),
            record.labels.get(LABEL_COMPOSE_SERVICE),
        ) && !project.is_empty()
            && !service.is_empty()
        {
            return Self::ComposeService {
                project: project.clone(),
                service: service.clone(),
            };
        }

        Self::Standalone
    }

    /// Short mode name for logs.
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::OrchestratorService { .. } => "orchestrator",
            Self::ComposeService { .. } => "compose",
            Self::Standalone => "standalone",
        }
    }
}

impl std::fmt::Display for DeploymentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrchestratorService { service } => write!(f, "orchestrator({service})"),
            Self::ComposeService { project, service } => {
                write!(f, "compose({project}/{service})")
            }
            Self::Standalone => write!(f, "standalone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::SystemTime;

    fn record_with_labels(name: &str, labels: &[(&str, &str)]) -> ContainerRecord {
        ContainerRecord {
            id: "abc123".to_owned(),
            name: name.to_owned(),
            image: Some("app:latest".to_owned()),
            image_id: "sha256:old".to_owned(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<HashMap<_, _>>(),
            ports: Vec::new(),
            env: Vec::new(),
            mounts: Vec::new(),
            restart_policy: None,
            network_mode: None,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn no_labels_resolves_standalone() {
        let record = record_with_labels("web", &[]);
        assert_eq!(DeploymentContext::resolve(&record), DeploymentContext::Standalone);
    }

    #[test]
    fn stack_label_resolves_orchestrator_with_qualified_name() {
        let record = record_with_labels("api", &[(LABEL_STACK_NAMESPACE, "prod")]);
        assert_eq!(
            DeploymentContext::resolve(&record),
            DeploymentContext::OrchestratorService {
                service: "prod_api".to_owned()
            }
        );
    }

    #[test]
    fn compose_labels_resolve_compose_service() {
        let record = record_with_labels(
            "shop-db-1",
            &[
                (LABEL_COMPOSE_PROJECT, "shop"),
                (LABEL_COMPOSE_SERVICE, "db"),
            ],
        );
        assert_eq!(
            DeploymentContext::resolve(&record),
            DeploymentContext::ComposeService {
                project: "shop".to_owned(),
                service: "db".to_owned(),
            }
        );
    }

    #[test]
    fn orchestrator_label_wins_over_compose_labels() {
        let record = record_with_labels(
            "api",
            &[
                (LABEL_STACK_NAMESPACE, "prod"),
                (LABEL_COMPOSE_PROJECT, "shop"),
                (LABEL_COMPOSE_SERVICE, "api"),
            ],
        );
        assert!(matches!(
            DeploymentContext::resolve(&record),
            DeploymentContext::OrchestratorService { .. }
        ));
    }

    #[test]
    fn compose_project_without_service_is_standalone() {
        let record = record_with_labels("db", &[(LABEL_COMPOSE_PROJECT, "shop")]);
        assert_eq!(DeploymentContext::resolve(&record), DeploymentContext::Standalone);
    }

    #[test]
    fn empty_label_values_are_ignored() {
        let record = record_with_labels(
            "db",
            &[
                (LABEL_STACK_NAMESPACE, ""),
                (LABEL_COMPOSE_PROJECT, "shop"),
                (LABEL_COMPOSE_SERVICE, ""),
            ],
        );
        assert_eq!(DeploymentContext::resolve(&record), DeploymentContext::Standalone);
    }

    #[test]
    fn mode_names() {
        assert_eq!(DeploymentContext::Standalone.mode_name(), "standalone");
        assert_eq!(
            DeploymentContext::OrchestratorService {
                service: "s".to_owned()
            }
            .mode_name(),
            "orchestrator"
        );
        assert_eq!(
            DeploymentContext::ComposeService {
                project: "p".to_owned(),
                service: "s".to_owned()
            }
            .mode_name(),
            "compose"
        );
    }

    #[test]
    fn display_formats() {
        let ctx = DeploymentContext::ComposeService {
            project: "shop".to_owned(),
            service: "db".to_owned(),
        };
        assert_eq!(ctx.to_string(), "compose(shop/db)");
    }
}
