//! Update execution.
//!
//! Applies an update to a single container along the path its
//! [`DeploymentContext`] dictates:
//!
//! - orchestrator services: `docker service update --image <img> <service>`,
//!   letting the orchestrator roll the service
//! - compose services: compose `pull` then `up -d --no-deps`, pull failure
//!   short-circuits before anything is restarted
//! - standalone containers: stop, remove, then recreate under the same
//!   name with the old container's spec
//!
//! The standalone path has a hard failure point: once the old container
//! is removed, a create failure leaves nothing running under that name.
//! That surfaces as [`UpdaterError::Recreate`] and is not rolled back;
//! the operator has to intervene.

use std::sync::Arc;

use tracing::{info, warn};
use updock_core::types::{ContainerRecord, UpdateOutcome};

use crate::command::{ToolOutput, ToolRunner};
use crate::context::DeploymentContext;
use crate::docker::DockerClient;
use crate::error::UpdaterError;

/// Skip reason attached to every outcome a dry-run pass produces.
pub const DRY_RUN_SKIP_REASON: &str = "dry-run";

/// Applies updates to containers along the path their deployment mode
/// requires.
pub struct UpdateExecutor<C, R> {
    docker: Arc<C>,
    pub(crate) runner: R,
    compose_bin: String,
    dry_run: bool,
}

impl<C: DockerClient, R: ToolRunner> UpdateExecutor<C, R> {
    /// Creates an executor.
    ///
    /// `compose_bin` is the compose CLI to shell out to, e.g.
    /// `docker-compose`.
    pub fn new(docker: Arc<C>, runner: R, compose_bin: impl Into<String>, dry_run: bool) -> Self {
        Self {
            docker,
            runner,
            compose_bin: compose_bin.into(),
            dry_run,
        }
    }

    /// Updates `record` to `image` along the path `context` dictates.
    ///
    /// In dry-run mode nothing is executed and the outcome is
    /// `Skipped("dry-run")`.
    ///
    /// # Errors
    ///
    /// - `UpdaterError::ExternalTool` when a CLI path exits non-zero,
    ///   carrying the tool's stderr verbatim
    /// - `UpdaterError::Recreate` when a standalone container could not be
    ///   recreated after removal
    /// - `UpdaterError::DockerApi` on stop/remove failures before removal
    pub async fn apply(
        &self,
        record: &ContainerRecord,
        image: &str,
        context: &DeploymentContext,
    ) -> Result<UpdateOutcome, UpdaterError> {
        if self.dry_run {
            info!(
                container = %record.name,
                mode = context.mode_name(),
                would_run = %self.dry_run_plan(record, image, context),
                "dry-run: reporting only"
            );
            return Ok(UpdateOutcome::Skipped {
                reason: DRY_RUN_SKIP_REASON.to_owned(),
            });
        }

        match context {
            DeploymentContext::OrchestratorService { service } => {
                self.update_service(record, image, service).await
            }
            DeploymentContext::ComposeService { project, service } => {
                self.update_compose(record, image, project, service).await
            }
            DeploymentContext::Standalone => self.recreate_standalone(record, image).await,
        }
    }

    /// Describes what updating `record` along `context` would execute.
    ///
    /// CLI paths render the exact command lines; the standalone path
    /// renders the full runtime spec the replacement container would be
    /// created with (ports, env, mounts, restart policy, network mode).
    pub fn dry_run_plan(
        &self,
        record: &ContainerRecord,
        image: &str,
        context: &DeploymentContext,
    ) -> String {
        match context {
            DeploymentContext::OrchestratorService { service } => {
                format!("docker service update --image {image} {service}")
            }
            DeploymentContext::ComposeService { project, service } => {
                format!(
                    "{bin} -p {project} pull {service}; \
                     {bin} -p {project} up -d --no-deps {service}",
                    bin = self.compose_bin,
                )
            }
            DeploymentContext::Standalone => {
                let ports = record
                    .ports
                    .iter()
                    .map(|p| {
                        if p.host_ip.is_empty() {
                            format!("{}->{}", p.host_port, p.container_port)
                        } else {
                            format!("{}:{}->{}", p.host_ip, p.host_port, p.container_port)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let mounts = record
                    .mounts
                    .iter()
                    .map(|m| format!("{}:{}:{}", m.source, m.destination, m.mode))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "stop and remove {name}; recreate {name} from {image} \
                     ports=[{ports}] env=[{env}] mounts=[{mounts}] restart={restart} network={network}",
                    name = record.name,
                    env = record.env.join(", "),
                    restart = record.restart_policy.as_deref().unwrap_or("none"),
                    network = record.network_mode.as_deref().unwrap_or("default"),
                )
            }
        }
    }

    async fn update_service(
        &self,
        record: &ContainerRecord,
        image: &str,
        service: &str,
    ) -> Result<UpdateOutcome, UpdaterError> {
        info!(container = %record.name, service, image, "updating orchestrator service");

        let output = self
            .runner
            .run("docker", &["service", "update", "--image", image, service])
            .await?;
        check_tool("docker service update", &output)?;

        Ok(UpdateOutcome::Updated {
            image: image.to_owned(),
        })
    }

    async fn update_compose(
        &self,
        record: &ContainerRecord,
        image: &str,
        project: &str,
        service: &str,
    ) -> Result<UpdateOutcome, UpdaterError> {
        info!(container = %record.name, project, service, image, "updating compose service");

        let pull = self
            .runner
            .run(&self.compose_bin, &["-p", project, "pull", service])
            .await?;
        // A failed pull means the refresh never starts; the running
        // service stays untouched.
        check_tool(&format!("{} pull", self.compose_bin), &pull)?;

        let up = self
            .runner
            .run(
                &self.compose_bin,
                &["-p", project, "up", "-d", "--no-deps", service],
            )
            .await?;
        check_tool(&format!("{} up", self.compose_bin), &up)?;

        Ok(UpdateOutcome::Updated {
            image: image.to_owned(),
        })
    }

    async fn recreate_standalone(
        &self,
        record: &ContainerRecord,
        image: &str,
    ) -> Result<UpdateOutcome, UpdaterError> {
        info!(container = %record.name, image, "recreating standalone container");

        self.docker.stop_container(&record.id).await?;
        self.docker.remove_container(&record.id).await?;

        // Past this point the old container is gone; a create failure
        // leaves the name vacant.
        match self.docker.create_container(record, image).await {
            Ok(new_id) => {
                info!(container = %record.name, new_id = %new_id, "container recreated");
                Ok(UpdateOutcome::Updated {
                    image: image.to_owned(),
                })
            }
            Err(UpdaterError::Recreate { container, reason }) => {
                warn!(
                    container = %container,
                    %reason,
                    "recreate failed after removal; container is down"
                );
                Err(UpdaterError::Recreate { container, reason })
            }
            Err(e) => Err(UpdaterError::Recreate {
                container: record.name.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

fn check_tool(tool: &str, output: &ToolOutput) -> Result<(), UpdaterError> {
    if output.success() {
        return Ok(());
    }
    Err(UpdaterError::ExternalTool {
        tool: tool.to_owned(),
        stderr: output.stderr.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockToolRunner;
    use crate::docker::MockDockerClient;
    use std::collections::HashMap;
    use std::time::SystemTime;
    use updock_core::types::{MountBinding, PortBinding};

    fn standalone_record() -> ContainerRecord {
        ContainerRecord {
            id: "abc123def456".to_owned(),
            name: "web".to_owned(),
            image: Some("app:latest".to_owned()),
            image_id: "sha256:old".to_owned(),
            labels: HashMap::new(),
            ports: vec![PortBinding {
                container_port: "8080/tcp".to_owned(),
                host_ip: String::new(),
                host_port: "8080".to_owned(),
            }],
            env: vec!["MODE=prod".to_owned()],
            mounts: vec![MountBinding {
                source: "/data".to_owned(),
                destination: "/var/lib/app".to_owned(),
                mode: "rw".to_owned(),
            }],
            restart_policy: Some("always".to_owned()),
            network_mode: Some("bridge".to_owned()),
            created_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn dry_run_skips_without_any_side_effects() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new();
        let executor = UpdateExecutor::new(Arc::clone(&docker), runner, "docker-compose", true);

        let record = standalone_record();
        let outcome = executor
            .apply(&record, "app:latest", &DeploymentContext::Standalone)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::Skipped {
                reason: "dry-run".to_owned()
            }
        );
        assert_eq!(docker.mutating_calls(), 0);
    }

    #[test]
    fn dry_run_plan_renders_full_command_detail_per_path() {
        let docker = Arc::new(MockDockerClient::new());
        let executor =
            UpdateExecutor::new(docker, MockToolRunner::new(), "docker-compose", true);
        let record = standalone_record();

        let orchestrator = DeploymentContext::OrchestratorService {
            service: "prod_api".to_owned(),
        };
        assert_eq!(
            executor.dry_run_plan(&record, "app:v2", &orchestrator),
            "docker service update --image app:v2 prod_api"
        );

        let compose = DeploymentContext::ComposeService {
            project: "shop".to_owned(),
            service: "db".to_owned(),
        };
        let plan = executor.dry_run_plan(&record, "db:v2", &compose);
        assert!(plan.contains("docker-compose -p shop pull db"));
        assert!(plan.contains("docker-compose -p shop up -d --no-deps db"));

        let plan = executor.dry_run_plan(&record, "app:v2", &DeploymentContext::Standalone);
        assert!(plan.contains("recreate web from app:v2"));
        assert!(plan.contains("ports=[8080->8080/tcp]"));
        assert!(plan.contains("env=[MODE=prod]"));
        assert!(plan.contains("mounts=[/data:/var/lib/app:rw]"));
        assert!(plan.contains("restart=always"));
        assert!(plan.contains("network=bridge"));
    }

    #[tokio::test]
    async fn orchestrator_update_invokes_docker_service_update() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new().then_ok();
        let executor = UpdateExecutor::new(Arc::clone(&docker), runner, "docker-compose", false);

        let record = standalone_record();
        let context = DeploymentContext::OrchestratorService {
            service: "prod_api".to_owned(),
        };
        let outcome = executor.apply(&record, "app:latest", &context).await.unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                image: "app:latest".to_owned()
            }
        );
        let invocations = executor.runner.invocations.lock().unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "docker");
        assert_eq!(
            invocations[0].1,
            vec!["service", "update", "--image", "app:latest", "prod_api"]
        );
        assert_eq!(docker.mutating_calls(), 0);
    }

    #[tokio::test]
    async fn orchestrator_failure_carries_stderr() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new().then_exit(1, "no such service: prod_api\n");
        let executor = UpdateExecutor::new(docker, runner, "docker-compose", false);

        let record = standalone_record();
        let context = DeploymentContext::OrchestratorService {
            service: "prod_api".to_owned(),
        };
        let err = executor.apply(&record, "app:latest", &context).await.unwrap_err();

        match err {
            UpdaterError::ExternalTool { tool, stderr } => {
                assert_eq!(tool, "docker service update");
                assert_eq!(stderr, "no such service: prod_api\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn compose_update_pulls_then_refreshes() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new().then_ok().then_ok();
        let executor = UpdateExecutor::new(docker, runner, "docker-compose", false);

        let record = standalone_record();
        let context = DeploymentContext::ComposeService {
            project: "shop".to_owned(),
            service: "db".to_owned(),
        };
        let outcome = executor.apply(&record, "db:latest", &context).await.unwrap();

        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        let invocations = executor.runner.invocations.lock().unwrap();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].1, vec!["-p", "shop", "pull", "db"]);
        assert_eq!(invocations[1].1, vec!["-p", "shop", "up", "-d", "--no-deps", "db"]);
    }

    #[tokio::test]
    async fn compose_pull_failure_short_circuits_before_up() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new().then_exit(1, "pull access denied\n");
        let executor = UpdateExecutor::new(docker, runner, "docker-compose", false);

        let record = standalone_record();
        let context = DeploymentContext::ComposeService {
            project: "shop".to_owned(),
            service: "db".to_owned(),
        };
        let err = executor.apply(&record, "db:latest", &context).await.unwrap_err();

        match err {
            UpdaterError::ExternalTool { tool, stderr } => {
                assert_eq!(tool, "docker-compose pull");
                assert_eq!(stderr, "pull access denied\n");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The running service was never touched.
        assert_eq!(executor.runner.call_count(), 1);
    }

    #[tokio::test]
    async fn compose_up_failure_carries_up_stderr() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new()
            .then_ok()
            .then_exit(1, "driver failed programming external connectivity\n");
        let executor = UpdateExecutor::new(docker, runner, "docker-compose", false);

        let record = standalone_record();
        let context = DeploymentContext::ComposeService {
            project: "shop".to_owned(),
            service: "db".to_owned(),
        };
        let err = executor.apply(&record, "db:latest", &context).await.unwrap_err();

        match err {
            UpdaterError::ExternalTool { tool, stderr } => {
                assert_eq!(tool, "docker-compose up");
                assert!(stderr.contains("external connectivity"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(executor.runner.call_count(), 2);
    }

    #[tokio::test]
    async fn standalone_recreate_preserves_the_container_spec() {
        let docker = Arc::new(MockDockerClient::new());
        let runner = MockToolRunner::new();
        let executor = UpdateExecutor::new(Arc::clone(&docker), runner, "docker-compose", false);

        let record = standalone_record();
        let outcome = executor
            .apply(&record, "app:latest", &DeploymentContext::Standalone)
            .await
            .unwrap();

        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        assert_eq!(docker.stops.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(docker.removes.load(std::sync::atomic::Ordering::Relaxed), 1);

        let created = docker.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let (name, image, spec) = &created[0];
        assert_eq!(name, "web");
        assert_eq!(image, "app:latest");
        assert_eq!(spec.env, vec!["MODE=prod"]);
        assert_eq!(spec.ports[0].host_port, "8080");
        assert_eq!(spec.mounts[0].destination, "/var/lib/app");
        assert_eq!(spec.restart_policy.as_deref(), Some("always"));
        assert_eq!(spec.network_mode.as_deref(), Some("bridge"));
    }

    #[tokio::test]
    async fn standalone_create_failure_after_removal_is_recreate_error() {
        let docker = Arc::new(MockDockerClient::new().with_failing_create());
        let runner = MockToolRunner::new();
        let executor = UpdateExecutor::new(Arc::clone(&docker), runner, "docker-compose", false);

        let record = standalone_record();
        let err = executor
            .apply(&record, "app:latest", &DeploymentContext::Standalone)
            .await
            .unwrap_err();

        assert!(matches!(err, UpdaterError::Recreate { .. }));
        // Stop and remove already happened before the failing create.
        assert_eq!(docker.stops.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(docker.removes.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn standalone_stop_failure_aborts_before_removal() {
        let docker = Arc::new(MockDockerClient::new().with_failing_stop());
        let runner = MockToolRunner::new();
        let executor = UpdateExecutor::new(Arc::clone(&docker), runner, "docker-compose", false);

        let record = standalone_record();
        let err = executor
            .apply(&record, "app:latest", &DeploymentContext::Standalone)
            .await
            .unwrap_err();

        assert!(matches!(err, UpdaterError::DockerApi(_)));
        assert_eq!(docker.creates.load(std::sync::atomic::Ordering::Relaxed), 0);
    }
}
