//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use
//! `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │    Reconciler    │
//! └────────┬─────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │DockerClient │ (trait)
//!   └─────────────┘
//!        │     │
//!        ▼     ▼
//!   ┌─────┐ ┌──────┐
//!   │Bollard│ │Mock│
//!   └───┬─┘ └─────┘
//!       │
//!       ▼
//!   Docker Daemon
//! ```
//!
//! # Container ID Validation
//!
//! All methods that accept container IDs perform validation to prevent
//! injection:
//! - Must be 1-64 characters
//! - Must contain only ASCII hex digits ([0-9a-fA-F])
//! - Empty IDs and IDs with special characters are rejected

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use updock_core::types::{ContainerRecord, MountBinding, PortBinding};

use crate::error::UpdaterError;

/// Validates a container ID to prevent injection.
///
/// Docker container IDs are 64-character hex strings (or shorter prefix
/// forms). Ensures the ID contains only hex characters within valid length.
fn validate_container_id(id: &str) -> Result<(), UpdaterError> {
    if id.is_empty() || id.len() > 64 {
        return Err(UpdaterError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(UpdaterError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// All Docker API calls go through this trait, enabling testability via
/// mocking. The trait is `Send + Sync + 'static`, allowing safe sharing
/// across async contexts.
///
/// # Implementations
///
/// - [`BollardDockerClient`]: production implementation using `bollard`
/// - `MockDockerClient`: test implementation with configurable responses
///   and mutation counters (available in tests only)
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers as full records.
    ///
    /// Stopped and exited containers are excluded. Each record carries
    /// the runtime spec needed for recreation.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::DockerApi` if the Docker API call fails.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerRecord>, UpdaterError>> + Send;

    /// Pulls an image and returns the id it resolves to locally.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::ImagePull` if the pull fails or the pulled
    /// image cannot be inspected afterwards.
    fn pull_image(&self, image: &str)
    -> impl Future<Output = Result<String, UpdaterError>> + Send;

    /// Stops a container with a 10-second grace period.
    fn stop_container(&self, id: &str) -> impl Future<Output = Result<(), UpdaterError>> + Send;

    /// Removes a stopped container.
    fn remove_container(&self, id: &str)
    -> impl Future<Output = Result<(), UpdaterError>> + Send;

    /// Creates and starts a container under `record.name` from `image`,
    /// carrying over the record's runtime spec (ports, env, mounts,
    /// restart policy, network mode). Returns the new container id.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::Recreate` on create or start failure.
    fn create_container(
        &self,
        record: &ContainerRecord,
        image: &str,
    ) -> impl Future<Output = Result<String, UpdaterError>> + Send;

    /// Prunes unused images (`dangling=false` filter, so tagged but
    /// unreferenced images are removed too). Returns bytes reclaimed.
    fn prune_images(&self) -> impl Future<Output = Result<u64, UpdaterError>> + Send;

    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), UpdaterError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket. Internally uses
/// `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Connection Management
///
/// - Connection timeout: 120 seconds
/// - API version: default (auto-negotiated)
/// - Socket path: configurable (default `/var/run/docker.sock`)
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the default local socket.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::DockerConnection` if the connection fails
    /// (socket not found, permission denied, daemon not running).
    pub fn connect_local() -> Result<Self, UpdaterError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            UpdaterError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `UpdaterError::DockerConnection` if the connection fails.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, UpdaterError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    UpdaterError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Builds a full record from a container id via inspect.
    ///
    /// `created` is the Unix creation time the list endpoint reported;
    /// inspect only exposes it as a string.
    async fn inspect_record(
        &self,
        id: &str,
        created: Option<i64>,
    ) -> Result<ContainerRecord, UpdaterError> {
        let details = self.docker.inspect_container(id, None).await.map_err(|e| {
            if e.to_string().contains("404") {
                UpdaterError::ContainerNotFound(id.to_owned())
            } else {
                UpdaterError::DockerApi(format!("inspect container failed: {e}"))
            }
        })?;

        let container_id = details.id.unwrap_or_else(|| id.to_owned());
        let name = details
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default();

        let config = details.config.unwrap_or_default();
        let image = config.image.filter(|i| !i.is_empty());
        let image_id = details.image.unwrap_or_default();
        let labels = config.labels.unwrap_or_default();
        let env = config.env.unwrap_or_default();

        let host_config = details.host_config.unwrap_or_default();
        let mut ports = Vec::new();
        if let Some(bindings) = host_config.port_bindings {
            for (container_port, host_bindings) in bindings {
                for binding in host_bindings.unwrap_or_default() {
                    ports.push(PortBinding {
                        container_port: container_port.clone(),
                        host_ip: binding.host_ip.unwrap_or_default(),
                        host_port: binding.host_port.unwrap_or_default(),
                    });
                }
            }
        }

        let mounts = details
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountBinding {
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                mode: m.mode.unwrap_or_else(|| "rw".to_owned()),
            })
            .collect();

        let restart_policy = host_config
            .restart_policy
            .and_then(|p| p.name)
            .map(|n| restart_policy_to_string(&n))
            .filter(|s| !s.is_empty());
        let network_mode = host_config.network_mode.filter(|m| !m.is_empty());

        let created_at = created
            .and_then(|c| u64::try_from(c).ok())
            .map(|secs| SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs))
            .unwrap_or_else(SystemTime::now);

        Ok(ContainerRecord {
            id: container_id,
            name,
            image,
            image_id,
            labels,
            ports,
            env,
            mounts,
            restart_policy,
            network_mode,
            created_at,
        })
    }
}

fn restart_policy_to_string(name: &bollard::models::RestartPolicyNameEnum) -> String {
    use bollard::models::RestartPolicyNameEnum;
    match name {
        RestartPolicyNameEnum::EMPTY => String::new(),
        RestartPolicyNameEnum::NO => "no".to_owned(),
        RestartPolicyNameEnum::ALWAYS => "always".to_owned(),
        RestartPolicyNameEnum::UNLESS_STOPPED => "unless-stopped".to_owned(),
        RestartPolicyNameEnum::ON_FAILURE => "on-failure".to_owned(),
    }
}

fn string_to_restart_policy(name: &str) -> bollard::models::RestartPolicyNameEnum {
    use bollard::models::RestartPolicyNameEnum;
    match name {
        "no" => RestartPolicyNameEnum::NO,
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::EMPTY,
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, UpdaterError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false, // only running containers are update candidates
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| UpdaterError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(id) = container.id else { continue };
            // One inspect per container fills in the runtime spec that the
            // list endpoint does not expose (env, mounts, restart policy).
            match self.inspect_record(&id, container.created).await {
                Ok(record) => result.push(record),
                Err(UpdaterError::ContainerNotFound(_)) => {
                    // Disappeared between list and inspect; next pass will
                    // see whatever replaced it.
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(result)
    }

    async fn pull_image(&self, image: &str) -> Result<String, UpdaterError> {
        use bollard::image::CreateImageOptions;
        use futures_util::TryStreamExt;

        let options = CreateImageOptions {
            from_image: image.to_owned(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(_progress) = stream.try_next().await.map_err(|e| {
            UpdaterError::ImagePull {
                image: image.to_owned(),
                reason: e.to_string(),
            }
        })? {}

        let inspected = self
            .docker
            .inspect_image(image)
            .await
            .map_err(|e| UpdaterError::ImagePull {
                image: image.to_owned(),
                reason: format!("inspect after pull failed: {e}"),
            })?;

        inspected.id.ok_or_else(|| UpdaterError::ImagePull {
            image: image.to_owned(),
            reason: "pulled image has no id".to_owned(),
        })
    }

    async fn stop_container(&self, id: &str) -> Result<(), UpdaterError> {
        validate_container_id(id)?;

        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(id, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| UpdaterError::DockerApi(format!("stop failed for {id}: {e}")))
    }

    async fn remove_container(&self, id: &str) -> Result<(), UpdaterError> {
        validate_container_id(id)?;

        self.docker
            .remove_container(id, None)
            .await
            .map_err(|e| UpdaterError::DockerApi(format!("remove failed for {id}: {e}")))
    }

    async fn create_container(
        &self,
        record: &ContainerRecord,
        image: &str,
    ) -> Result<String, UpdaterError> {
        use bollard::container::{Config, CreateContainerOptions};
        use bollard::models::HostConfig;

        let mut port_bindings: HashMap<
            String,
            Option<Vec<bollard::models::PortBinding>>,
        > = HashMap::new();
        for port in &record.ports {
            port_bindings
                .entry(port.container_port.clone())
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(bollard::models::PortBinding {
                    host_ip: if port.host_ip.is_empty() {
                        None
                    } else {
                        Some(port.host_ip.clone())
                    },
                    host_port: Some(port.host_port.clone()),
                });
        }

        let binds: Vec<String> = record
            .mounts
            .iter()
            .filter(|m| !m.source.is_empty() && !m.destination.is_empty())
            .map(|m| {
                let mode = if m.mode.is_empty() { "rw" } else { &m.mode };
                format!("{}:{}:{}", m.source, m.destination, mode)
            })
            .collect();

        let host_config = HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            binds: if binds.is_empty() { None } else { Some(binds) },
            restart_policy: record.restart_policy.as_deref().map(|name| {
                bollard::models::RestartPolicy {
                    name: Some(string_to_restart_policy(name)),
                    maximum_retry_count: None,
                }
            }),
            network_mode: record.network_mode.clone(),
            ..Default::default()
        };

        let config = Config {
            image: Some(image.to_owned()),
            env: Some(record.env.clone()),
            labels: Some(record.labels.clone()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: record.name.clone(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| UpdaterError::Recreate {
                container: record.name.clone(),
                reason: format!("create failed: {e}"),
            })?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(|e| UpdaterError::Recreate {
                container: record.name.clone(),
                reason: format!("start failed: {e}"),
            })?;

        Ok(created.id)
    }

    async fn prune_images(&self) -> Result<u64, UpdaterError> {
        use bollard::image::PruneImagesOptions;

        let mut filters = HashMap::new();
        filters.insert("dangling", vec!["false"]);

        let response = self
            .docker
            .prune_images(Some(PruneImagesOptions { filters }))
            .await
            .map_err(|e| UpdaterError::Prune(e.to_string()))?;

        Ok(u64::try_from(response.space_reclaimed.unwrap_or(0)).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), UpdaterError> {
        self.docker
            .ping()
            .await
            .map_err(|e| UpdaterError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Mock Docker client for tests.
///
/// Returns configurable responses and counts every mutating call, so
/// tests can assert dry-run passes perform zero mutations.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// Containers returned by `list_containers`.
    pub containers: std::sync::Mutex<Vec<ContainerRecord>>,
    /// Image reference -> image id resolved by `pull_image`.
    pub remote_images: std::sync::Mutex<HashMap<String, String>>,
    /// Bytes `prune_images` reports as reclaimed.
    pub prune_reclaimed: u64,
    /// Simulate pull failures.
    pub fail_pull: bool,
    /// Simulate stop/remove failures.
    pub fail_stop: bool,
    /// Simulate create/start failures.
    pub fail_create: bool,
    /// Simulate prune failures.
    pub fail_prune: bool,
    /// Simulate an unreachable daemon.
    pub fail_ping: bool,

    // mutation counters
    pub pulls: std::sync::atomic::AtomicU64,
    pub stops: std::sync::atomic::AtomicU64,
    pub removes: std::sync::atomic::AtomicU64,
    pub creates: std::sync::atomic::AtomicU64,
    pub prunes: std::sync::atomic::AtomicU64,

    /// (name, image, record) triples recorded by `create_container`.
    pub created: std::sync::Mutex<Vec<(String, String, ContainerRecord)>>,
}

#[cfg(test)]
impl MockDockerClient {
    /// Creates an empty mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds containers to the mock fleet.
    pub fn with_containers(self, containers: Vec<ContainerRecord>) -> Self {
        *self.containers.lock().unwrap() = containers;
        self
    }

    /// Registers the image id a pull of `image` resolves to.
    pub fn with_remote_image(self, image: impl Into<String>, id: impl Into<String>) -> Self {
        self.remote_images
            .lock()
            .unwrap()
            .insert(image.into(), id.into());
        self
    }

    /// Sets the bytes reported by `prune_images`.
    pub fn with_prune_reclaimed(mut self, bytes: u64) -> Self {
        self.prune_reclaimed = bytes;
        self
    }

    /// Makes pulls fail.
    pub fn with_failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    /// Makes stop/remove fail.
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Makes create/start fail.
    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Makes prune fail.
    pub fn with_failing_prune(mut self) -> Self {
        self.fail_prune = true;
        self
    }

    /// Makes ping fail.
    pub fn with_failing_ping(mut self) -> Self {
        self.fail_ping = true;
        self
    }

    /// Total number of mutating Docker calls performed.
    pub fn mutating_calls(&self) -> u64 {
        use std::sync::atomic::Ordering;
        self.pulls.load(Ordering::Relaxed)
            + self.stops.load(Ordering::Relaxed)
            + self.removes.load(Ordering::Relaxed)
            + self.creates.load(Ordering::Relaxed)
            + self.prunes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, UpdaterError> {
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn pull_image(&self, image: &str) -> Result<String, UpdaterError> {
        self.pulls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_pull {
            return Err(UpdaterError::ImagePull {
                image: image.to_owned(),
                reason: "mock pull failure".to_owned(),
            });
        }
        Ok(self
            .remote_images
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_else(|| "sha256:mock-pulled".to_owned()))
    }

    async fn stop_container(&self, id: &str) -> Result<(), UpdaterError> {
        self.stops
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_stop {
            return Err(UpdaterError::DockerApi(format!("mock stop failure: {id}")));
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), UpdaterError> {
        self.removes
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_stop {
            return Err(UpdaterError::DockerApi(format!(
                "mock remove failure: {id}"
            )));
        }
        self.containers.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn create_container(
        &self,
        record: &ContainerRecord,
        image: &str,
    ) -> Result<String, UpdaterError> {
        self.creates
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_create {
            return Err(UpdaterError::Recreate {
                container: record.name.clone(),
                reason: "mock create failure".to_owned(),
            });
        }
        self.created.lock().unwrap().push((
            record.name.clone(),
            image.to_owned(),
            record.clone(),
        ));
        Ok(format!("{}00", &record.id))
    }

    async fn prune_images(&self) -> Result<u64, UpdaterError> {
        self.prunes
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if self.fail_prune {
            return Err(UpdaterError::Prune("mock prune failure".to_owned()));
        }
        Ok(self.prune_reclaimed)
    }

    async fn ping(&self) -> Result<(), UpdaterError> {
        if self.fail_ping {
            return Err(UpdaterError::DockerConnection("mock ping failure".to_owned()));
        }
        Ok(())
    }
}
