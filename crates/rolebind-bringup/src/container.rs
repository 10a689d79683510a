// crates/rolebind-bringup/src/container.rs
// ============================================================================
// Module: Container Service Handle
// Description: Handle that launches a service image through testcontainers.
// Purpose: Run real platform images for end-to-end verification.
// Dependencies: testcontainers, async-trait
// ============================================================================

//! ## Overview
//! [`ContainerService`] starts a [`GenericImage`] with environment variables,
//! one exposed HTTP port, files copied in before start, and an optional
//! network and container name so that sibling containers can reach it by
//! hostname. Readiness is an HTTP probe on
//! the mapped host port. Image pulling and networking are delegated entirely
//! to `testcontainers`.
//!
//! Security posture: container environments routinely carry test passwords;
//! they are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use async_trait::async_trait;
use rolebind_core::ClusterId;
use testcontainers::ContainerAsync;
use testcontainers::ContainerRequest;
use testcontainers::GenericImage;
use testcontainers::ImageExt;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::info;

use crate::http_service::discover_cluster_id;
use crate::readiness::ClusterIdSource;
use crate::readiness::HttpProbe;
use crate::readiness::Readiness;
use crate::service::ServiceError;
use crate::service::ServiceHandle;
use crate::service::ServiceKind;

// ============================================================================
// SECTION: Spec
// ============================================================================

/// Image and runtime settings for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image name (for example `confluentinc/cp-server`).
    pub image: String,
    /// Image tag.
    pub tag: String,
    /// Container port serving HTTP.
    pub http_port: u16,
    /// Environment variables in insertion order.
    pub env: Vec<(String, String)>,
    /// Docker network to join.
    pub network: Option<String>,
    /// Container name, doubling as hostname on the network.
    pub container_name: Option<String>,
    /// Command override.
    pub cmd: Vec<String>,
    /// Files copied into the container before it starts, by container path.
    pub files: Vec<(String, Vec<u8>)>,
}

impl ContainerSpec {
    /// Creates a spec for `image:tag` serving HTTP on `http_port`.
    #[must_use]
    pub fn new(image: impl Into<String>, tag: impl Into<String>, http_port: u16) -> Self {
        Self {
            image: image.into(),
            tag: tag.into(),
            http_port,
            env: Vec::new(),
            network: None,
            container_name: None,
            cmd: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Joins a docker network.
    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Sets the container name.
    #[must_use]
    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    /// Overrides the image command.
    #[must_use]
    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Copies `contents` to `container_path` before start.
    #[must_use]
    pub fn with_file(mut self, container_path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push((container_path.into(), contents.into()));
        self
    }

    /// Builds the testcontainers request.
    fn request(&self) -> ContainerRequest<GenericImage> {
        let image = GenericImage::new(self.image.clone(), self.tag.clone())
            .with_exposed_port(self.http_port.tcp());
        let mut request = ContainerRequest::from(image);
        for (key, value) in &self.env {
            request = request.with_env_var(key.clone(), value.clone());
        }
        if let Some(network) = &self.network {
            request = request.with_network(network.clone());
        }
        if let Some(name) = &self.container_name {
            request = request.with_container_name(name.clone());
        }
        if !self.cmd.is_empty() {
            request = request.with_cmd(self.cmd.clone());
        }
        for (path, contents) in &self.files {
            request = request.with_copy_to(path.clone(), contents.clone());
        }
        request
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Service launched as a container.
pub struct ContainerService {
    /// Unique name within a plan.
    name: String,
    /// Role of the service.
    kind: ServiceKind,
    /// Image settings.
    spec: ContainerSpec,
    /// Readiness probe.
    probe: HttpProbe,
    /// Cluster id origin.
    cluster_source: ClusterIdSource,
    /// Running container, dropped on stop.
    container: Mutex<Option<ContainerAsync<GenericImage>>>,
    /// Host-mapped base address.
    base_address: OnceLock<String>,
    /// Cluster id once known.
    cluster_id: OnceLock<ClusterId>,
}

impl std::fmt::Debug for ContainerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerService")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("image", &format!("{}:{}", self.spec.image, self.spec.tag))
            .field("base_address", &self.base_address.get())
            .finish_non_exhaustive()
    }
}

impl ContainerService {
    /// Creates a container-backed handle.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ServiceKind,
        spec: ContainerSpec,
        probe: HttpProbe,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            spec,
            probe,
            cluster_source: ClusterIdSource::None,
            container: Mutex::new(None),
            base_address: OnceLock::new(),
            cluster_id: OnceLock::new(),
        }
    }

    /// Sets how the cluster id becomes known.
    #[must_use]
    pub fn with_cluster_id_source(self, source: ClusterIdSource) -> Self {
        if let ClusterIdSource::Fixed(id) = &source {
            let _ = self.cluster_id.set(id.clone());
        }
        Self {
            cluster_source: source,
            ..self
        }
    }

    /// Returns the image settings.
    #[must_use]
    pub const fn spec(&self) -> &ContainerSpec {
        &self.spec
    }
}

#[async_trait]
impl ServiceHandle for ContainerService {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ServiceKind {
        self.kind
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut slot = self.container.lock().await;
        if slot.is_some() {
            return Err(ServiceError::Start(format!("{} already started", self.name)));
        }
        ensure_docker_available().await?;
        let container = self.spec.request().start().await.map_err(|err| {
            ServiceError::Container(format!("failed to start {}: {err}", self.spec.image))
        })?;
        let host = container
            .get_host()
            .await
            .map_err(|err| ServiceError::Container(format!("failed to resolve host: {err}")))?;
        let port = container
            .get_host_port_ipv4(self.spec.http_port.tcp())
            .await
            .map_err(|err| ServiceError::Container(format!("failed to resolve port: {err}")))?;
        let address = format!("http://{host}:{port}");
        info!(service = %self.name, image = %self.spec.image, %address, "container started");
        let _ = self.base_address.set(address);
        *slot = Some(container);
        Ok(())
    }

    async fn readiness(&self) -> Readiness {
        let Some(address) = self.base_address.get() else {
            return Readiness::Starting;
        };
        let state = self.probe.check(address).await;
        if !state.is_ready() {
            return state;
        }
        discover_cluster_id(&self.probe, address, &self.cluster_source, &self.cluster_id).await
    }

    fn base_address(&self) -> Option<String> {
        self.base_address.get().cloned()
    }

    fn cluster_id(&self) -> Option<ClusterId> {
        self.cluster_id.get().cloned()
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        let container = self.container.lock().await.take();
        if let Some(container) = container {
            container.rm().await.map_err(|err| ServiceError::Stop(err.to_string()))?;
            info!(service = %self.name, "container removed");
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks that a docker daemon answers.
///
/// # Errors
///
/// Returns [`ServiceError::Container`] when `docker info` fails.
pub async fn ensure_docker_available() -> Result<(), ServiceError> {
    check_daemon("docker").await
}

/// Runs `<program> info` without blocking the runtime.
async fn check_daemon(program: &str) -> Result<(), ServiceError> {
    let output = Command::new(program)
        .arg("info")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| ServiceError::Container(format!("{program} info failed: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ServiceError::Container(format!("{program} info failed: {}", stderr.trim())));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
