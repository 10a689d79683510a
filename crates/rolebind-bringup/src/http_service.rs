// crates/rolebind-bringup/src/http_service.rs
// ============================================================================
// Module: HTTP Service Handle
// Description: Handle for a service launched outside the harness.
// Purpose: Gate bring-up on an HTTP probe against an already known address.
// Dependencies: async-trait, rolebind-core
// ============================================================================

//! ## Overview
//! [`HttpService`] wraps a service the harness does not launch itself: a
//! compose stack, a shared test cluster, or an in-process stub. `start` only
//! records intent; readiness comes from an [`HttpProbe`]. When the cluster id
//! is discovered it is fetched once, after the first ready probe, and cached.

use std::sync::OnceLock;

use async_trait::async_trait;
use rolebind_core::ClusterId;
use tracing::debug;

use crate::readiness::ClusterIdSource;
use crate::readiness::HttpProbe;
use crate::readiness::Readiness;
use crate::service::ServiceError;
use crate::service::ServiceHandle;
use crate::service::ServiceKind;

/// Externally launched service observed over HTTP.
#[derive(Debug)]
pub struct HttpService {
    /// Unique name within a plan.
    name: String,
    /// Role of the service.
    kind: ServiceKind,
    /// Base HTTP address.
    base_address: String,
    /// Readiness probe.
    probe: HttpProbe,
    /// Cluster id origin.
    cluster_source: ClusterIdSource,
    /// Cluster id once known.
    cluster_id: OnceLock<ClusterId>,
}

impl HttpService {
    /// Creates a handle without a cluster id.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: ServiceKind,
        base_address: impl Into<String>,
        probe: HttpProbe,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            base_address: base_address.into(),
            probe,
            cluster_source: ClusterIdSource::None,
            cluster_id: OnceLock::new(),
        }
    }

    /// Sets how the cluster id becomes known.
    #[must_use]
    pub fn with_cluster_id_source(self, source: ClusterIdSource) -> Self {
        let cluster_id = OnceLock::new();
        if let ClusterIdSource::Fixed(id) = &source {
            let _ = cluster_id.set(id.clone());
        }
        Self {
            cluster_source: source,
            cluster_id,
            ..self
        }
    }
}

#[async_trait]
impl ServiceHandle for HttpService {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ServiceKind {
        self.kind
    }

    async fn start(&self) -> Result<(), ServiceError> {
        debug!(service = %self.name, address = %self.base_address, "externally launched service");
        Ok(())
    }

    async fn readiness(&self) -> Readiness {
        let state = self.probe.check(&self.base_address).await;
        if !state.is_ready() {
            return state;
        }
        discover_cluster_id(&self.probe, &self.base_address, &self.cluster_source, &self.cluster_id)
            .await
    }

    fn base_address(&self) -> Option<String> {
        Some(self.base_address.clone())
    }

    fn cluster_id(&self) -> Option<ClusterId> {
        self.cluster_id.get().cloned()
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Completes readiness by resolving a discoverable cluster id.
///
/// A service whose metadata endpoint does not answer yet is still starting.
pub(crate) async fn discover_cluster_id(
    probe: &HttpProbe,
    base_address: &str,
    source: &ClusterIdSource,
    slot: &OnceLock<ClusterId>,
) -> Readiness {
    let ClusterIdSource::Discover {
        path,
    } = source
    else {
        return Readiness::Ready;
    };
    if slot.get().is_some() {
        return Readiness::Ready;
    }
    match probe.fetch_cluster_id(base_address, path).await {
        Ok(id) => {
            debug!(cluster_id = %id, "discovered cluster id");
            let _ = slot.set(id);
            Readiness::Ready
        }
        Err(err) => {
            debug!(error = %err, "cluster id not yet available");
            Readiness::Starting
        }
    }
}
