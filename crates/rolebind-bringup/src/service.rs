// crates/rolebind-bringup/src/service.rs
// ============================================================================
// Module: Service Handles
// Description: Interface the coordinator uses to start and observe services.
// Purpose: Decouple bring-up ordering from how a service is actually launched.
// Dependencies: async-trait, rolebind-core, thiserror
// ============================================================================

//! ## Overview
//! A [`ServiceHandle`] is one running (or startable) collaborator: an identity
//! store, the primary cluster, a connector runtime, or a schema registry. The
//! coordinator only calls [`ServiceHandle::start`], polls
//! [`ServiceHandle::readiness`], and reads the address and cluster id once the
//! service is ready.
//!
//! Invariants:
//! - `start` is invoked at most once per bring-up.
//! - `cluster_id` may be `None` until readiness reports [`Readiness::Ready`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use rolebind_core::ClusterId;
use thiserror::Error;

use crate::readiness::Readiness;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Role a service plays in the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    /// Directory that knows which principals exist.
    IdentityStore,
    /// Primary broker cluster that also serves the policy endpoint.
    PrimaryCluster,
    /// Connector runtime cluster.
    ConnectRuntime,
    /// Schema registry cluster.
    SchemaRegistry,
    /// Anything else a scenario needs started.
    Auxiliary,
}

impl ServiceKind {
    /// Returns a stable label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdentityStore => "identity-store",
            Self::PrimaryCluster => "primary-cluster",
            Self::ConnectRuntime => "connect-runtime",
            Self::SchemaRegistry => "schema-registry",
            Self::Auxiliary => "auxiliary",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by individual service handles.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service could not be launched.
    #[error("service start failed: {0}")]
    Start(String),
    /// A readiness or metadata probe failed in a way that is not transient.
    #[error("service probe failed: {0}")]
    Probe(String),
    /// The service could not be stopped.
    #[error("service stop failed: {0}")]
    Stop(String),
    /// The container runtime is unavailable or refused the request.
    #[error("container runtime error: {0}")]
    Container(String),
    /// The handle was configured inconsistently.
    #[error("service config error: {0}")]
    Config(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Startable, observable collaborator service.
#[async_trait]
pub trait ServiceHandle: Send + Sync {
    /// Returns the unique service name within a plan.
    fn name(&self) -> &str;

    /// Returns the role this service plays.
    fn kind(&self) -> ServiceKind;

    /// Launches the service. Returning does not imply readiness.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Reports the current readiness state.
    async fn readiness(&self) -> Readiness;

    /// Returns the base HTTP address once known.
    fn base_address(&self) -> Option<String>;

    /// Returns the cluster id once known.
    fn cluster_id(&self) -> Option<ClusterId>;

    /// Stops the service. Stopping a service that never started is a no-op.
    async fn stop(&self) -> Result<(), ServiceError>;
}
