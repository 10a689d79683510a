// crates/rolebind-bringup/src/lib.rs
// ============================================================================
// Module: Rolebind Bring-up Library
// Description: Dependency-ordered startup of platform services.
// Purpose: Start collaborators in groups and expose their addresses and ids.
// Dependencies: async-trait, reqwest, testcontainers, tokio, tracing
// ============================================================================

//! ## Overview
//! Bindings can only be granted once the identity store and the primary
//! cluster are live, and some services read authorization state only while
//! starting. The [`Coordinator`] enforces that order: groups start one after
//! another, members of a group start concurrently, and hooks between groups
//! run once every earlier service is ready.
//!
//! Service handles:
//! - [`HttpService`] for services launched elsewhere;
//! - [`ContainerService`] for images launched through `testcontainers`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod container;
pub mod coordinator;
pub mod http_service;
pub mod readiness;
pub mod service;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use container::ContainerService;
pub use container::ContainerSpec;
pub use container::ensure_docker_available;
pub use coordinator::BringUpError;
pub use coordinator::BringUpEvent;
pub use coordinator::BringUpPhase;
pub use coordinator::BringUpPlan;
pub use coordinator::BringUpReport;
pub use coordinator::Coordinator;
pub use coordinator::CoordinatorConfig;
pub use coordinator::HookFuture;
pub use coordinator::ReadyService;
pub use coordinator::ReadyServices;
pub use http_service::HttpService;
pub use readiness::ClusterIdSource;
pub use readiness::HttpProbe;
pub use readiness::ProbeCredentials;
pub use readiness::Readiness;
pub use service::ServiceError;
pub use service::ServiceHandle;
pub use service::ServiceKind;
