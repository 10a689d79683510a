// crates/rolebind-core/src/core/error.rs
// ============================================================================
// Module: Binding Errors
// Description: Contract violations raised while building bindings.
// Purpose: Give callers stable, fail-fast error variants.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Binding errors are local programming-contract violations. They are raised
//! before any network call is made and are never retried.

use thiserror::Error;

use crate::core::cluster::ClusterType;
use crate::core::cluster::ResourceType;
use crate::core::role::ResourceRole;

/// Errors raised while constructing identifiers, scopes, and bindings.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A required cluster id is empty, missing from scope, or unresolved.
    #[error("scope resolution failed: {0}")]
    ScopeResolution(String),
    /// A resource type was paired with a cluster type that does not own it.
    #[error(
        "invalid resource type: {resource_type} belongs to {owner}, not {cluster_type}"
    )]
    InvalidResourceType {
        /// Resource type supplied by the caller.
        resource_type: ResourceType,
        /// Cluster type that owns the resource type.
        owner: ClusterType,
        /// Cluster type the caller paired it with.
        cluster_type: ClusterType,
    },
    /// A resource-level role was requested without any resource pattern.
    #[error("resource role {0} requires at least one resource pattern")]
    EmptyResourcePatterns(ResourceRole),
    /// A principal or resource name is empty or malformed.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// A textual enum value did not match any known variant.
    #[error("unknown {kind}: {value}")]
    UnknownVariant {
        /// Enum family being parsed.
        kind: &'static str,
        /// Rejected input.
        value: String,
    },
}
