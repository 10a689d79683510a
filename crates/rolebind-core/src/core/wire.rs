// crates/rolebind-core/src/core/wire.rs
// ============================================================================
// Module: Policy Wire Documents
// Description: JSON documents and paths exchanged with the policy endpoint.
// Purpose: Keep the request shape in one place for clients and stub servers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The policy endpoint accepts:
//! - `POST /security/1.0/principals/{principal}/roles/{role}` with a
//!   [`ClusterScopeDocument`] for cluster-level roles;
//! - `POST /security/1.0/principals/{principal}/roles/{role}/bindings` with a
//!   [`ResourceBindingDocument`] for resource-level roles;
//! - `GET /v1/metadata/id` returning a [`ClusterIdDocument`].
//!
//! Documents deserialize too, so stub collaborators in tests can parse what
//! the client sent.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Principal;
use crate::core::pattern::ResourcePattern;
use crate::core::role::Role;
use crate::core::scope::Scope;

/// Prefix of every binding mutation path.
pub const SECURITY_API_PREFIX: &str = "/security/1.0";
/// Metadata path returning the primary cluster id.
pub const METADATA_ID_PATH: &str = "/v1/metadata/id";

/// Cluster scope as sent on the wire (`{"clusters": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterScopeDocument {
    /// Cluster ids keyed by cluster wire key.
    pub clusters: BTreeMap<String, String>,
}

impl ClusterScopeDocument {
    /// Renders a scope.
    #[must_use]
    pub fn from_scope(scope: &Scope) -> Self {
        Self {
            clusters: scope
                .iter()
                .map(|(kind, id)| (kind.wire_key().to_string(), id.as_str().to_string()))
                .collect(),
        }
    }
}

/// Resource-level binding body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBindingDocument {
    /// Scope the patterns are evaluated in.
    pub scope: ClusterScopeDocument,
    /// Covered resources.
    pub resource_patterns: Vec<ResourcePattern>,
}

/// Metadata response carrying the primary cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdDocument {
    /// Primary cluster id.
    pub id: String,
}

/// Body of a binding mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BindingBody {
    /// Cluster-level role body.
    Cluster(ClusterScopeDocument),
    /// Resource-level role body.
    Resource(ResourceBindingDocument),
}

/// Path and body for one binding mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRequest {
    /// Path relative to the policy endpoint base URL.
    pub path: String,
    /// JSON body.
    pub body: BindingBody,
}

/// Path for cluster-level role grants.
#[must_use]
pub fn role_path(principal: &Principal, role: Role) -> String {
    format!("{SECURITY_API_PREFIX}/principals/{principal}/roles/{role}")
}

/// Path for resource-level role grants.
#[must_use]
pub fn bindings_path(principal: &Principal, role: Role) -> String {
    format!("{}/bindings", role_path(principal, role))
}
