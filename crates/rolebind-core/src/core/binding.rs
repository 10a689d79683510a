// crates/rolebind-core/src/core/binding.rs
// ============================================================================
// Module: Bindings
// Description: Principal, role, scope, and resource pattern tuples.
// Purpose: Build only well-formed bindings and render their wire requests.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`Binding`] is the authorization fact the harness asks the policy backend
//! to store. It has two shapes:
//! - cluster-level: a [`ClusterRole`] over the whole scope, no patterns;
//! - resource-level: a [`ResourceRole`] over one or more [`ResourcePattern`]s.
//!
//! Bindings have no identity beyond the tuple and are write-once from the
//! harness's point of view.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::cluster::ClusterType;
use crate::core::error::BindingError;
use crate::core::identifiers::Principal;
use crate::core::pattern::ResourcePattern;
use crate::core::role::ClusterRole;
use crate::core::role::ResourceRole;
use crate::core::role::Role;
use crate::core::scope::Scope;
use crate::core::wire::BindingBody;
use crate::core::wire::BindingRequest;
use crate::core::wire::ClusterScopeDocument;
use crate::core::wire::ResourceBindingDocument;
use crate::core::wire::bindings_path;
use crate::core::wire::role_path;

// ============================================================================
// SECTION: Binding
// ============================================================================

/// Granted authorization fact.
///
/// # Invariants
/// - Cluster roles carry no patterns; resource roles carry at least one.
/// - The scope names the primary cluster.
/// - Every pattern's owning cluster type is present in the scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Principal receiving the role.
    principal: Principal,
    /// Granted role.
    role: Role,
    /// Clusters the binding applies within.
    scope: Scope,
    /// Resources covered by a resource role, in submission order.
    resource_patterns: Vec<ResourcePattern>,
}

impl Binding {
    /// Builds a cluster-level binding.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::ScopeResolution`] when the scope is unusable.
    pub fn cluster(
        principal: Principal,
        role: ClusterRole,
        scope: Scope,
    ) -> Result<Self, BindingError> {
        scope.validate()?;
        Ok(Self {
            principal,
            role: Role::Cluster(role),
            scope,
            resource_patterns: Vec::new(),
        })
    }

    /// Builds a resource-level binding.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::EmptyResourcePatterns`] without patterns,
    /// [`BindingError::InvalidName`] for a blank pattern name,
    /// [`BindingError::InvalidResourceType`] when a pattern's owning cluster is
    /// absent from the scope, and [`BindingError::ScopeResolution`] when the
    /// scope is unusable.
    pub fn resource(
        principal: Principal,
        role: ResourceRole,
        scope: Scope,
        resource_patterns: Vec<ResourcePattern>,
    ) -> Result<Self, BindingError> {
        if resource_patterns.is_empty() {
            return Err(BindingError::EmptyResourcePatterns(role));
        }
        let target = target_cluster(&scope);
        for pattern in &resource_patterns {
            if pattern.name.trim().is_empty() {
                return Err(BindingError::InvalidName(format!(
                    "{} pattern name must not be empty",
                    pattern.resource_type
                )));
            }
            if !scope.contains(pattern.resource_type.owner()) {
                pattern.resource_type.ensure_owned_by(target)?;
            }
        }
        scope.validate()?;
        Ok(Self {
            principal,
            role: Role::Resource(role),
            scope,
            resource_patterns,
        })
    }

    /// Returns the principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the granted role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the scope.
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the resource patterns (empty for cluster roles).
    #[must_use]
    pub fn resource_patterns(&self) -> &[ResourcePattern] {
        &self.resource_patterns
    }

    /// Returns true for cluster-level bindings.
    #[must_use]
    pub const fn is_cluster_level(&self) -> bool {
        self.role.is_cluster_role()
    }

    /// Renders the policy endpoint request that creates this binding.
    #[must_use]
    pub fn request(&self) -> BindingRequest {
        let scope = ClusterScopeDocument::from_scope(&self.scope);
        match self.role {
            Role::Cluster(_) => BindingRequest {
                path: role_path(&self.principal, self.role),
                body: BindingBody::Cluster(scope),
            },
            Role::Resource(_) => BindingRequest {
                path: bindings_path(&self.principal, self.role),
                body: BindingBody::Resource(ResourceBindingDocument {
                    scope,
                    resource_patterns: self.resource_patterns.clone(),
                }),
            },
        }
    }
}

/// Picks the cluster type a resource binding is aimed at: the first
/// non-primary cluster in scope, else the primary.
fn target_cluster(scope: &Scope) -> ClusterType {
    scope.iter().map(|(kind, _)| kind).find(|kind| !kind.is_primary()).unwrap_or(ClusterType::Kafka)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
