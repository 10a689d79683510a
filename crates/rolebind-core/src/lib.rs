// crates/rolebind-core/src/lib.rs
// ============================================================================
// Module: Rolebind Core Library
// Description: Authorization binding model for multi-cluster RBAC verification.
// Purpose: Provide typed principals, scopes, resource patterns, and bindings.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Rolebind Core models the facts a role-based access control backend stores:
//! a [`Binding`] ties a [`Principal`] to a [`Role`] within a [`Scope`], and
//! resource-level roles are further narrowed by [`ResourcePattern`] values.
//! The model is pure data. Network submission lives in `rolebind-policy`.
//!
//! Invariants:
//! - Cluster types, resource types, and roles are closed enums; every site
//!   that partitions them matches exhaustively.
//! - A resource binding never names a resource type whose owning cluster is
//!   absent from its scope.
//! - Authorization is never evaluated locally; the pattern predicate exists so
//!   callers and stub collaborators can describe expected outcomes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use crate::core::binding::Binding;
pub use crate::core::cluster::ClusterType;
pub use crate::core::cluster::ResourceType;
pub use crate::core::error::BindingError;
pub use crate::core::identifiers::ClusterId;
pub use crate::core::identifiers::Principal;
pub use crate::core::identifiers::PrincipalKind;
pub use crate::core::pattern::MatchKind;
pub use crate::core::pattern::ResourcePattern;
pub use crate::core::pattern::Specificity;
pub use crate::core::pattern::most_specific;
pub use crate::core::role::ClusterRole;
pub use crate::core::role::ResourceRole;
pub use crate::core::role::Role;
pub use crate::core::scope::Scope;
pub use crate::core::wire;
