// crates/rolebind-core/src/core/scope.rs
// ============================================================================
// Module: Binding Scope
// Description: Mapping from cluster type to the cluster id a binding targets.
// Purpose: Carry the physical cluster context of a binding.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`Scope`] names the clusters a binding applies within. Non-primary
//! resources are evaluated in the context of their owning primary cluster, so
//! scopes built for the policy client always carry the primary id.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::cluster::ClusterType;
use crate::core::error::BindingError;
use crate::core::identifiers::ClusterId;

/// Cluster ids a binding applies within.
///
/// # Invariants
/// - At most one id per cluster type; iteration order is the cluster type order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Cluster ids keyed by cluster type.
    clusters: BTreeMap<ClusterType, ClusterId>,
}

impl Scope {
    /// Creates a scope containing only the primary cluster.
    #[must_use]
    pub fn primary(id: ClusterId) -> Self {
        Self::default().with_cluster(ClusterType::Kafka, id)
    }

    /// Adds or replaces the id for a cluster type.
    #[must_use]
    pub fn with_cluster(mut self, cluster_type: ClusterType, id: ClusterId) -> Self {
        self.clusters.insert(cluster_type, id);
        self
    }

    /// Returns the id recorded for a cluster type.
    #[must_use]
    pub fn cluster_id(&self, cluster_type: ClusterType) -> Option<&ClusterId> {
        self.clusters.get(&cluster_type)
    }

    /// Returns the primary cluster id, if present.
    #[must_use]
    pub fn primary_id(&self) -> Option<&ClusterId> {
        self.cluster_id(ClusterType::Kafka)
    }

    /// Returns true when the scope names the given cluster type.
    #[must_use]
    pub fn contains(&self, cluster_type: ClusterType) -> bool {
        self.clusters.contains_key(&cluster_type)
    }

    /// Returns true when the scope names no cluster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Iterates over `(cluster type, id)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterType, &ClusterId)> {
        self.clusters.iter().map(|(kind, id)| (*kind, id))
    }

    /// Checks that the scope is usable by the policy backend.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::ScopeResolution`] when the scope is empty or
    /// names a non-primary cluster without the primary cluster id.
    pub fn validate(&self) -> Result<(), BindingError> {
        if self.is_empty() {
            return Err(BindingError::ScopeResolution("scope names no cluster".to_string()));
        }
        if !self.contains(ClusterType::Kafka) {
            let others: Vec<String> = self.clusters.keys().map(ToString::to_string).collect();
            return Err(BindingError::ScopeResolution(format!(
                "scope for {} is missing the primary cluster id",
                others.join(", ")
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (kind, id)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{kind}={id}")?;
        }
        f.write_str("}")
    }
}
