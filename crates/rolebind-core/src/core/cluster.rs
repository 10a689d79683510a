// crates/rolebind-core/src/core/cluster.rs
// ============================================================================
// Module: Cluster Partitions
// Description: Cluster types and the resource types each one owns.
// Purpose: Reject invalid (resource type, cluster type) pairings at build time.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every physical service in the platform has exactly one [`ClusterType`].
//! Resource types are partitioned by owner: topics and groups live in the
//! primary (Kafka) cluster, connectors in a Connect cluster, subjects in a
//! schema registry. [`ResourceType::owner`] is the single source of truth for
//! that partition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::BindingError;

// ============================================================================
// SECTION: Cluster Types
// ============================================================================

/// Kind of cluster a scope entry refers to.
///
/// # Invariants
/// - [`ClusterType::Kafka`] is the primary cluster; the policy service runs there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterType {
    /// Primary broker cluster.
    #[serde(rename = "kafka-cluster")]
    Kafka,
    /// Connector runtime cluster.
    #[serde(rename = "connect-cluster")]
    Connect,
    /// Schema registry cluster.
    #[serde(rename = "schema-registry-cluster")]
    SchemaRegistry,
    /// Streaming SQL cluster.
    #[serde(rename = "ksql-cluster")]
    Ksql,
}

impl ClusterType {
    /// All cluster types in declaration order.
    pub const ALL: [Self; 4] = [Self::Kafka, Self::Connect, Self::SchemaRegistry, Self::Ksql];

    /// Returns the key used inside scope documents.
    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Kafka => "kafka-cluster",
            Self::Connect => "connect-cluster",
            Self::SchemaRegistry => "schema-registry-cluster",
            Self::Ksql => "ksql-cluster",
        }
    }

    /// Returns true for the primary cluster.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Kafka)
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_key())
    }
}

impl FromStr for ClusterType {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.wire_key() == raw).ok_or_else(|| {
            BindingError::UnknownVariant {
                kind: "cluster type",
                value: raw.to_string(),
            }
        })
    }
}

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Kind of resource a pattern names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    /// Kafka topic.
    Topic,
    /// Kafka consumer group.
    Group,
    /// The Kafka cluster itself, addressed as a resource.
    Cluster,
    /// Kafka transactional id.
    TransactionalId,
    /// Connector inside a Connect cluster.
    Connector,
    /// Subject inside a schema registry.
    Subject,
    /// Streaming SQL cluster addressed as a resource.
    KsqlCluster,
}

impl ResourceType {
    /// All resource types in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Topic,
        Self::Group,
        Self::Cluster,
        Self::TransactionalId,
        Self::Connector,
        Self::Subject,
        Self::KsqlCluster,
    ];

    /// Returns the cluster type that owns this resource type.
    #[must_use]
    pub const fn owner(self) -> ClusterType {
        match self {
            Self::Topic | Self::Group | Self::Cluster | Self::TransactionalId => ClusterType::Kafka,
            Self::Connector => ClusterType::Connect,
            Self::Subject => ClusterType::SchemaRegistry,
            Self::KsqlCluster => ClusterType::Ksql,
        }
    }

    /// Returns the wire name used in resource pattern documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "Topic",
            Self::Group => "Group",
            Self::Cluster => "Cluster",
            Self::TransactionalId => "TransactionalId",
            Self::Connector => "Connector",
            Self::Subject => "Subject",
            Self::KsqlCluster => "KsqlCluster",
        }
    }

    /// Checks that `cluster_type` owns this resource type.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidResourceType`] when the pairing is invalid.
    pub fn ensure_owned_by(self, cluster_type: ClusterType) -> Result<(), BindingError> {
        let owner = self.owner();
        if owner == cluster_type {
            Ok(())
        } else {
            Err(BindingError::InvalidResourceType {
                resource_type: self,
                owner,
                cluster_type,
            })
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw).ok_or_else(|| {
            BindingError::UnknownVariant {
                kind: "resource type",
                value: raw.to_string(),
            }
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
