// crates/rolebind-core/src/core/role.rs
// ============================================================================
// Module: Roles
// Description: Cluster-wide and resource-scoped predefined roles.
// Purpose: Separate the two role families so bindings are shaped correctly.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Roles come in two families. A [`ClusterRole`] applies to everything in the
//! scope; a [`ResourceRole`] only applies to resources matched by a binding's
//! patterns. [`Role`] is the closed union of both.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::BindingError;

/// Role granted across an entire scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterRole {
    /// Full control over the cluster.
    SystemAdmin,
    /// Manages role bindings for the cluster.
    SecurityAdmin,
    /// Manages cluster configuration and membership.
    ClusterAdmin,
    /// Manages users and groups.
    UserAdmin,
    /// Manages audit log configuration.
    AuditAdmin,
    /// Observes and operates running workloads.
    Operator,
}

impl ClusterRole {
    /// All cluster roles.
    pub const ALL: [Self; 6] = [
        Self::SystemAdmin,
        Self::SecurityAdmin,
        Self::ClusterAdmin,
        Self::UserAdmin,
        Self::AuditAdmin,
        Self::Operator,
    ];

    /// Returns the wire name used in request paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemAdmin => "SystemAdmin",
            Self::SecurityAdmin => "SecurityAdmin",
            Self::ClusterAdmin => "ClusterAdmin",
            Self::UserAdmin => "UserAdmin",
            Self::AuditAdmin => "AuditAdmin",
            Self::Operator => "Operator",
        }
    }
}

/// Role granted on the resources matched by a binding's patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceRole {
    /// Full control over matched resources, including granting access.
    ResourceOwner,
    /// Read matched resources.
    DeveloperRead,
    /// Write matched resources.
    DeveloperWrite,
    /// Create, alter, and delete matched resources.
    DeveloperManage,
}

impl ResourceRole {
    /// All resource roles.
    pub const ALL: [Self; 4] =
        [Self::ResourceOwner, Self::DeveloperRead, Self::DeveloperWrite, Self::DeveloperManage];

    /// Returns the wire name used in request paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceOwner => "ResourceOwner",
            Self::DeveloperRead => "DeveloperRead",
            Self::DeveloperWrite => "DeveloperWrite",
            Self::DeveloperManage => "DeveloperManage",
        }
    }
}

/// Any predefined role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Role {
    /// Cluster-wide role.
    Cluster(ClusterRole),
    /// Resource-scoped role.
    Resource(ResourceRole),
}

impl Role {
    /// Returns the wire name used in request paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cluster(role) => role.as_str(),
            Self::Resource(role) => role.as_str(),
        }
    }

    /// Returns true for cluster-wide roles.
    #[must_use]
    pub const fn is_cluster_role(self) -> bool {
        matches!(self, Self::Cluster(_))
    }
}

impl From<ClusterRole> for Role {
    fn from(role: ClusterRole) -> Self {
        Self::Cluster(role)
    }
}

impl From<ResourceRole> for Role {
    fn from(role: ResourceRole) -> Self {
        Self::Resource(role)
    }
}

impl fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterRole {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|role| role.as_str() == raw).ok_or_else(|| {
            BindingError::UnknownVariant {
                kind: "cluster role",
                value: raw.to_string(),
            }
        })
    }
}

impl FromStr for ResourceRole {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|role| role.as_str() == raw).ok_or_else(|| {
            BindingError::UnknownVariant {
                kind: "resource role",
                value: raw.to_string(),
            }
        })
    }
}

impl FromStr for Role {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.parse::<ClusterRole>()
            .map(Self::Cluster)
            .or_else(|_| raw.parse::<ResourceRole>().map(Self::Resource))
            .map_err(|_| BindingError::UnknownVariant {
                kind: "role",
                value: raw.to_string(),
            })
    }
}
