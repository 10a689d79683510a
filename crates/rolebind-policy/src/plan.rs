// crates/rolebind-policy/src/plan.rs
// ============================================================================
// Module: Grant Plans
// Description: Ordered grant intents applied serially as the administrator.
// Purpose: Express a scenario's bindings as data and apply them in order.
// Dependencies: rolebind-config, rolebind-core, serde, tracing
// ============================================================================

//! ## Overview
//! A [`GrantPlan`] is an ordered list of [`GrantIntent`] values. Plans are
//! applied one grant at a time and stop at the first failure; grants already
//! applied stay in place.
//!
//! Plans come from the `[[grants]]` config section or from the runtime
//! presets below, which describe what a connector runtime, a schema registry,
//! or a connector owner needs before it can act.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use rolebind_config::GrantConfig;
use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourcePattern;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::client::PolicyClient;
use crate::client::PolicyError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Internal topics a connector runtime owns.
pub const CONNECT_INTERNAL_TOPICS: [&str; 3] = ["connect-configs", "connect-offsets", "connect-status"];
/// Consumer group used by a connector runtime.
pub const CONNECT_GROUP: &str = "connect";
/// Topic holding registered schemas.
pub const SCHEMAS_TOPIC: &str = "_schemas";

// ============================================================================
// SECTION: Types
// ============================================================================

/// One grant to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantIntent {
    /// Cluster-level role on a cluster.
    Cluster {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ClusterRole,
        /// Target cluster type.
        cluster_type: ClusterType,
        /// Target cluster id.
        cluster_id: ClusterId,
    },
    /// Resource-level role on one literal primary-cluster resource.
    KafkaResource {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Resource type.
        resource_type: ResourceType,
        /// Resource name.
        name: String,
    },
    /// Resource-level role on one literal resource of any cluster.
    Resource {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Owning cluster type.
        cluster_type: ClusterType,
        /// Owning cluster id.
        cluster_id: ClusterId,
        /// Resource type.
        resource_type: ResourceType,
        /// Resource name.
        name: String,
    },
    /// Resource-level role over several patterns.
    Patterns {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Clusters added to the primary scope.
        clusters: BTreeMap<ClusterType, ClusterId>,
        /// Covered resources.
        patterns: Vec<ResourcePattern>,
    },
}

impl GrantIntent {
    /// Returns the principal receiving the grant.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        match self {
            Self::Cluster {
                principal, ..
            }
            | Self::KafkaResource {
                principal, ..
            }
            | Self::Resource {
                principal, ..
            }
            | Self::Patterns {
                principal, ..
            } => principal,
        }
    }

    /// Applies this grant.
    ///
    /// # Errors
    ///
    /// Returns the [`PolicyError`] raised by the client.
    pub async fn apply(&self, client: &PolicyClient) -> Result<(), PolicyError> {
        match self {
            Self::Cluster {
                principal,
                role,
                cluster_type,
                cluster_id,
            } => client.grant_role_on_cluster(principal, *role, *cluster_type, cluster_id).await,
            Self::KafkaResource {
                principal,
                role,
                resource_type,
                name,
            } => client.grant_role_on_kafka_resource(principal, *role, *resource_type, name).await,
            Self::Resource {
                principal,
                role,
                cluster_type,
                cluster_id,
                resource_type,
                name,
            } => {
                client
                    .grant_role_on_resource(
                        principal,
                        *role,
                        *cluster_type,
                        cluster_id,
                        *resource_type,
                        name,
                    )
                    .await
            }
            Self::Patterns {
                principal,
                role,
                clusters,
                patterns,
            } => {
                let extra = clusters.iter().map(|(kind, id)| (*kind, id.clone()));
                client.grant_role_on_patterns(principal, *role, extra, patterns.clone()).await
            }
        }
    }
}

impl From<GrantConfig> for GrantIntent {
    fn from(config: GrantConfig) -> Self {
        match config {
            GrantConfig::Cluster {
                principal,
                role,
                cluster_type,
                cluster_id,
            } => Self::Cluster {
                principal,
                role,
                cluster_type,
                cluster_id,
            },
            GrantConfig::KafkaResource {
                principal,
                role,
                resource_type,
                name,
            } => Self::KafkaResource {
                principal,
                role,
                resource_type,
                name,
            },
            GrantConfig::Resource {
                principal,
                role,
                cluster_type,
                cluster_id,
                resource_type,
                name,
            } => Self::Resource {
                principal,
                role,
                cluster_type,
                cluster_id,
                resource_type,
                name,
            },
            GrantConfig::Patterns {
                principal,
                role,
                clusters,
                patterns,
            } => Self::Patterns {
                principal,
                role,
                clusters,
                patterns,
            },
        }
    }
}

/// Failure while applying a plan.
///
/// # Invariants
/// - `index` is the position of the failed intent; earlier intents succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("grant {index} for {principal} failed: {source}")]
pub struct GrantPlanError {
    /// Position of the failed intent.
    pub index: usize,
    /// Principal of the failed intent.
    pub principal: Principal,
    /// Underlying client error.
    #[source]
    pub source: PolicyError,
}

/// Ordered list of grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantPlan {
    /// Intents in application order.
    intents: Vec<GrantIntent>,
}

impl GrantPlan {
    /// Creates an empty plan.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            intents: Vec::new(),
        }
    }

    /// Builds a plan from config entries, preserving order.
    #[must_use]
    pub fn from_config(grants: &[GrantConfig]) -> Self {
        Self {
            intents: grants.iter().cloned().map(GrantIntent::from).collect(),
        }
    }

    /// Appends an intent.
    #[must_use]
    pub fn push(mut self, intent: GrantIntent) -> Self {
        self.intents.push(intent);
        self
    }

    /// Appends every intent of another plan.
    #[must_use]
    pub fn extend(mut self, other: Self) -> Self {
        self.intents.extend(other.intents);
        self
    }

    /// Returns the intents in order.
    #[must_use]
    pub fn intents(&self) -> &[GrantIntent] {
        &self.intents
    }

    /// Returns the number of intents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Returns true when the plan has no intents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Applies every intent in order, stopping at the first failure.
    ///
    /// Returns the number of grants applied.
    ///
    /// # Errors
    ///
    /// Returns [`GrantPlanError`] naming the failed intent.
    pub async fn apply(&self, client: &PolicyClient) -> Result<usize, GrantPlanError> {
        for (index, intent) in self.intents.iter().enumerate() {
            intent.apply(client).await.map_err(|source| GrantPlanError {
                index,
                principal: intent.principal().clone(),
                source,
            })?;
        }
        info!(grants = self.intents.len(), "grant plan applied");
        Ok(self.intents.len())
    }

    // ------------------------------------------------------------------------
    // Runtime presets
    // ------------------------------------------------------------------------

    /// Grants a connector runtime principal what it needs to start.
    ///
    /// `SecurityAdmin` on the connect cluster, then each extra status
    /// visibility role, then one `ResourceOwner` binding covering the runtime
    /// group, the internal topics, and every topic in `data_topics`.
    #[must_use]
    pub fn connect_runtime(
        principal: &Principal,
        connect_cluster: &ClusterId,
        status_visibility_roles: &[ClusterRole],
        data_topics: &[&str],
    ) -> Self {
        let mut roles = vec![ClusterRole::SecurityAdmin];
        for role in status_visibility_roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }
        let mut plan = Self::new();
        for role in roles {
            plan = plan.push(GrantIntent::Cluster {
                principal: principal.clone(),
                role,
                cluster_type: ClusterType::Connect,
                cluster_id: connect_cluster.clone(),
            });
        }
        let mut patterns = vec![ResourcePattern::literal(ResourceType::Group, CONNECT_GROUP)];
        patterns.extend(
            CONNECT_INTERNAL_TOPICS
                .iter()
                .chain(data_topics)
                .map(|topic| ResourcePattern::literal(ResourceType::Topic, *topic)),
        );
        plan.push(GrantIntent::Patterns {
            principal: principal.clone(),
            role: ResourceRole::ResourceOwner,
            clusters: BTreeMap::new(),
            patterns,
        })
    }

    /// Grants a schema registry principal what it needs to start.
    ///
    /// The registry's consumer group is named after its cluster id. The
    /// license topic, when given, gets read and write.
    #[must_use]
    pub fn schema_registry_runtime(
        principal: &Principal,
        registry_cluster: &ClusterId,
        license_topic: Option<&str>,
    ) -> Self {
        let mut plan = Self::new()
            .push(GrantIntent::Cluster {
                principal: principal.clone(),
                role: ClusterRole::SecurityAdmin,
                cluster_type: ClusterType::SchemaRegistry,
                cluster_id: registry_cluster.clone(),
            })
            .push(kafka_owner(principal, ResourceType::Group, registry_cluster.as_str()))
            .push(kafka_owner(principal, ResourceType::Topic, SCHEMAS_TOPIC));
        if let Some(topic) = license_topic {
            for role in [ResourceRole::DeveloperRead, ResourceRole::DeveloperWrite] {
                plan = plan.push(GrantIntent::KafkaResource {
                    principal: principal.clone(),
                    role,
                    resource_type: ResourceType::Topic,
                    name: topic.to_string(),
                });
            }
        }
        plan
    }

    /// Grants an end user what it needs to run one connector writing one topic.
    ///
    /// Manage on the connector, ownership of the topic and its value subject,
    /// and write on the primary cluster resource.
    #[must_use]
    pub fn connector_owner(
        principal: &Principal,
        connect_cluster: &ClusterId,
        registry_cluster: &ClusterId,
        connector: &str,
        topic: &str,
    ) -> Self {
        Self::new()
            .push(GrantIntent::Resource {
                principal: principal.clone(),
                role: ResourceRole::DeveloperManage,
                cluster_type: ClusterType::Connect,
                cluster_id: connect_cluster.clone(),
                resource_type: ResourceType::Connector,
                name: connector.to_string(),
            })
            .push(GrantIntent::Resource {
                principal: principal.clone(),
                role: ResourceRole::ResourceOwner,
                cluster_type: ClusterType::SchemaRegistry,
                cluster_id: registry_cluster.clone(),
                resource_type: ResourceType::Subject,
                name: format!("{topic}-value"),
            })
            .push(kafka_owner(principal, ResourceType::Topic, topic))
            .push(GrantIntent::KafkaResource {
                principal: principal.clone(),
                role: ResourceRole::DeveloperWrite,
                resource_type: ResourceType::Cluster,
                name: ClusterType::Kafka.wire_key().to_string(),
            })
    }
}

/// Builds a `ResourceOwner` intent on a primary-cluster resource.
fn kafka_owner(principal: &Principal, resource_type: ResourceType, name: &str) -> GrantIntent {
    GrantIntent::KafkaResource {
        principal: principal.clone(),
        role: ResourceRole::ResourceOwner,
        resource_type,
        name: name.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
