// crates/rolebind-config/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Typed configuration for policy, bring-up, verification, access.
// Purpose: Provide one validated source of scenario settings.
// Dependencies: rolebind-core, serde, toml, url
// ============================================================================

//! ## Overview
//! [`HarnessConfig`] mirrors the TOML layout:
//!
//! ```toml
//! [policy]
//! base_url = "http://localhost:8090"
//! admin_principal = "alice"
//! admin_secret = "alice-secret"
//!
//! [bringup]
//! ready_timeout_ms = 120000
//!
//! [verify.status_poll]
//! max_attempts = 10
//!
//! [access]
//! status_visibility_roles = ["SecurityAdmin", "SystemAdmin"]
//!
//! [[grants]]
//! kind = "kafka_resource"
//! principal = "User:bob"
//! role = "ResourceOwner"
//! resource_type = "Topic"
//! name = "datagen"
//! ```
//!
//! Validation is fail-closed: unknown fields, blank credentials, and zero
//! timeouts are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourcePattern;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::env::HarnessEnv;
use crate::env::parse_timeout_seconds;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a config file.
const MAX_CONFIG_BYTES: u64 = 1024 * 1024;
/// Maximum number of grant entries in one config.
const MAX_GRANTS: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config text is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config parsed but violates a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// An environment override is malformed.
    #[error("environment override error: {0}")]
    Env(String),
}

// ============================================================================
// SECTION: Secret
// ============================================================================

/// String whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret for use in an authorization header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Policy endpoint and administrator identity.
    pub policy: PolicyEndpointConfig,
    /// Service bring-up bounds.
    #[serde(default)]
    pub bringup: BringUpConfig,
    /// Verification client settings.
    #[serde(default)]
    pub verify: VerifyConfig,
    /// Access facts that are decided by experiment, not hard-coded.
    #[serde(default)]
    pub access: AccessConfig,
    /// Grants applied by `rolebind apply`, in order.
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

/// Policy endpoint settings.
///
/// # Invariants
/// - The administrator identity is fixed for the lifetime of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyEndpointConfig {
    /// Base URL of the policy endpoint (for example `http://localhost:8090`).
    pub base_url: String,
    /// Trusted administrator account name.
    pub admin_principal: String,
    /// Administrator password.
    pub admin_secret: SecretString,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl PolicyEndpointConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Bring-up coordinator bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BringUpConfig {
    /// Maximum wait for one service to report ready, in milliseconds.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Delay between readiness probes, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BringUpConfig {
    /// Returns the readiness timeout.
    #[must_use]
    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Returns the readiness probe interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Verification client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Backoff used while waiting for asynchronously placed work to appear.
    #[serde(default)]
    pub status_poll: PollConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            status_poll: PollConfig::default(),
        }
    }
}

impl VerifyConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Maximum number of attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first attempt, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Access facts that stay configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessConfig {
    /// Cluster roles granted to a runtime principal so it can read job status.
    #[serde(default = "default_status_visibility_roles")]
    pub status_visibility_roles: Vec<ClusterRole>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            status_visibility_roles: default_status_visibility_roles(),
        }
    }
}

/// One grant entry from the `[[grants]]` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum GrantConfig {
    /// Cluster role on a cluster (primary id added automatically).
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
    /// Resource role on one literal primary-cluster resource.
    KafkaResource {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Resource type (must be owned by the primary cluster).
        resource_type: ResourceType,
        /// Resource name.
        name: String,
    },
    /// Resource role on one literal resource in any cluster.
    Resource {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Cluster type owning the resource.
        cluster_type: ClusterType,
        /// Cluster id owning the resource.
        cluster_id: ClusterId,
        /// Resource type.
        resource_type: ResourceType,
        /// Resource name.
        name: String,
    },
    /// Resource role on several patterns in one binding.
    Patterns {
        /// Principal receiving the role.
        principal: Principal,
        /// Granted role.
        role: ResourceRole,
        /// Extra clusters beyond the primary.
        #[serde(default)]
        clusters: BTreeMap<ClusterType, ClusterId>,
        /// Covered resources.
        patterns: Vec<ResourcePattern>,
    },
}

impl GrantConfig {
    /// Returns the principal named by the grant.
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
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads a config file, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// override is malformed, or validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::Io(format!(
                "{} exceeds {MAX_CONFIG_BYTES} bytes",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_overrides_with(read_env_nonempty)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML text without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text does not match the model.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies overrides using a caller-provided variable lookup.
    ///
    /// The lookup returns `Ok(None)` for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a lookup fails or a value is malformed.
    pub fn apply_overrides_with<F>(&mut self, mut lookup: F) -> Result<(), ConfigError>
    where
        F: FnMut(&str) -> Result<Option<String>, String>,
    {
        let mut read = |key: HarnessEnv| lookup(key.as_str()).map_err(ConfigError::Env);
        if let Some(url) = read(HarnessEnv::PolicyUrl)? {
            self.policy.base_url = url;
        }
        if let Some(principal) = read(HarnessEnv::AdminPrincipal)? {
            self.policy.admin_principal = principal;
        }
        if let Some(secret) = read(HarnessEnv::AdminSecret)? {
            self.policy.admin_secret = SecretString::new(secret);
        }
        if let Some(raw) = read(HarnessEnv::ReadyTimeoutSeconds)? {
            let timeout = parse_timeout_seconds(HarnessEnv::ReadyTimeoutSeconds.as_str(), &raw)
                .map_err(ConfigError::Env)?;
            self.bringup.ready_timeout_ms = u64::try_from(timeout.as_millis())
                .map_err(|_| ConfigError::Env("ready timeout overflow".to_string()))?;
        }
        Ok(())
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.policy.base_url)?;
        if self.policy.admin_principal.trim().is_empty() {
            return Err(invalid("policy.admin_principal must not be empty"));
        }
        Principal::user(self.policy.admin_principal.as_str())
            .map_err(|err| invalid(&format!("policy.admin_principal: {err}")))?;
        if self.policy.admin_secret.expose().is_empty() {
            return Err(invalid("policy.admin_secret must not be empty"));
        }
        require_positive("policy.request_timeout_ms", self.policy.request_timeout_ms)?;
        require_positive("bringup.ready_timeout_ms", self.bringup.ready_timeout_ms)?;
        require_positive("bringup.poll_interval_ms", self.bringup.poll_interval_ms)?;
        if self.bringup.poll_interval_ms > self.bringup.ready_timeout_ms {
            return Err(invalid("bringup.poll_interval_ms must not exceed ready_timeout_ms"));
        }
        require_positive("verify.request_timeout_ms", self.verify.request_timeout_ms)?;
        let poll = &self.verify.status_poll;
        if poll.max_attempts == 0 {
            return Err(invalid("verify.status_poll.max_attempts must be at least 1"));
        }
        if poll.initial_delay_ms > poll.max_delay_ms {
            return Err(invalid("verify.status_poll.initial_delay_ms must not exceed max_delay_ms"));
        }
        if self.access.status_visibility_roles.is_empty() {
            return Err(invalid("access.status_visibility_roles must name at least one role"));
        }
        if self.grants.len() > MAX_GRANTS {
            return Err(invalid(&format!("too many grants (max {MAX_GRANTS})")));
        }
        for (index, grant) in self.grants.iter().enumerate() {
            validate_grant(grant).map_err(|reason| invalid(&format!("grants[{index}]: {reason}")))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks a single grant entry for contract violations that need no network.
fn validate_grant(grant: &GrantConfig) -> Result<(), String> {
    match grant {
        GrantConfig::Cluster {
            ..
        } => Ok(()),
        GrantConfig::KafkaResource {
            resource_type,
            name,
            ..
        } => {
            require_name(name)?;
            resource_type.ensure_owned_by(ClusterType::Kafka).map_err(|err| err.to_string())
        }
        GrantConfig::Resource {
            cluster_type,
            resource_type,
            name,
            ..
        } => {
            require_name(name)?;
            resource_type.ensure_owned_by(*cluster_type).map_err(|err| err.to_string())
        }
        GrantConfig::Patterns {
            patterns,
            ..
        } => {
            if patterns.is_empty() {
                return Err("patterns must not be empty".to_string());
            }
            patterns.iter().try_for_each(|pattern| require_name(&pattern.name))
        }
    }
}

/// Rejects blank resource names.
fn require_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() { Err("resource name must not be empty".to_string()) } else { Ok(()) }
}

/// Requires an http(s) URL with a host.
fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|err| invalid(&format!("policy.base_url: {err}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("policy.base_url scheme not supported: {other}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("policy.base_url must include a host"));
    }
    Ok(())
}

/// Rejects zero-valued durations.
fn require_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 { Err(invalid(&format!("{field} must be greater than zero"))) } else { Ok(()) }
}

/// Builds a validation error.
fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Default readiness timeout; broker images can take minutes on cold caches.
const fn default_ready_timeout_ms() -> u64 {
    180_000
}

/// Default readiness probe interval.
const fn default_poll_interval_ms() -> u64 {
    500
}

/// Default status poll attempts.
const fn default_max_attempts() -> u32 {
    10
}

/// Default first backoff delay.
const fn default_initial_delay_ms() -> u64 {
    250
}

/// Default backoff ceiling.
const fn default_max_delay_ms() -> u64 {
    4_000
}

/// Default cluster roles granted for status visibility.
fn default_status_visibility_roles() -> Vec<ClusterRole> {
    vec![ClusterRole::SecurityAdmin, ClusterRole::SystemAdmin]
}
