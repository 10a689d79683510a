// crates/rolebind-policy/src/client.rs
// ============================================================================
// Module: Policy Client
// Description: Administrative HTTP client for the role binding endpoint.
// Purpose: Submit bindings as a fixed administrator and resolve cluster ids.
// Dependencies: reqwest, rolebind-core, rolebind-config, tracing
// ============================================================================

//! ## Overview
//! [`PolicyClient`] authenticates every request with preemptive HTTP basic
//! auth as the administrator named in [`PolicyClientConfig`]. Credentials are
//! passed in explicitly and stay fixed for the lifetime of the client.
//!
//! Grant calls are thin: they build a [`Binding`], render its request, and
//! report any non-2xx status verbatim. The client neither retries nor
//! deduplicates; repeating a grant is left to the backend.
//!
//! Security posture: responses are untrusted and size-limited; the
//! administrator secret is never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::Response;
use reqwest::redirect::Policy;
use rolebind_config::PolicyEndpointConfig;
use rolebind_config::SecretString;
use rolebind_core::Binding;
use rolebind_core::BindingError;
use rolebind_core::ClusterId;
use rolebind_core::ClusterRole;
use rolebind_core::ClusterType;
use rolebind_core::Principal;
use rolebind_core::ResourcePattern;
use rolebind_core::ResourceRole;
use rolebind_core::ResourceType;
use rolebind_core::Scope;
use rolebind_core::wire::ClusterIdDocument;
use rolebind_core::wire::METADATA_ID_PATH;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body accepted from the policy endpoint.
pub const MAX_POLICY_RESPONSE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy client errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `AuthorizationBackend` carries the endpoint's status unchanged, whatever
///   the body holds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The binding could not be built (scope or resource type violation).
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// The policy endpoint rejected the request.
    #[error("policy endpoint returned {status}: {body}")]
    AuthorizationBackend {
        /// HTTP status code.
        status: u16,
        /// Response body, cut at [`MAX_POLICY_RESPONSE_BYTES`]; empty when it
        /// could not be read.
        body: String,
    },
    /// The request did not complete.
    #[error("policy transport error: {0}")]
    Transport(String),
    /// The endpoint answered with an unparseable body.
    #[error("invalid policy response: {0}")]
    InvalidResponse(String),
    /// The client could not be constructed.
    #[error("policy client error: {0}")]
    Client(String),
}

impl PolicyError {
    /// Returns true when the failure came from an unresolved or invalid scope.
    #[must_use]
    pub const fn is_scope_resolution(&self) -> bool {
        matches!(self, Self::Binding(BindingError::ScopeResolution(_)))
    }
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Administrator identity used for every policy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    /// Administrator account name (without `User:` prefix).
    pub principal: String,
    /// Administrator password.
    pub secret: SecretString,
}

/// Explicit policy client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyClientConfig {
    /// Base URL of the policy endpoint.
    pub base_url: String,
    /// Administrator identity.
    pub admin: AdminCredentials,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl PolicyClientConfig {
    /// Builds a client config from the `[policy]` config section.
    #[must_use]
    pub fn from_endpoint(endpoint: &PolicyEndpointConfig) -> Self {
        Self {
            base_url: endpoint.base_url.clone(),
            admin: AdminCredentials {
                principal: endpoint.admin_principal.clone(),
                secret: endpoint.admin_secret.clone(),
            },
            request_timeout: endpoint.request_timeout(),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Administrative client for the policy endpoint.
///
/// # Invariants
/// - Administrator credentials never change after construction.
/// - Once set, the cached primary cluster id is never replaced in place.
#[derive(Debug, Clone)]
pub struct PolicyClient {
    /// Shared HTTP client.
    http: Client,
    /// Endpoint base URL without trailing slash.
    base_url: String,
    /// Administrator identity.
    admin: AdminCredentials,
    /// Resolved primary cluster id.
    primary: Option<ClusterId>,
}

impl PolicyClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Client`] when the base URL or credentials are
    /// unusable or the HTTP client cannot be built.
    pub fn new(config: PolicyClientConfig) -> Result<Self, PolicyError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|err| PolicyError::Client(format!("invalid base url: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PolicyError::Client(format!(
                "unsupported base url scheme: {}",
                parsed.scheme()
            )));
        }
        if config.admin.principal.trim().is_empty() {
            return Err(PolicyError::Client("admin principal must not be empty".to_string()));
        }
        let http = Client::builder()
            .timeout(config.request_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| PolicyError::Client(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            admin: config.admin,
            primary: None,
        })
    }

    /// Returns a client with the primary cluster id set explicitly.
    #[must_use]
    pub fn with_primary_cluster(mut self, id: ClusterId) -> Self {
        self.primary = Some(id);
        self
    }

    /// Returns the cached primary cluster id.
    #[must_use]
    pub const fn primary_cluster(&self) -> Option<&ClusterId> {
        self.primary.as_ref()
    }

    /// Returns the administrator principal name.
    #[must_use]
    pub fn admin_principal(&self) -> &str {
        &self.admin.principal
    }

    /// Queries the endpoint for the primary cluster id.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::AuthorizationBackend`] on a non-2xx status and
    /// [`PolicyError::Binding`] with a scope resolution failure when the id is
    /// missing or blank.
    pub async fn fetch_primary_cluster_id(&self) -> Result<ClusterId, PolicyError> {
        let response = self
            .http
            .get(self.url(METADATA_ID_PATH))
            .basic_auth(&self.admin.principal, Some(self.admin.secret.expose()))
            .send()
            .await
            .map_err(|err| PolicyError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PolicyError::AuthorizationBackend {
                status: status.as_u16(),
                body: failure_body(response).await,
            });
        }
        let body = read_body_with_limit(response).await?;
        let document: ClusterIdDocument = serde_json::from_slice(&body).map_err(|err| {
            PolicyError::Binding(BindingError::ScopeResolution(format!(
                "metadata response has no usable id: {err}"
            )))
        })?;
        let id = ClusterId::new(document.id)?;
        debug!(cluster_id = %id, "resolved primary cluster id");
        Ok(id)
    }

    /// Fetches the primary cluster id and caches it in this client.
    ///
    /// An already cached id is returned without a request.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::fetch_primary_cluster_id`].
    pub async fn resolve_primary_cluster(&mut self) -> Result<ClusterId, PolicyError> {
        if let Some(id) = &self.primary {
            return Ok(id.clone());
        }
        let id = self.fetch_primary_cluster_id().await?;
        self.primary = Some(id.clone());
        Ok(id)
    }

    /// Grants a cluster-level role on `cluster_type`/`cluster_id`.
    ///
    /// The scope always carries the primary cluster id. Passing
    /// [`ClusterType::Kafka`] targets the primary cluster under `cluster_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the primary id is unresolved or the
    /// endpoint rejects the binding.
    pub async fn grant_role_on_cluster(
        &self,
        principal: &Principal,
        role: ClusterRole,
        cluster_type: ClusterType,
        cluster_id: &ClusterId,
    ) -> Result<(), PolicyError> {
        let scope = self.primary_scope()?.with_cluster(cluster_type, cluster_id.clone());
        let binding = Binding::cluster(principal.clone(), role, scope)?;
        self.grant(&binding).await
    }

    /// Grants a resource-level role on one literal primary-cluster resource.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Binding`] when the resource type is not owned by
    /// the primary cluster, plus the errors of [`Self::grant`].
    pub async fn grant_role_on_kafka_resource(
        &self,
        principal: &Principal,
        role: ResourceRole,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Result<(), PolicyError> {
        resource_type.ensure_owned_by(ClusterType::Kafka)?;
        let binding = Binding::resource(
            principal.clone(),
            role,
            self.primary_scope()?,
            vec![ResourcePattern::literal(resource_type, resource_name)],
        )?;
        self.grant(&binding).await
    }

    /// Grants a resource-level role on one literal resource of any cluster.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Binding`] when `cluster_type` does not own
    /// `resource_type`, plus the errors of [`Self::grant`].
    pub async fn grant_role_on_resource(
        &self,
        principal: &Principal,
        role: ResourceRole,
        cluster_type: ClusterType,
        cluster_id: &ClusterId,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Result<(), PolicyError> {
        resource_type.ensure_owned_by(cluster_type)?;
        let scope = self.primary_scope()?.with_cluster(cluster_type, cluster_id.clone());
        let binding = Binding::resource(
            principal.clone(),
            role,
            scope,
            vec![ResourcePattern::literal(resource_type, resource_name)],
        )?;
        self.grant(&binding).await
    }

    /// Grants one resource-level role covering several patterns.
    ///
    /// `extra_clusters` are added to the primary scope.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the binding is malformed or rejected.
    pub async fn grant_role_on_patterns<I>(
        &self,
        principal: &Principal,
        role: ResourceRole,
        extra_clusters: I,
        patterns: Vec<ResourcePattern>,
    ) -> Result<(), PolicyError>
    where
        I: IntoIterator<Item = (ClusterType, ClusterId)>,
    {
        let scope = extra_clusters
            .into_iter()
            .fold(self.primary_scope()?, |scope, (kind, id)| scope.with_cluster(kind, id));
        let binding = Binding::resource(principal.clone(), role, scope, patterns)?;
        self.grant(&binding).await
    }

    /// Submits a pre-built binding.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::AuthorizationBackend`] with the endpoint's status
    /// and body on any non-2xx response, or [`PolicyError::Transport`].
    pub async fn grant(&self, binding: &Binding) -> Result<(), PolicyError> {
        let request = binding.request();
        let response = self
            .http
            .post(self.url(&request.path))
            .basic_auth(&self.admin.principal, Some(self.admin.secret.expose()))
            .json(&request.body)
            .send()
            .await
            .map_err(|err| PolicyError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PolicyError::AuthorizationBackend {
                status: status.as_u16(),
                body: failure_body(response).await,
            });
        }
        info!(
            principal = %binding.principal(),
            role = %binding.role(),
            scope = %binding.scope(),
            patterns = binding.resource_patterns().len(),
            "granted role binding"
        );
        Ok(())
    }

    /// Returns a scope containing only the cached primary cluster id.
    fn primary_scope(&self) -> Result<Scope, PolicyError> {
        self.primary.clone().map(Scope::primary).ok_or_else(|| {
            PolicyError::Binding(BindingError::ScopeResolution(
                "primary cluster id has not been resolved".to_string(),
            ))
        })
    }

    /// Joins a path onto the base URL.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response body, failing once it exceeds the size limit.
async fn read_body_with_limit(mut response: Response) -> Result<Vec<u8>, PolicyError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| PolicyError::Transport(err.to_string()))?
    {
        if body.len().saturating_add(chunk.len()) > MAX_POLICY_RESPONSE_BYTES {
            return Err(PolicyError::InvalidResponse(format!(
                "response exceeds {MAX_POLICY_RESPONSE_BYTES} bytes"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Reads the body of a failed call for error reporting.
///
/// Bytes beyond the size limit are dropped. A body that cannot be read ends
/// early; the status is reported either way.
async fn failure_body(mut response: Response) -> String {
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = MAX_POLICY_RESPONSE_BYTES.saturating_sub(body.len());
                body.extend_from_slice(&chunk[.. chunk.len().min(room)]);
                if body.len() >= MAX_POLICY_RESPONSE_BYTES {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "failed response body could not be read");
                break;
            }
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
