// crates/rolebind-bringup/src/readiness.rs
// ============================================================================
// Module: Readiness
// Description: Readiness states and the HTTP readiness probe.
// Purpose: Decide when a service is up without arbitrary sleeps.
// Dependencies: reqwest, rolebind-core, serde_json
// ============================================================================

//! ## Overview
//! [`Readiness`] is the state a service reports to the coordinator.
//! [`HttpProbe`] maps one HTTP GET into a state: connection failures and
//! server errors mean "still starting", 2xx means ready. Services with access
//! control enabled refuse anonymous requests, so a probe may also treat 401
//! and 403 as proof the service is answering.
//!
//! [`ClusterIdSource`] describes how a service's cluster id becomes known:
//! fixed by the caller, or discovered from a metadata path after readiness.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use reqwest::StatusCode;
use rolebind_config::SecretString;
use rolebind_core::ClusterId;
use rolebind_core::wire::ClusterIdDocument;

use crate::service::ServiceError;

// ============================================================================
// SECTION: Readiness State
// ============================================================================

/// Readiness state reported by a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Launched but not yet serving.
    Starting,
    /// Serving requests.
    Ready,
    /// Will not become ready; carries the reason.
    Failed(String),
}

impl Readiness {
    /// Returns true for [`Readiness::Ready`].
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// SECTION: HTTP Probe
// ============================================================================

/// Basic credentials attached to probe and metadata requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCredentials {
    /// Account name.
    pub username: String,
    /// Password.
    pub secret: SecretString,
}

/// HTTP GET readiness probe.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// Shared HTTP client with a short timeout.
    client: Client,
    /// Path probed relative to the service base address.
    path: String,
    /// Treat 401/403 as ready.
    accept_auth_challenge: bool,
    /// Credentials for the probe request.
    credentials: Option<ProbeCredentials>,
}

impl HttpProbe {
    /// Builds a probe for `path` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when the HTTP client cannot be built.
    pub fn new(path: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ServiceError::Config(err.to_string()))?;
        Ok(Self {
            client,
            path: path.into(),
            accept_auth_challenge: false,
            credentials: None,
        })
    }

    /// Counts 401 and 403 answers as ready.
    #[must_use]
    pub const fn accept_auth_challenge(mut self, accept: bool) -> Self {
        self.accept_auth_challenge = accept;
        self
    }

    /// Authenticates probe requests.
    #[must_use]
    pub fn with_credentials(mut self, credentials: ProbeCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Probes `base_address` once.
    pub async fn check(&self, base_address: &str) -> Readiness {
        let url = join_url(base_address, &self.path);
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(credentials.secret.expose()));
        }
        match request.send().await {
            Ok(response) => classify_probe_status(response.status(), self.accept_auth_challenge),
            Err(_) => Readiness::Starting,
        }
    }

    /// Fetches a cluster id document from `path` on `base_address`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Probe`] when the request fails, the status is
    /// not 2xx, or the document carries no usable id.
    pub async fn fetch_cluster_id(
        &self,
        base_address: &str,
        path: &str,
    ) -> Result<ClusterId, ServiceError> {
        let mut request = self.client.get(join_url(base_address, path));
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(credentials.secret.expose()));
        }
        let response =
            request.send().await.map_err(|err| ServiceError::Probe(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Probe(format!("cluster id lookup returned {status}")));
        }
        let body = response.bytes().await.map_err(|err| ServiceError::Probe(err.to_string()))?;
        let document: ClusterIdDocument = serde_json::from_slice(&body)
            .map_err(|err| ServiceError::Probe(format!("cluster id document: {err}")))?;
        ClusterId::new(document.id).map_err(|err| ServiceError::Probe(err.to_string()))
    }
}

/// Maps a probe response status to a readiness state.
#[must_use]
pub fn classify_probe_status(status: StatusCode, accept_auth_challenge: bool) -> Readiness {
    if status.is_success() {
        return Readiness::Ready;
    }
    if accept_auth_challenge
        && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN)
    {
        return Readiness::Ready;
    }
    Readiness::Starting
}

/// Joins a path onto a base address.
fn join_url(base_address: &str, path: &str) -> String {
    let base = base_address.trim_end_matches('/');
    if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") }
}

// ============================================================================
// SECTION: Cluster Id Source
// ============================================================================

/// How a service's cluster id becomes known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClusterIdSource {
    /// The service has no cluster id.
    #[default]
    None,
    /// Caller-provided constant (connector runtimes use a configured group id).
    Fixed(ClusterId),
    /// Discovered from a metadata path after the service is ready.
    Discover {
        /// Path returning `{"id": "..."}`.
        path: String,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
