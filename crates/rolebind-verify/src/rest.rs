// crates/rolebind-verify/src/rest.rs
// ============================================================================
// Module: REST Probe
// Description: Authenticated REST calls classified into outcomes.
// Purpose: Exercise a service as one principal and report the answer.
// Dependencies: reqwest, rolebind-config, url
// ============================================================================

//! ## Overview
//! [`RestProbe`] holds a base URL and one principal's basic credentials.
//! Paths are given as segments and percent-encoded by [`url::Url`], so
//! resource names such as connector or subject names are never spliced into
//! the URL by hand. Bodies are read up to [`MAX_VERIFY_RESPONSE_BYTES`] and
//! truncated beyond that.
//!
//! Security posture: responses are untrusted; redirects are not followed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use rolebind_config::SecretString;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::outcome::Outcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body kept from a verification call.
pub const MAX_VERIFY_RESPONSE_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Verification client construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - HTTP answers are never errors; they are [`Outcome`] values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The base URL is unusable.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    /// The HTTP client could not be built.
    #[error("verification client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Basic credentials of the principal under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Account name (without `User:` prefix).
    pub username: String,
    /// Password.
    pub secret: SecretString,
}

impl BasicCredentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::new(secret.into()),
        }
    }
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// REST client bound to one service and one principal.
#[derive(Debug, Clone)]
pub struct RestProbe {
    /// Shared HTTP client.
    http: Client,
    /// Service base URL.
    base_url: Url,
    /// Principal under test.
    credentials: BasicCredentials,
}

impl RestProbe {
    /// Builds a probe.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidUrl`] for a non-HTTP or unparseable base
    /// URL and [`VerifyError::Client`] when the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        credentials: BasicCredentials,
        timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let base_url = Url::parse(base_url).map_err(|err| VerifyError::InvalidUrl(err.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(VerifyError::InvalidUrl(format!("unsupported base url: {base_url}")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| VerifyError::Client(err.to_string()))?;
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    /// Returns the principal name requests authenticate as.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the URL for `segments` under the base URL.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Issues a GET.
    pub async fn get(&self, segments: &[&str]) -> Outcome {
        self.send(self.http.get(self.endpoint(segments))).await
    }

    /// Issues a POST with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(&self, segments: &[&str], body: &T) -> Outcome {
        self.send(self.http.post(self.endpoint(segments)).json(body)).await
    }

    /// Issues a DELETE.
    pub async fn delete(&self, segments: &[&str]) -> Outcome {
        self.send(self.http.delete(self.endpoint(segments))).await
    }

    /// Issues a GET asking for `media_type`.
    pub async fn get_accepting(&self, segments: &[&str], media_type: &str) -> Outcome {
        self.send(self.http.get(self.endpoint(segments)).header(ACCEPT, media_type)).await
    }

    /// Issues a POST whose JSON body is labelled `media_type`.
    pub async fn post_json_as<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        media_type: &str,
        body: &T,
    ) -> Outcome {
        // The explicit content type survives `json`, which only fills a missing one.
        let request = self.http.post(self.endpoint(segments)).header(CONTENT_TYPE, media_type).json(body);
        self.send(request).await
    }

    /// Issues a DELETE labelled `media_type`.
    pub async fn delete_as(&self, segments: &[&str], media_type: &str) -> Outcome {
        self.send(self.http.delete(self.endpoint(segments)).header(CONTENT_TYPE, media_type)).await
    }

    /// Authenticates, sends, and classifies one request.
    async fn send(&self, request: RequestBuilder) -> Outcome {
        let request = request
            .basic_auth(&self.credentials.username, Some(self.credentials.secret.expose()));
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return Outcome::TransportError(err.to_string()),
        };
        let status = response.status();
        match read_body_truncated(response).await {
            Ok(body) => {
                debug!(principal = %self.credentials.username, status = status.as_u16(), "verification call");
                Outcome::classify(status, body)
            }
            Err(err) => Outcome::TransportError(err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a body, dropping bytes beyond the size limit.
async fn read_body_truncated(mut response: Response) -> Result<String, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = MAX_VERIFY_RESPONSE_BYTES.saturating_sub(body.len());
        if room == 0 {
            break;
        }
        body.extend_from_slice(&chunk[.. chunk.len().min(room)]);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
