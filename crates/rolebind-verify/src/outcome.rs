// crates/rolebind-verify/src/outcome.rs
// ============================================================================
// Module: Verification Outcome
// Description: Authorization outcome classes for verification calls.
// Purpose: Report what a service answered instead of raising on non-2xx.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Verification calls never fail with an error for an HTTP answer. Every
//! answer becomes an [`Outcome`]: authorized (2xx), forbidden (401/403), some
//! other status, or a transport failure that never reached authorization.
//! Scenario code asserts on the class.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// SECTION: Response
// ============================================================================

/// Status and body of one verification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly truncated to the size limit.
    pub body: String,
}

impl RestResponse {
    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Authorization outcome of a verification call.
///
/// # Invariants
/// - `Forbidden` only ever carries 401 or 403.
/// - `Authorized` only ever carries a 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The service accepted the request.
    Authorized(RestResponse),
    /// The service refused the principal.
    Forbidden(u16),
    /// Any other status, such as 404 for a resource not yet visible.
    Unexpected(RestResponse),
    /// The request never produced an HTTP answer.
    TransportError(String),
}

impl Outcome {
    /// Classifies a status and body.
    #[must_use]
    pub fn classify(status: StatusCode, body: String) -> Self {
        if status.is_success() {
            return Self::Authorized(RestResponse {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Self::Forbidden(status.as_u16());
        }
        Self::Unexpected(RestResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Returns the outcome class.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Authorized(_) => OutcomeKind::Authorized,
            Self::Forbidden(_) => OutcomeKind::Forbidden,
            Self::Unexpected(_) => OutcomeKind::Unexpected,
            Self::TransportError(_) => OutcomeKind::TransportError,
        }
    }

    /// Returns true for [`Outcome::Authorized`].
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Returns true for [`Outcome::Forbidden`].
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// Returns the HTTP status, if the service answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Authorized(response) | Self::Unexpected(response) => Some(response.status),
            Self::Forbidden(status) => Some(*status),
            Self::TransportError(_) => None,
        }
    }

    /// Returns the response, when one with a body was kept.
    #[must_use]
    pub const fn response(&self) -> Option<&RestResponse> {
        match self {
            Self::Authorized(response) | Self::Unexpected(response) => Some(response),
            Self::Forbidden(_) | Self::TransportError(_) => None,
        }
    }
}

/// Outcome class without payload, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// 2xx.
    Authorized,
    /// 401 or 403.
    Forbidden,
    /// Other status.
    Unexpected,
    /// No HTTP answer.
    TransportError,
}

impl OutcomeKind {
    /// Returns the report label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Forbidden => "forbidden",
            Self::Unexpected => "unexpected",
            Self::TransportError => "transport_error",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
