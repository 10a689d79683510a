// crates/rolebind-verify/src/connect.rs
// ============================================================================
// Module: Connect Client
// Description: Connector runtime REST calls as a given principal.
// Purpose: Submit connectors and observe their status under RBAC.
// Dependencies: rolebind-config, serde, tokio, tracing
// ============================================================================

//! ## Overview
//! [`ConnectClient`] wraps the connector runtime's REST surface. A freshly
//! submitted connector can take a moment to appear, so
//! [`ConnectClient::wait_for_connector_status`] polls with bounded
//! exponential backoff ([`PollPolicy`]) instead of sleeping a fixed time.
//!
//! Only "not yet visible" answers are retried. A forbidden answer or a
//! transport failure is returned at once: retrying cannot change an
//! authorization decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use rolebind_config::PollConfig;
use serde::Deserialize;
use tracing::debug;

use crate::connector::ConnectorConfig;
use crate::outcome::Outcome;
use crate::rest::RestProbe;

// ============================================================================
// SECTION: Poll Policy
// ============================================================================

/// Bounded exponential backoff for status polling.
///
/// # Invariants
/// - `max_attempts` counts the first attempt and is at least 1 when used.
/// - Every delay is capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first attempt.
    pub initial_delay: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
}

impl PollPolicy {
    /// Returns the delay after attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_delay.saturating_mul(1_u32 << shift).min(self.max_delay)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(PollConfig::default())
    }
}

impl From<PollConfig> for PollPolicy {
    fn from(config: PollConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Statuses treated as "not yet visible" while polling.
const TRANSIENT_STATUSES: [StatusCode; 3] =
    [StatusCode::NOT_FOUND, StatusCode::CONFLICT, StatusCode::SERVICE_UNAVAILABLE];

/// Returns true when polling may change the outcome.
#[must_use]
pub fn is_transient(outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Unexpected(response) => {
            TRANSIENT_STATUSES.iter().any(|status| status.as_u16() == response.status)
        }
        Outcome::Authorized(_) | Outcome::Forbidden(_) | Outcome::TransportError(_) => false,
    }
}

// ============================================================================
// SECTION: Status Document
// ============================================================================

/// Connector status document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorStatus {
    /// Connector name.
    pub name: String,
    /// Connector state.
    pub connector: ConnectorState,
    /// Task states.
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

/// Connector-level state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorState {
    /// State name such as `RUNNING`.
    pub state: String,
    /// Worker hosting the connector.
    #[serde(default)]
    pub worker_id: Option<String>,
}

/// Task-level state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskState {
    /// Task index.
    pub id: u32,
    /// State name.
    pub state: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Connector runtime client bound to one principal.
#[derive(Debug, Clone)]
pub struct ConnectClient {
    /// Underlying REST probe.
    rest: RestProbe,
}

impl ConnectClient {
    /// Wraps a probe pointed at the connector runtime.
    #[must_use]
    pub const fn new(rest: RestProbe) -> Self {
        Self {
            rest,
        }
    }

    /// Returns the underlying probe.
    #[must_use]
    pub const fn rest(&self) -> &RestProbe {
        &self.rest
    }

    /// `GET /connectors`.
    pub async fn list_connectors(&self) -> Outcome {
        self.rest.get(&["connectors"]).await
    }

    /// `POST /connectors`; the runtime answers 201 on success.
    pub async fn submit_connector(&self, config: &ConnectorConfig) -> Outcome {
        debug!(principal = %self.rest.username(), connector = %config.name, "submitting connector");
        self.rest.post_json(&["connectors"], config).await
    }

    /// `GET /connectors/{name}/status`.
    pub async fn connector_status(&self, name: &str) -> Outcome {
        self.rest.get(&["connectors", name, "status"]).await
    }

    /// `DELETE /connectors/{name}`.
    pub async fn delete_connector(&self, name: &str) -> Outcome {
        self.rest.delete(&["connectors", name]).await
    }

    /// Polls the connector status until it is no longer transient.
    ///
    /// Returns the first non-transient outcome, or the last outcome once the
    /// attempts are exhausted.
    pub async fn wait_for_connector_status(&self, name: &str, policy: &PollPolicy) -> Outcome {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = self.connector_status(name).await;
            if !is_transient(&outcome) || attempt >= attempts {
                return outcome;
            }
            let delay = policy.delay_after(attempt);
            debug!(
                connector = %name,
                attempt,
                status = ?outcome.status(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "connector status not yet visible"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
