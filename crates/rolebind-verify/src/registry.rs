// crates/rolebind-verify/src/registry.rs
// ============================================================================
// Module: Registry Client
// Description: Schema registry REST calls as a given principal.
// Purpose: Check subject visibility under RBAC.
// Dependencies: none beyond the REST probe
// ============================================================================

use crate::outcome::Outcome;
use crate::rest::RestProbe;

/// Schema registry client bound to one principal.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying REST probe.
    rest: RestProbe,
}

impl RegistryClient {
    /// Wraps a probe pointed at the schema registry.
    #[must_use]
    pub const fn new(rest: RestProbe) -> Self {
        Self {
            rest,
        }
    }

    /// `GET /subjects`. Subjects the principal cannot read are filtered by
    /// the registry, so an authorized empty list is a valid answer.
    pub async fn list_subjects(&self) -> Outcome {
        self.rest.get(&["subjects"]).await
    }

    /// `GET /subjects/{subject}/versions`.
    pub async fn subject_versions(&self, subject: &str) -> Outcome {
        self.rest.get(&["subjects", subject, "versions"]).await
    }
}
