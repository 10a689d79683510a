// crates/rolebind-policy/src/lib.rs
// ============================================================================
// Module: Rolebind Policy Library
// Description: Administrative client and grant plans for role bindings.
// Purpose: Submit bindings to the policy endpoint as a trusted administrator.
// Dependencies: reqwest, rolebind-core, rolebind-config, tracing
// ============================================================================

//! ## Overview
//! [`PolicyClient`] turns binding requests into authenticated HTTP calls and
//! [`GrantPlan`] applies ordered grant lists through it. Authorization is
//! decided by the backend; this crate only reports what the backend answered.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod plan;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use client::AdminCredentials;
pub use client::MAX_POLICY_RESPONSE_BYTES;
pub use client::PolicyClient;
pub use client::PolicyClientConfig;
pub use client::PolicyError;
pub use plan::GrantIntent;
pub use plan::GrantPlan;
pub use plan::GrantPlanError;
