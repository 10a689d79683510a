// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for rolebind system-tests.
// Purpose: Provide the stub platform, container fixtures, and polling helpers.
// Dependencies: system-tests, rolebind-bringup, rolebind-policy, rolebind-verify
// ============================================================================

//! ## Overview
//! Shared helpers for rolebind system-tests.
//! Invariants:
//! - Stub collaborators decide authorization from bindings granted through
//!   the real policy client; suites never seed bindings directly.
//! - Container fixtures stay disabled unless explicitly enabled.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod connect_stub;
pub mod readiness;
pub mod rest_proxy_stub;
pub mod services;
