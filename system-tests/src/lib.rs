// system-tests/src/lib.rs
// ============================================================================
// Module: Rolebind System Tests Library
// Description: Shared configuration for system test scenarios.
// Purpose: Provide common settings for the Rolebind system-test binaries.
// Dependencies: rolebind-config
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the system-test binaries in
//! `system-tests/tests`. Stub collaborators and suites live under `tests/`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
