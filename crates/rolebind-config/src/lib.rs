// crates/rolebind-config/src/lib.rs
// ============================================================================
// Module: Rolebind Config Library
// Description: Canonical harness configuration.
// Purpose: Load, override, and validate scenario configuration.
// Dependencies: rolebind-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Harness configuration is read from a TOML file, overlaid with strict
//! environment overrides, and validated before any component is built. The
//! administrator credentials live here and are passed explicitly into the
//! policy client; nothing reads them from ambient state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use config::AccessConfig;
pub use config::BringUpConfig;
pub use config::ConfigError;
pub use config::GrantConfig;
pub use config::HarnessConfig;
pub use config::PolicyEndpointConfig;
pub use config::PollConfig;
pub use config::SecretString;
pub use config::VerifyConfig;
pub use env::HarnessEnv;
pub use env::parse_bool_env;
pub use env::parse_timeout_seconds;
pub use env::read_env_nonempty;
pub use env::read_env_strict;
