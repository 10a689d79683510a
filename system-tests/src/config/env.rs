// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: rolebind-config
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use rolebind_config::HarnessEnv;
use rolebind_config::parse_bool_env;
use rolebind_config::parse_timeout_seconds;
use rolebind_config::read_env_nonempty;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Image tag used for platform containers when none is configured.
pub const DEFAULT_PLATFORM_TAG: &str = "7.6.0";

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Enable docker-backed suites (`true`/`false` or `1`/`0`).
    ContainerSuites,
    /// Optional platform image tag override.
    PlatformTag,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimeoutSeconds => "ROLEBIND_SYSTEM_TEST_TIMEOUT_SEC",
            Self::ContainerSuites => HarnessEnv::ContainerSuites.as_str(),
            Self::PlatformTag => "ROLEBIND_SYSTEM_TEST_PLATFORM_TAG",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// Optional timeout override in seconds (positive integer).
    pub timeout: Option<Duration>,
    /// Run docker-backed suites.
    pub container_suites: bool,
    /// Platform image tag.
    pub platform_tag: String,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            container_suites: false,
            platform_tag: DEFAULT_PLATFORM_TAG.to_string(),
        }
    }
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an invalid timeout or boolean value).
    pub fn load() -> Result<Self, String> {
        let timeout = read_env_nonempty(SystemTestEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(SystemTestEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let container_suites = parse_bool_env(
            SystemTestEnv::ContainerSuites.as_str(),
            read_env_nonempty(SystemTestEnv::ContainerSuites.as_str())?,
        )?;
        let platform_tag = read_env_nonempty(SystemTestEnv::PlatformTag.as_str())?
            .unwrap_or_else(|| DEFAULT_PLATFORM_TAG.to_string());
        Ok(Self {
            timeout,
            container_suites,
            platform_tag,
        })
    }
}
