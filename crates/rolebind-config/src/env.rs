// crates/rolebind-config/src/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment variable names and strict readers.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values override file configuration. They are parsed with
//! strict UTF-8 enforcement; invalid UTF-8 or blank values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys recognized by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Policy endpoint base URL override.
    PolicyUrl,
    /// Administrator principal override.
    AdminPrincipal,
    /// Administrator secret override.
    AdminSecret,
    /// Readiness timeout override in seconds (positive integer).
    ReadyTimeoutSeconds,
    /// Opt-in flag for suites that start real containers (`true`/`false` or `1`/`0`).
    ContainerSuites,
}

impl HarnessEnv {
    /// Every recognized key, for help output.
    pub const ALL: [Self; 5] = [
        Self::PolicyUrl,
        Self::AdminPrincipal,
        Self::AdminSecret,
        Self::ReadyTimeoutSeconds,
        Self::ContainerSuites,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyUrl => "ROLEBIND_POLICY_URL",
            Self::AdminPrincipal => "ROLEBIND_ADMIN_PRINCIPAL",
            Self::AdminSecret => "ROLEBIND_ADMIN_SECRET",
            Self::ReadyTimeoutSeconds => "ROLEBIND_READY_TIMEOUT_SEC",
            Self::ContainerSuites => "ROLEBIND_CONTAINER_SUITES",
        }
    }
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a positive timeout value in seconds.
///
/// # Errors
///
/// Returns an error when the value is blank, non-numeric, or zero.
pub fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must be a positive integer number of seconds"));
    }
    let secs: u64 = trimmed
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Parses a boolean flag; unset means `false`.
///
/// # Errors
///
/// Returns an error when the value is not `true`/`false`/`1`/`0`.
pub fn parse_bool_env(name: &str, value: Option<String>) -> Result<bool, String> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(format!("{name} must be true/false or 1/0")),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
