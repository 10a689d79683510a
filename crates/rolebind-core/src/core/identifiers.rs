// crates/rolebind-core/src/core/identifiers.rs
// ============================================================================
// Module: Rolebind Identifiers
// Description: Principal and cluster identifiers used by bindings.
// Purpose: Provide strongly typed identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Principals serialize as `<Kind>:<name>` (for example `User:bob`), the form
//! the policy endpoint expects in request paths. Cluster ids are opaque,
//! non-empty strings assigned by the services themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::BindingError;

// ============================================================================
// SECTION: Principal
// ============================================================================

/// Principal category understood by the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalKind {
    /// Individual user account.
    User,
    /// Directory group.
    Group,
}

impl PrincipalKind {
    /// Returns the wire prefix for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
        }
    }
}

/// Identity named by a binding.
///
/// # Invariants
/// - `name` is non-empty and contains no `:`; the kind prefix is separate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal {
    /// Principal category.
    kind: PrincipalKind,
    /// Account or group name inside the identity store.
    name: String,
}

impl Principal {
    /// Creates a user principal.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidName`] when the name is empty or contains `:`.
    pub fn user(name: impl Into<String>) -> Result<Self, BindingError> {
        Self::new(PrincipalKind::User, name)
    }

    /// Creates a group principal.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidName`] when the name is empty or contains `:`.
    pub fn group(name: impl Into<String>) -> Result<Self, BindingError> {
        Self::new(PrincipalKind::Group, name)
    }

    /// Creates a principal of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::InvalidName`] when the name is empty or contains `:`.
    pub fn new(kind: PrincipalKind, name: impl Into<String>) -> Result<Self, BindingError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BindingError::InvalidName("principal name must not be empty".to_string()));
        }
        if name.contains(':') {
            return Err(BindingError::InvalidName(format!(
                "principal name must not contain ':': {name}"
            )));
        }
        Ok(Self {
            kind,
            name,
        })
    }

    /// Returns the principal kind.
    #[must_use]
    pub const fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// Returns the bare account name (used for basic auth).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

impl FromStr for Principal {
    type Err = BindingError;

    /// Parses `User:name`, `Group:name`, or a bare name (treated as a user).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once(':') {
            Some(("User", name)) => Self::user(name),
            Some(("Group", name)) => Self::group(name),
            Some((kind, _)) => Err(BindingError::UnknownVariant {
                kind: "principal kind",
                value: kind.to_string(),
            }),
            None => Self::user(raw),
        }
    }
}

impl TryFrom<String> for Principal {
    type Error = BindingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Cluster Id
// ============================================================================

/// Identifier assigned to a physical cluster.
///
/// # Invariants
/// - Never empty or whitespace-only; construction fails with
///   [`BindingError::ScopeResolution`] otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterId(String);

impl ClusterId {
    /// Creates a cluster id.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::ScopeResolution`] when the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, BindingError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BindingError::ScopeResolution("cluster id is empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClusterId {
    type Err = BindingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::new(raw)
    }
}

impl TryFrom<String> for ClusterId {
    type Error = BindingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClusterId> for String {
    fn from(value: ClusterId) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
