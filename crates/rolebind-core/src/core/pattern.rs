// crates/rolebind-core/src/core/pattern.rs
// ============================================================================
// Module: Resource Patterns
// Description: Name-matching rules that narrow resource-level roles.
// Purpose: Describe which concrete resources a binding covers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ResourcePattern`] names resources of one [`ResourceType`], either by
//! exact name ([`MatchKind::Literal`]) or by prefix ([`MatchKind::Prefixed`]).
//!
//! When several patterns match the same resource the policy backend applies
//! the most specific one. [`Specificity`] and [`most_specific`] mirror that
//! documented ordering so tests and stub backends can state expectations; the
//! harness itself never decides access from them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::cluster::ResourceType;

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a pattern name is compared with a resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchKind {
    /// Exact name match.
    #[serde(rename = "LITERAL")]
    Literal,
    /// Prefix match.
    #[serde(rename = "PREFIXED")]
    Prefixed,
}

/// Resource name-matching rule.
///
/// # Invariants
/// - A pattern never matches a resource of a different type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePattern {
    /// Type of the matched resources.
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
    /// Exact name or prefix.
    pub name: String,
    /// Comparison rule.
    #[serde(rename = "patternType")]
    pub match_kind: MatchKind,
}

/// Ordering key for overlapping patterns; greater is more specific.
///
/// Literal patterns outrank every prefix; among prefixes the longer one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    /// Literal match flag, compared first.
    literal: bool,
    /// Pattern name length in bytes.
    length: usize,
}

// ============================================================================
// SECTION: Behavior
// ============================================================================

impl ResourcePattern {
    /// Creates an exact-name pattern.
    #[must_use]
    pub fn literal(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
            match_kind: MatchKind::Literal,
        }
    }

    /// Creates a prefix pattern.
    #[must_use]
    pub fn prefixed(resource_type: ResourceType, prefix: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: prefix.into(),
            match_kind: MatchKind::Prefixed,
        }
    }

    /// Returns true when this pattern covers the named resource.
    #[must_use]
    pub fn matches(&self, resource_type: ResourceType, resource_name: &str) -> bool {
        if self.resource_type != resource_type {
            return false;
        }
        match self.match_kind {
            MatchKind::Literal => self.name == resource_name,
            MatchKind::Prefixed => resource_name.starts_with(self.name.as_str()),
        }
    }

    /// Returns the ordering key used to pick among overlapping patterns.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        Specificity {
            literal: matches!(self.match_kind, MatchKind::Literal),
            length: self.name.len(),
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.match_kind {
            MatchKind::Literal => write!(f, "{}:{}", self.resource_type, self.name),
            MatchKind::Prefixed => write!(f, "{}:{}*", self.resource_type, self.name),
        }
    }
}

/// Returns the most specific pattern covering the resource, if any.
pub fn most_specific<'a, I>(
    patterns: I,
    resource_type: ResourceType,
    resource_name: &str,
) -> Option<&'a ResourcePattern>
where
    I: IntoIterator<Item = &'a ResourcePattern>,
{
    patterns
        .into_iter()
        .filter(|pattern| pattern.matches(resource_type, resource_name))
        .max_by_key(|pattern| pattern.specificity())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
