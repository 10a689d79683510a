// crates/rolebind-core/src/core/mod.rs
// ============================================================================
// Module: Rolebind Core Model
// Description: Binding model building blocks.
// Purpose: Group identifiers, cluster partitions, roles, patterns, and scopes.
// Dependencies: serde, thiserror
// ============================================================================

//! Binding model building blocks, leaf-first.

pub mod binding;
pub mod cluster;
pub mod error;
pub mod identifiers;
pub mod pattern;
pub mod role;
pub mod scope;
pub mod wire;
