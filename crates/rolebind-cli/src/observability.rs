// crates/rolebind-cli/src/observability.rs
// ============================================================================
// Module: CLI Observability
// Description: One-time tracing subscriber installation.
// Purpose: Route library diagnostics to stderr under an env filter.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber. Diagnostics go to stderr so stdout carries nothing but command
//! output. `RUST_LOG` selects the filter and defaults to `info`.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Guards against a second installation.
static SUBSCRIBER: OnceLock<()> = OnceLock::new();

/// Installs the fmt subscriber once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    SUBSCRIBER.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
