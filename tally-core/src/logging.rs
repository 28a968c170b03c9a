//! Tracing setup
//!
//! The library only emits `tracing` events; binaries call `init_tracing`
//! once to print them.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "tally_core=info";
const VERBOSE_DIRECTIVE: &str = "tally_core=debug";

/// Installs the global fmt subscriber; later calls are no-ops
///
/// `RUST_LOG` is honoured; `verbose` raises the crate's default level to debug.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let directive = if verbose { VERBOSE_DIRECTIVE } else { DEFAULT_DIRECTIVE };
        let filter = match directive.parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };

        // try_init: an embedding application may already own the global subscriber
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
