//! Logger bootstrap for the binary and for tests.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the global logger.
///
/// `verbose` lowers the default filter to debug so wiring and resolver
/// diagnostics are printed; `RUST_LOG` still takes precedence.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);
    builder.format_timestamp_millis();

    // `try_init` only fails if a logger was already set, which happens when
    // several tests bootstrap logging in the same process.
    let _ = builder.try_init();
}
