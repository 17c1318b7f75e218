use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`;
/// `verbose` forces debug output for this crate. Logs go to stderr so they
/// never mix with command output or `--json` snapshots.
pub fn init_tracing(default_filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("byok_state=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();

    tracing::debug!(verbose, "tracing initialized");
}
