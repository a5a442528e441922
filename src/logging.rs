use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr diagnostics subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or debug output with
/// `--verbose`. Report output goes to stdout and is unaffected.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
