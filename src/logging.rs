use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or `debug`
/// with `verbose`. Output goes to stderr so that stdout stays parseable
/// (JSON and CSV output).
pub fn init(verbose: bool) {
    let default = if verbose {
        "suffragium=debug"
    } else {
        "suffragium=info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
