pub mod analysis;
pub mod config;
pub mod counting;
pub mod error;
pub mod intensity;
pub mod plot;
pub mod process;
pub mod simulation;
pub mod types;

/// Install the stderr `tracing` subscriber shared by the binaries.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
