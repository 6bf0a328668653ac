pub mod config;
pub mod delivery;
pub mod error;
pub mod filter;
pub mod format;
pub mod github;
pub mod migration;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod slack;

/// Install the `tracing` subscriber shared by all binaries.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
