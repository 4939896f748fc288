pub mod cli;
pub mod config;
pub mod crawl;
pub mod dataset;
pub mod extract;
pub mod fetcher;
pub mod merge;
pub mod query;
pub mod record;
pub mod search;
pub mod table;
pub mod verify;

/// `RUST_LOG`-driven fmt subscriber, `info` by default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}
