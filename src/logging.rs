//! Logging init: stderr only, so stdout stays free for the saved path.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. Each `-v` widens it.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "warn,page_loader=info",
        _ => "info,page_loader=debug",
    }
}

pub fn init_logging(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
