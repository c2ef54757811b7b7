//! Tracing subscriber initialization.
//!
//! Events are written as JSON lines to stdout. The filter comes from
//! `RUST_LOG` and falls back to `info`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global JSON subscriber.
pub fn init() {
    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(true)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init();
        init();
        ::tracing::info!("still logging");
    }
}
