//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the level passed in. HTTP client and
//! server internals are always held at `warn`.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Parse a level name, falling back to `INFO`.
pub fn parse_level(level: &str) -> Level {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the filter used by [`init_tracing`].
pub fn build_filter(level: Level) -> EnvFilter {
    let base = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    ["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn"]
        .into_iter()
        .filter_map(|d| d.parse::<Directive>().ok())
        .fold(base, |filter, directive| filter.add_directive(directive))
}

/// Install the global subscriber once; later calls are no-ops.
pub fn init_tracing(level: &str, json: bool) {
    let level_name = level.to_string();
    INIT.call_once(|| {
        let filter = build_filter(parse_level(&level_name));
        let installed = if json {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        };
        if installed.is_ok() {
            tracing::debug!(level = %level_name, json, "logging initialized");
        }
    });
}
