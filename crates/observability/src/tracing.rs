//! Tracing/logging initialization.
//!
//! Events are written to stdout, filtered through `RUST_LOG` (`info` when unset
//! or unparsable). JSON is the default so log collectors can index span fields
//! such as `product_id` and `product_count`.

use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    /// Human-readable, for local runs.
    Pretty,
}

impl LogFormat {
    /// `pretty` (any case) selects [`LogFormat::Pretty`]; anything else is JSON.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }

    /// Read `LOG_FORMAT`; unset means JSON.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT").map_or(LogFormat::Json, |v| Self::parse(&v))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(LogFormat::from_env(), "info");
}

/// Install a subscriber with an explicit format and fallback filter.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_with(format: LogFormat, default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let installed = match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
    };
    if installed {
        ::tracing::debug!(?format, "logging initialized");
    }
    installed
}
