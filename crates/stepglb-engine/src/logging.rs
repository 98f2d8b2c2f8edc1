//! Log subscriber setup for engine hosts.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a configured filter is present.
pub const DEFAULT_FILTER: &str = "info";

/// Install a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `filter`, which takes precedence over
/// [`DEFAULT_FILTER`]. Returns `false` when a global subscriber was already
/// installed, in which case nothing changes.
pub fn init_logging(filter: Option<&str>) -> bool {
    let env_filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .with_ansi(std::env::var_os("NO_COLOR").is_none()),
        )
        .with(env_filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_logging(Some("warn"));
        assert!(!init_logging(Some("debug")));
    }
}
