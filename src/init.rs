use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Registry};

/// Configuration of the diagnostic subscriber.
///
/// **Fields**
/// - `default_filter`: directive used when `RUST_LOG` is unset or invalid.
/// - `with_target`: print the emitting module next to each line.
#[derive(Clone, Debug)]
pub struct TracingConfig {
    pub default_filter: String,
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            with_target: false,
        }
    }
}

/// Install a global `tracing` subscriber that prints advisories (append,
/// share and mail failures, duplicate loggers) to stderr.
///
/// **Returns**
/// - `Err(..)` if another global subscriber is already installed.
pub fn init_tracing_with_config(config: TracingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    Registry::default().with(filter).with(fmt_layer).try_init()
}

/// Equivalent to [`init_tracing_with_config`] with [`TracingConfig::default`].
pub fn init_tracing() -> Result<(), TryInitError> {
    init_tracing_with_config(TracingConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let first = init_tracing();
        let second = init_tracing_with_config(TracingConfig {
            default_filter: "debug".to_string(),
            with_target: true,
        });
        // Only one global subscriber can ever be installed per process.
        assert!(first.is_err() || second.is_err());
    }
}
