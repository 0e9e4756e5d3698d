use crate::config::toml_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives used when `RUST_LOG` is unset. `verbose` raises this
/// crate to debug regardless of the configured level.
pub fn default_directives(config: &LoggingConfig, verbose: bool) -> String {
    let own = if verbose {
        "debug".to_string()
    } else {
        config.level.to_lowercase()
    };
    format!(
        "{}={},{}",
        env!("CARGO_CRATE_NAME"),
        own,
        config.dependencies.to_lowercase()
    )
}

/// Installs the global subscriber on stderr, stdout being reserved for
/// results. `format` overrides the configured output format.
pub fn init_logger(config: &LoggingConfig, format: LogFormat, verbose: bool) {
    let directives = default_directives(config, verbose);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(verbose)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .flatten_event(true),
            )
            .init(),
    }

    tracing::debug!("Logging initialised with '{}' ({:?})", directives, format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_follow_config() {
        let config = LoggingConfig::default();
        assert_eq!(default_directives(&config, false), "mia_romagna=info,warn");
        assert_eq!(default_directives(&config, true), "mia_romagna=debug,warn");

        let quiet = LoggingConfig {
            level: "WARN".to_string(),
            dependencies: "error".to_string(),
            format: LogFormat::Json,
        };
        assert_eq!(default_directives(&quiet, false), "mia_romagna=warn,error");
        assert!(EnvFilter::try_new(default_directives(&quiet, false)).is_ok());
    }
}
