use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::domain::DomainError;

/// Install the global subscriber; `RUST_LOG` overrides the configured level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), DomainError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            DomainError::configuration(format!("invalid log level '{}': {}", config.level, e))
        })?;

    tracing_subscriber::registry()
        .with(filter)
        .with(format_layer(config.format))
        .try_init()
        .map_err(|e| DomainError::internal(format!("logging already initialized: {}", e)))?;

    tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

fn format_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().with_target(true).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();

        // Another test may have installed the subscriber first
        let _ = init_logging(&config);

        assert!(matches!(
            init_logging(&config),
            Err(DomainError::Internal { .. })
        ));
    }

    #[test]
    fn test_invalid_level_is_configuration_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = LoggingConfig {
            level: "seedbank=loud".to_string(),
            ..LoggingConfig::default()
        };

        assert!(matches!(
            init_logging(&config),
            Err(DomainError::Configuration { .. })
        ));
    }
}
