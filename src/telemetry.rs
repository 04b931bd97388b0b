use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Level applied to dependencies when `APP_LOG_LEVEL` names a bare level.
const DEPENDENCY_LEVEL: &str = "warn";

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, source } => write!(
                f,
                "APP_LOG_LEVEL '{value}' is neither a level nor a tracing filter: {source}"
            ),
            TelemetryError::Subscriber(err) => {
                write!(f, "could not install the invigilation subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Expand a bare level such as `debug` into `warn,invigilation=debug`; full filter
/// expressions pass through unchanged.
fn directives(log_level: &str) -> String {
    let trimmed = log_level.trim();
    if trimmed.contains('=') || trimmed.contains(',') {
        trimmed.to_string()
    } else {
        format!(
            "{DEPENDENCY_LEVEL},{}={trimmed}",
            env!("CARGO_CRATE_NAME")
        )
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level. Output goes to
/// stderr so command output stays parseable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directives(&config.log_level)).map_err(|source| {
            TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
