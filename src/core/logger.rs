// Structured Logging for Air Watch
// tracing + tracing-subscriber, initialised once per process

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

fn parse_level(log_level: &str) -> Level {
    match log_level.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Setup structured logging for the entire application.
/// Later calls are no-ops.
pub fn setup_logging(log_level: Option<&str>, json_format: Option<bool>) {
    let log_level_str = log_level.unwrap_or("INFO");
    let json_format = json_format.unwrap_or(false);
    let level = parse_level(log_level_str);

    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env().add_directive(level.into());
        // Suppress noisy libraries
        for directive in ["hyper=warn", "tower_http=info", "axum=info"] {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        let result = if json_format {
            tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_env_filter(filter)
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_target(true)
                .with_env_filter(filter)
                .try_init()
        };

        if result.is_err() {
            // A global subscriber was installed elsewhere (tests, embedding binary)
            return;
        }

        tracing::info!(log_level = %log_level_str, json = json_format, "Logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARNING"), Level::WARN);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }

    #[test]
    fn test_setup_logging_twice() {
        setup_logging(Some("DEBUG"), Some(false));
        setup_logging(Some("INFO"), Some(true));
    }
}
