//! Logging setup.

use crate::config::LoggingConfig;
use crate::error::{QueueError, QueueResult};

/// Install a global `tracing` subscriber built from `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> QueueResult<()> {
    let level: tracing::Level = config.level.into();
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(config.include_targets);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.colored).try_init()
    };

    result.map_err(|e| QueueError::Logging {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            colored: false,
            ..Default::default()
        };
        // Only one global subscriber per process.
        let _ = init(&config);
        assert!(matches!(init(&config), Err(QueueError::Logging { .. })));
    }
}
