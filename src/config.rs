//! Configuration types for tallyq.
//!
//! This module contains the configuration structures for the queue, the
//! producer/consumer pipeline and logging.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for tallyq.
///
/// # Examples
///
/// ```rust
/// use tallyq::config::{PipelineConfig, QueueConfig, TallyConfig};
///
/// // Use default configuration
/// let config = TallyConfig::default();
///
/// // Custom configuration
/// let config = TallyConfig {
///     queue: QueueConfig::with_capacity(64),
///     pipeline: PipelineConfig::new(4, 2).with_total_tasks(10_000),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Queue configuration
    pub queue: QueueConfig,

    /// Producer/consumer pipeline configuration
    pub pipeline: PipelineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of buffered tasks (0 = rendezvous, direct hand-off only)
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl QueueConfig {
    /// Create a queue configuration with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}

/// Producer/consumer pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name reported in the benchmark report
    pub name: String,

    /// Number of producer workers
    pub producers: usize,

    /// Number of consumer workers
    pub consumers: usize,

    /// Total number of tasks split across producers
    pub total_tasks: usize,

    /// Pause between two enqueues of the same producer (in milliseconds)
    pub produce_delay_ms: u64,

    /// Time to wait for all workers to finish (in seconds)
    pub shutdown_timeout_secs: u64,

    /// Keep the ids of consumed tasks in the report
    pub collect_ids: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            producers: 1,
            consumers: num_cpus::get().max(1),
            total_tasks: 1000,
            produce_delay_ms: 0,
            shutdown_timeout_secs: 60,
            collect_ids: false,
        }
    }
}

impl PipelineConfig {
    /// Create a pipeline configuration with the given worker counts.
    pub fn new(producers: usize, consumers: usize) -> Self {
        Self {
            producers,
            consumers,
            ..Default::default()
        }
    }

    /// Set the benchmark name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the total number of tasks.
    pub fn with_total_tasks(mut self, total_tasks: usize) -> Self {
        self.total_tasks = total_tasks;
        self
    }

    /// Set the pause between enqueues.
    pub fn with_produce_delay(mut self, delay_ms: u64) -> Self {
        self.produce_delay_ms = delay_ms;
        self
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout_secs: u64) -> Self {
        self.shutdown_timeout_secs = timeout_secs;
        self
    }

    /// Keep consumed task ids in the report.
    pub fn with_collected_ids(mut self, enabled: bool) -> Self {
        self.collect_ids = enabled;
        self
    }

    /// Number of tasks assigned to `producer`.
    ///
    /// Tasks are split evenly; the first `total_tasks % producers` producers
    /// take one extra.
    pub fn share_of(&self, producer: usize) -> usize {
        if self.producers == 0 {
            return 0;
        }
        let base = self.total_tasks / self.producers;
        let remainder = self.total_tasks % self.producers;
        base + usize::from(producer < remainder)
    }

    pub fn produce_delay(&self) -> Duration {
        self.produce_delay_ms.millis()
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout_secs.secs()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Enable colored output (ignored if json_format is true)
    pub colored: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            colored: true,
            include_targets: false,
        }
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Helper trait for converting durations in configuration.
pub trait DurationExt {
    /// Convert seconds to Duration
    fn secs(self) -> Duration;
    /// Convert milliseconds to Duration
    fn millis(self) -> Duration;
}

impl DurationExt for u64 {
    fn secs(self) -> Duration {
        Duration::from_secs(self)
    }

    fn millis(self) -> Duration {
        Duration::from_millis(self)
    }
}

impl TallyConfig {
    /// Create a new configuration suited to development.
    pub fn development() -> Self {
        Self {
            queue: QueueConfig::with_capacity(10),
            pipeline: PipelineConfig {
                name: "development".to_string(),
                producers: 2,
                consumers: 2,
                total_tasks: 100,
                produce_delay_ms: 10,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Create a new configuration suited to throughput measurements.
    pub fn production() -> Self {
        Self {
            queue: QueueConfig::with_capacity(1024),
            pipeline: PipelineConfig {
                name: "production".to_string(),
                producers: num_cpus::get().max(1),
                consumers: num_cpus::get().max(1),
                total_tasks: 1_000_000,
                shutdown_timeout_secs: 300,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Info,
                json_format: true,
                colored: false,
                include_targets: false,
            },
        }
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self {
            queue: QueueConfig::with_capacity(4),
            pipeline: PipelineConfig {
                name: "testing".to_string(),
                producers: 2,
                consumers: 2,
                total_tasks: 50,
                shutdown_timeout_secs: 5,
                collect_ids: true,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: false,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        self.pipeline.validate()
    }
}

impl PipelineConfig {
    /// Validate the pipeline configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.producers == 0 {
            errors.push("Number of producers must be greater than 0".to_string());
        }

        if self.consumers == 0 {
            errors.push("Number of consumers must be greater than 0".to_string());
        }

        if self.shutdown_timeout_secs == 0 {
            errors.push("Shutdown timeout must be greater than 0".to_string());
        }

        // Task ids are `i32`, numbered from 1.
        if self.total_tasks > i32::MAX as usize {
            errors.push(format!("Total tasks must not exceed {}", i32::MAX));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TallyConfig::default();
        assert_eq!(config.queue.capacity, 100);
        assert!(config.pipeline.consumers > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        let development = TallyConfig::development();
        assert_eq!(development.queue.capacity, 10);
        assert!(matches!(development.logging.level, LogLevel::Debug));
        assert!(development.validate().is_ok());

        let production = TallyConfig::production();
        assert!(production.logging.json_format);
        assert!(production.validate().is_ok());

        let testing = TallyConfig::testing();
        assert!(testing.pipeline.collect_ids);
        assert!(testing.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TallyConfig::default();

        config.pipeline.producers = 0;
        assert!(config.validate().is_err());

        config.pipeline.producers = 1;
        config.pipeline.consumers = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("consumers"));
    }

    #[test]
    fn test_total_tasks_must_fit_task_ids() {
        let config = PipelineConfig::new(1, 1).with_total_tasks(i32::MAX as usize);
        assert!(config.validate().is_ok());

        let errors = config
            .with_total_tasks(i32::MAX as usize + 1)
            .validate()
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Total tasks"));
    }

    #[test]
    fn test_zero_capacity_is_accepted() {
        let config = TallyConfig {
            queue: QueueConfig::with_capacity(0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_share_of_spreads_remainder() {
        let config = PipelineConfig::new(3, 1).with_total_tasks(10);
        assert_eq!(config.share_of(0), 4);
        assert_eq!(config.share_of(1), 3);
        assert_eq!(config.share_of(2), 3);
        assert_eq!((0..3).map(|p| config.share_of(p)).sum::<usize>(), 10);

        let none = PipelineConfig::new(0, 1);
        assert_eq!(none.share_of(0), 0);
    }

    #[test]
    fn test_pipeline_config_builders() {
        let config = PipelineConfig::new(4, 2)
            .with_name("bench")
            .with_total_tasks(500)
            .with_produce_delay(5)
            .with_shutdown_timeout(10)
            .with_collected_ids(true);

        assert_eq!(config.name, "bench");
        assert_eq!(config.total_tasks, 500);
        assert_eq!(config.produce_delay(), Duration::from_millis(5));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert!(config.collect_ids);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
    }

    #[test]
    fn test_duration_ext() {
        assert_eq!(5u64.secs(), Duration::from_secs(5));
        assert_eq!(1500u64.millis(), Duration::from_millis(1500));
    }
}
