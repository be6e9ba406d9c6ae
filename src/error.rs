//! Error types for tallyq operations.

use crate::task::Task;
use thiserror::Error;

/// Result type used throughout tallyq.
pub type QueueResult<T> = Result<T, QueueError>;

/// Main error type for tallyq operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue was closed; the rejected task is handed back
    #[error("Queue is closed, task {} was not enqueued", .0.id)]
    Closed(Task),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Pipeline workers did not finish in time
    #[error("Pipeline workers did not finish within {timeout_secs} seconds")]
    Timeout {
        /// Timeout duration in seconds
        timeout_secs: u64,
    },

    /// A pipeline worker panicked
    #[error("Worker failed: {message}")]
    WorkerFailed {
        /// Error message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error while writing a report
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Logging could not be initialized
    #[error("Logging initialization failed: {message}")]
    Logging {
        /// Error message
        message: String,
    },
}

impl QueueError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Recover the task from a `Closed` error.
    pub fn into_task(self) -> Option<Task> {
        match self {
            Self::Closed(task) => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_hands_task_back() {
        let err = QueueError::Closed(Task::new(3, "c"));
        assert_eq!(err.to_string(), "Queue is closed, task 3 was not enqueued");
        assert_eq!(err.into_task(), Some(Task::new(3, "c")));
    }

    #[test]
    fn test_io_error_converts() {
        let err: QueueError = std::io::Error::other("disk full").into();
        assert_eq!(err.to_string(), "I/O error: disk full");
    }

    #[test]
    fn test_config_error_has_no_task() {
        let err = QueueError::config("producers must be greater than 0");
        assert!(err.to_string().contains("producers"));
        assert!(err.into_task().is_none());
    }
}
