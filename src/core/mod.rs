//! Producer/consumer pipeline built on [`BoundedQueue`].
//!
//! A [`Pipeline`] runs a fixed number of producers and consumers over one
//! queue, closes the queue once production is over and reports throughput
//! together with the queue's latency statistics.

use crate::config::TallyConfig;
use crate::error::{QueueError, QueueResult};
use crate::queue::BoundedQueue;
use std::sync::Arc;

pub mod engine;
pub mod sweep;
pub mod worker;

pub use engine::{BenchmarkReport, PipelineEngine};
pub use sweep::{BenchmarkRow, export_csv, run_sweep, to_csv, write_csv};
pub use worker::{Consumer, ConsumerOutcome, Producer, WorkerManager, WorkerStats};

/// A producer/consumer pipeline.
///
/// # Examples
///
/// ```rust
/// use tallyq::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> QueueResult<()> {
///     let pipeline = Pipeline::new(TallyConfig::testing())?;
///     let report = pipeline.run().await?;
///     assert_eq!(report.tasks_produced, report.tasks_consumed);
///     Ok(())
/// }
/// ```
pub struct Pipeline {
    queue: Arc<BoundedQueue>,
    config: TallyConfig,
}

impl Pipeline {
    /// Create a new pipeline with its own queue.
    pub fn new(config: TallyConfig) -> QueueResult<Self> {
        let queue = Arc::new(BoundedQueue::with_config(&config.queue));
        Self::with_queue(config, queue)
    }

    /// Create a pipeline over an existing queue.
    ///
    /// The queue's own capacity wins over `config.queue`.
    pub fn with_queue(config: TallyConfig, queue: Arc<BoundedQueue>) -> QueueResult<Self> {
        config
            .validate()
            .map_err(|errors| QueueError::config(errors.join("; ")))?;

        Ok(Self { queue, config })
    }

    /// Run the pipeline to completion.
    ///
    /// The queue is closed at the end of the run, so a pipeline runs once.
    pub async fn run(&self) -> QueueResult<BenchmarkReport> {
        if self.queue.is_closed() {
            return Err(QueueError::config("Pipeline queue is already closed"));
        }

        let engine = PipelineEngine::new(self.config.pipeline.clone(), Arc::clone(&self.queue));
        engine.run().await
    }

    /// The queue driven by this pipeline.
    pub fn queue(&self) -> &Arc<BoundedQueue> {
        &self.queue
    }

    /// Get the configuration used by this pipeline.
    pub fn config(&self) -> &TallyConfig {
        &self.config
    }
}
