//! The pipeline engine - runs producers and consumers to completion.
//!
//! The engine coordinates one benchmark run:
//! - Spawning producers with their share of tasks
//! - Spawning consumers
//! - Closing the queue once every producer is done
//! - Collecting worker results into a [`BenchmarkReport`]

use crate::config::PipelineConfig;
use crate::core::worker::{ConsumerOutcome, WorkerManager, WorkerStats};
use crate::error::{QueueError, QueueResult};
use crate::queue::{BoundedQueue, QueueStats};
use crate::task::TaskId;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{AbortHandle, JoinError};
use tokio::time::timeout;

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Name of the run
    pub name: String,
    /// Queue capacity
    pub capacity: usize,
    /// Number of producers
    pub producers: usize,
    /// Number of consumers
    pub consumers: usize,
    /// Tasks accepted by the queue
    pub tasks_produced: usize,
    /// Tasks completed by consumers
    pub tasks_consumed: usize,
    /// Wall-clock duration of the run (µs)
    pub elapsed_micros: i64,
    /// Completed tasks per second
    pub throughput_per_sec: f64,
    /// Queue statistics at the end of the run
    pub queue: QueueStats,
    /// Ids of every completed task, if collected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_ids: Option<Vec<TaskId>>,
}

impl BenchmarkReport {
    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> QueueResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs one producer/consumer pipeline over a queue
pub struct PipelineEngine {
    config: PipelineConfig,
    queue: Arc<BoundedQueue>,
    worker_manager: WorkerManager,
}

impl PipelineEngine {
    /// Create a new engine
    pub fn new(config: PipelineConfig, queue: Arc<BoundedQueue>) -> Self {
        let worker_manager = WorkerManager::new(Arc::clone(&queue));
        Self {
            config,
            queue,
            worker_manager,
        }
    }

    /// Run every worker to completion.
    ///
    /// If the workers do not finish within the shutdown timeout the queue is
    /// closed, every worker is aborted and `Timeout` is returned.
    pub async fn run(&self) -> QueueResult<BenchmarkReport> {
        tracing::info!(
            "Starting pipeline '{}' with {} producers and {} consumers over capacity {}",
            self.config.name,
            self.config.producers,
            self.config.consumers,
            self.queue.capacity()
        );

        let start = Instant::now();

        let consumers: Vec<_> = (0..self.config.consumers)
            .map(|id| {
                self.worker_manager
                    .spawn_consumer(id, self.config.collect_ids)
            })
            .collect();
        let producers: Vec<_> = (0..self.config.producers)
            .map(|id| {
                self.worker_manager.spawn_producer(
                    id,
                    self.config.share_of(id),
                    self.config.produce_delay(),
                )
            })
            .collect();

        let abort_handles: Vec<AbortHandle> = producers
            .iter()
            .map(|h| h.abort_handle())
            .chain(consumers.iter().map(|h| h.abort_handle()))
            .collect();

        let queue = Arc::clone(&self.queue);
        let joined = timeout(self.config.shutdown_timeout(), async move {
            let produced = join_all(producers).await;
            queue.close();
            let finished = join_all(consumers).await;
            (produced, finished)
        })
        .await;

        let (produced, finished) = match joined {
            Ok(results) => results,
            Err(_) => {
                self.queue.close();
                for handle in &abort_handles {
                    handle.abort();
                }
                tracing::error!(
                    "Pipeline '{}' timed out after {:?}",
                    self.config.name,
                    self.config.shutdown_timeout()
                );
                return Err(QueueError::Timeout {
                    timeout_secs: self.config.shutdown_timeout_secs,
                });
            }
        };

        let elapsed = start.elapsed();

        let tasks_produced = produced
            .into_iter()
            .map(|r| r.map_err(worker_failed))
            .sum::<QueueResult<usize>>()?;

        let mut tasks_consumed = 0;
        let mut consumed_ids = Vec::new();
        for outcome in finished {
            let ConsumerOutcome { consumed, ids } = outcome.map_err(worker_failed)?;
            tasks_consumed += consumed;
            consumed_ids.extend(ids);
        }

        let elapsed_secs = elapsed.as_secs_f64();
        let report = BenchmarkReport {
            name: self.config.name.clone(),
            capacity: self.queue.capacity(),
            producers: self.config.producers,
            consumers: self.config.consumers,
            tasks_produced,
            tasks_consumed,
            elapsed_micros: i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX),
            throughput_per_sec: if elapsed_secs > 0.0 {
                tasks_consumed as f64 / elapsed_secs
            } else {
                0.0
            },
            queue: self.queue.stats(),
            consumed_ids: self.config.collect_ids.then_some(consumed_ids),
        };

        tracing::info!(
            "Pipeline '{}' finished in {:?}: produced {}, consumed {}, avg enqueue {:.1}µs, avg dequeue {:.1}µs",
            report.name,
            elapsed,
            report.tasks_produced,
            report.tasks_consumed,
            report.queue.enqueue.average_micros,
            report.queue.dequeue.average_micros
        );
        Ok(report)
    }

    /// Get worker statistics
    pub async fn worker_stats(&self) -> WorkerStats {
        self.worker_manager.stats().await
    }
}

fn worker_failed(error: JoinError) -> QueueError {
    tracing::error!("Pipeline worker failed: {}", error);
    QueueError::WorkerFailed {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_accounts_for_every_task() {
        let config = PipelineConfig::new(3, 2)
            .with_total_tasks(301)
            .with_collected_ids(true);
        let queue = Arc::new(BoundedQueue::new(4));
        let engine = PipelineEngine::new(config, Arc::clone(&queue));

        let report = engine.run().await.unwrap();

        assert_eq!(report.tasks_produced, 301);
        assert_eq!(report.tasks_consumed, 301);
        let ids = report.consumed_ids.unwrap();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique, (1..=301).collect::<HashSet<_>>());

        assert!(report.queue.closed);
        assert_eq!(report.queue.len, 0);
        assert!(report.queue.max_len <= 4);
        assert_eq!(report.queue.enqueue.count, 301);
        assert_eq!(report.queue.dequeue.count, 301);

        let stats = engine.worker_stats().await;
        assert_eq!(stats.tasks_consumed, 301);
        assert_eq!(stats.active_producers, 0);
    }

    #[tokio::test]
    async fn test_run_with_zero_capacity() {
        let config = PipelineConfig::new(2, 2).with_total_tasks(20);
        let engine = PipelineEngine::new(config, Arc::new(BoundedQueue::new(0)));

        let report = engine.run().await.unwrap();
        assert_eq!(report.tasks_consumed, 20);
        assert_eq!(report.queue.max_len, 0);
        assert!(report.consumed_ids.is_none());
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let config = PipelineConfig::new(1, 1)
            .with_total_tasks(10)
            .with_produce_delay(2_000)
            .with_shutdown_timeout(1);
        let queue = Arc::new(BoundedQueue::new(4));
        let engine = PipelineEngine::new(config, Arc::clone(&queue));

        let result = engine.run().await;
        assert!(matches!(result, Err(QueueError::Timeout { timeout_secs: 1 })));
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn test_report_json() {
        let config = PipelineConfig::new(1, 1).with_name("json").with_total_tasks(5);
        let engine = PipelineEngine::new(config, Arc::new(BoundedQueue::new(2)));

        let json = engine.run().await.unwrap().to_json().unwrap();
        let report: BenchmarkReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.name, "json");
        assert_eq!(report.tasks_consumed, 5);
        assert!(!json.contains("consumed_ids"));
    }
}
