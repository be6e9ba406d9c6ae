//! Producer and consumer workers.
//!
//! Producers create tasks and push them into the shared queue; consumers pull
//! tasks out until the queue is closed and drained.

use crate::error::QueueError;
use crate::queue::BoundedQueue;
use crate::task::{Task, TaskId};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Statistics about worker activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Producers still running
    pub active_producers: usize,
    /// Consumers still running
    pub active_consumers: usize,
    /// Tasks successfully enqueued
    pub tasks_produced: u64,
    /// Tasks dequeued and completed
    pub tasks_consumed: u64,
    /// Tasks refused because the queue was closed
    pub tasks_rejected: u64,
}

/// What a consumer hands back when it stops
#[derive(Debug, Clone, Default)]
pub struct ConsumerOutcome {
    /// Number of tasks completed
    pub consumed: usize,
    /// Ids of completed tasks, in the order this consumer saw them
    pub ids: Vec<TaskId>,
}

/// Worker that enqueues its share of tasks
pub struct Producer {
    id: usize,
    queue: Arc<BoundedQueue>,
    share: usize,
    delay: Duration,
    next_task_id: Arc<AtomicI32>,
}

impl Producer {
    /// Create a new producer
    pub fn new(
        id: usize,
        queue: Arc<BoundedQueue>,
        share: usize,
        delay: Duration,
        next_task_id: Arc<AtomicI32>,
    ) -> Self {
        Self {
            id,
            queue,
            share,
            delay,
            next_task_id,
        }
    }

    /// Enqueue `share` tasks and return how many were accepted.
    ///
    /// Stops early if the queue gets closed.
    pub async fn run(&self, stats: &Mutex<WorkerStats>) -> usize {
        tracing::debug!("Producer {} started, {} tasks to produce", self.id, self.share);

        let mut produced = 0;
        for _ in 0..self.share {
            let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
            let task = Task::new(task_id, format!("Task_{}", task_id));

            match self.queue.enqueue(task).await {
                Ok(()) => {
                    produced += 1;
                    stats.lock().await.tasks_produced += 1;
                }
                Err(QueueError::Closed(task)) => {
                    tracing::warn!(
                        "Producer {} stopping, queue closed before task {}",
                        self.id,
                        task.id
                    );
                    stats.lock().await.tasks_rejected += 1;
                    break;
                }
                Err(e) => {
                    tracing::error!("Producer {} enqueue failed: {}", self.id, e);
                    break;
                }
            }

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }

        tracing::debug!("Producer {} finished, produced {}", self.id, produced);
        produced
    }
}

/// Worker that completes tasks until the queue is drained
pub struct Consumer {
    id: usize,
    queue: Arc<BoundedQueue>,
    collect_ids: bool,
}

impl Consumer {
    /// Create a new consumer
    pub fn new(id: usize, queue: Arc<BoundedQueue>, collect_ids: bool) -> Self {
        Self {
            id,
            queue,
            collect_ids,
        }
    }

    /// Dequeue and complete tasks until the queue is closed and empty.
    pub async fn run(&self, stats: &Mutex<WorkerStats>) -> ConsumerOutcome {
        tracing::debug!("Consumer {} started", self.id);

        let mut outcome = ConsumerOutcome::default();
        while let Some(task) = self.queue.dequeue().await {
            let task = task.complete();
            tracing::trace!("Consumer {} completed {}", self.id, task.name);

            outcome.consumed += 1;
            if self.collect_ids {
                outcome.ids.push(task.id);
            }
            stats.lock().await.tasks_consumed += 1;
        }

        tracing::debug!("Consumer {} finished, consumed {}", self.id, outcome.consumed);
        outcome
    }
}

/// Spawns producers and consumers over one queue and tracks them
pub struct WorkerManager {
    queue: Arc<BoundedQueue>,
    next_task_id: Arc<AtomicI32>,
    active_producers: Arc<AtomicUsize>,
    active_consumers: Arc<AtomicUsize>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerManager {
    /// Create a new worker manager. Task ids start at 1.
    pub fn new(queue: Arc<BoundedQueue>) -> Self {
        Self {
            queue,
            next_task_id: Arc::new(AtomicI32::new(1)),
            active_producers: Arc::new(AtomicUsize::new(0)),
            active_consumers: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(Mutex::new(WorkerStats::default())),
        }
    }

    /// Spawn a producer enqueueing `share` tasks
    pub fn spawn_producer(&self, id: usize, share: usize, delay: Duration) -> JoinHandle<usize> {
        let producer = Producer::new(
            id,
            Arc::clone(&self.queue),
            share,
            delay,
            Arc::clone(&self.next_task_id),
        );
        let active = Arc::clone(&self.active_producers);
        let stats = Arc::clone(&self.stats);

        active.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            let produced = producer.run(&stats).await;
            active.fetch_sub(1, Ordering::Relaxed);
            produced
        })
    }

    /// Spawn a consumer
    pub fn spawn_consumer(&self, id: usize, collect_ids: bool) -> JoinHandle<ConsumerOutcome> {
        let consumer = Consumer::new(id, Arc::clone(&self.queue), collect_ids);
        let active = Arc::clone(&self.active_consumers);
        let stats = Arc::clone(&self.stats);

        active.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            let outcome = consumer.run(&stats).await;
            active.fetch_sub(1, Ordering::Relaxed);
            outcome
        })
    }

    /// Get current worker statistics
    pub async fn stats(&self) -> WorkerStats {
        let mut stats = self.stats.lock().await.clone();
        stats.active_producers = self.active_producers.load(Ordering::Relaxed);
        stats.active_consumers = self.active_consumers.load(Ordering::Relaxed);
        stats
    }

    /// Number of producers still running
    pub fn active_producer_count(&self) -> usize {
        self.active_producers.load(Ordering::Relaxed)
    }

    /// Number of consumers still running
    pub fn active_consumer_count(&self) -> usize {
        self.active_consumers.load(Ordering::Relaxed)
    }
}
