//! # tallyq
//!
//! A bounded work queue for producer/consumer pipelines that measures the
//! latency of every enqueue and dequeue.
//!
//! ## Features
//!
//! - **Bounded FIFO**: producers wait for room, consumers wait for work
//! - **Latency statistics**: total, count, mean, max and min per operation,
//!   aggregated lock-free
//! - **Graceful close**: consumers drain what is left, then stop
//! - **Async and threads**: `enqueue`/`dequeue` for tokio tasks,
//!   `blocking_enqueue`/`blocking_dequeue` for plain threads
//! - **Benchmark pipeline**: run N producers against M consumers and get a
//!   JSON report, or sweep configurations and capacities into a CSV table
//!
//! ## Quick Start
//!
//! ```rust
//! use tallyq::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> QueueResult<()> {
//!     let queue = Arc::new(BoundedQueue::new(2));
//!
//!     queue.enqueue(Task::new(1, "a")).await?;
//!     queue.enqueue(Task::new(2, "b")).await?;
//!     assert_eq!(queue.len(), 2);
//!
//!     assert_eq!(queue.dequeue().await, Some(Task::new(1, "a")));
//!     assert_eq!(queue.dequeue().await, Some(Task::new(2, "b")));
//!     assert!(queue.is_empty());
//!
//!     println!("average enqueue: {:.1}µs", queue.average_enqueue_time());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod queue;
pub mod task;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::core::{BenchmarkReport, BenchmarkRow, Pipeline, run_sweep};
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::queue::{BoundedQueue, LatencySnapshot, QueueStats};
    pub use crate::task::{Task, TaskId};
}

pub use crate::config::*;
pub use crate::core::{BenchmarkReport, BenchmarkRow, Pipeline, run_sweep};
pub use crate::error::{QueueError, QueueResult};
pub use crate::queue::{BoundedQueue, LatencySnapshot, QueueStats};
pub use crate::task::{Task, TaskId};
