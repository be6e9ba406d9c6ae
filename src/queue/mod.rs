//! The bounded, instrumented queue.
//!
//! [`BoundedQueue`] is a fixed-capacity FIFO shared by any number of
//! producers and consumers. Every enqueue and dequeue measures its own
//! wall-clock latency into a lock-free [`LatencyRecorder`].
//!
//! # Examples
//!
//! ```rust
//! use tallyq::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> QueueResult<()> {
//! let queue = Arc::new(BoundedQueue::new(8));
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     tokio::spawn(async move {
//!         for id in 0..32 {
//!             queue.enqueue(Task::new(id, format!("Task_{}", id))).await?;
//!         }
//!         queue.close();
//!         Ok::<_, QueueError>(())
//!     })
//! };
//!
//! while let Some(task) = queue.dequeue().await {
//!     println!("got {}", task.name);
//! }
//! producer.await.unwrap()?;
//!
//! println!("{}", serde_json::to_string_pretty(&queue.stats())?);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod bounded;
pub mod stats;

pub use bounded::BoundedQueue;
pub use stats::{LatencyRecorder, LatencySnapshot};

/// Statistics about the queue state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Configured capacity
    pub capacity: usize,
    /// Buffered tasks at snapshot time
    pub len: usize,
    /// Highest number of buffered tasks seen
    pub max_len: usize,
    /// Whether the queue was closed
    pub closed: bool,
    /// Reserved blocking counter
    pub block_count: i64,
    /// Enqueue latencies
    pub enqueue: LatencySnapshot,
    /// Dequeue latencies
    pub dequeue: LatencySnapshot,
}
