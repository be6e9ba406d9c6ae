//! Bounded FIFO queue with per-operation latency tracking.
//!
//! The queue behaves like a buffered channel shared by any number of
//! producers and consumers:
//!
//! - **Bounded**: at most `capacity` tasks are buffered; producers wait for room
//! - **Fair**: parked producers and parked consumers are served in arrival order
//! - **Instrumented**: every enqueue and dequeue records its wall-clock latency,
//!   time spent waiting included
//! - **Closable**: closing rejects new work while consumers drain what is left
//!
//! A capacity of zero is allowed and turns the queue into a rendezvous point:
//! an enqueue completes only when a dequeue takes the task directly.

use super::QueueStats;
use super::stats::LatencyRecorder;
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::task::Task;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;

/// Task offered by a parked producer. Whoever empties the slot owns the task:
/// the queue when it admits it, the producer when it withdraws or is rejected.
type Slot = Arc<Mutex<Option<Task>>>;

/// A task waiting for room at the back of a full buffer.
#[derive(Debug)]
struct ParkedSender {
    task: Slot,
    /// `None` once the task was accepted and only room is missing.
    wake: Option<oneshot::Sender<()>>,
}

impl ParkedSender {
    fn accepted(task: Task) -> Self {
        Self {
            task: Arc::new(Mutex::new(Some(task))),
            wake: None,
        }
    }

    /// Take the task and wake its producer. `None` if the producer withdrew.
    fn claim(self) -> Option<Task> {
        let task = self.task.lock().take()?;
        if let Some(wake) = self.wake {
            let _ = wake.send(());
        }
        Some(task)
    }

    fn is_withdrawn(&self) -> bool {
        self.task.lock().is_none()
    }
}

#[derive(Debug)]
struct Inner {
    buffer: VecDeque<Task>,
    /// Only non-empty while the buffer is full.
    senders: VecDeque<ParkedSender>,
    /// Only non-empty while the buffer is empty.
    receivers: VecDeque<oneshot::Sender<Task>>,
}

/// Outcome of offering a task under the lock.
enum Admission {
    Accepted,
    Parked(Slot, oneshot::Receiver<()>),
}

/// Outcome of asking for a task under the lock.
enum Take {
    Ready(Task),
    Parked(oneshot::Receiver<Task>),
    Closed,
}

/// An enqueue waiting for room.
///
/// Dropped before the queue answers, it withdraws its task, or counts the
/// enqueue if the task was admitted in the meantime.
struct PendingEnqueue<'a> {
    queue: &'a BoundedQueue,
    task: Slot,
    wake: Option<oneshot::Receiver<()>>,
    start: Instant,
    settled: bool,
}

impl PendingEnqueue<'_> {
    async fn wait(&mut self) -> QueueResult<()> {
        if let Some(wake) = self.wake.as_mut() {
            let _ = wake.await;
        }
        self.settle()
    }

    fn blocking_wait(&mut self) -> QueueResult<()> {
        if let Some(wake) = self.wake.take() {
            let _ = wake.blocking_recv();
        }
        self.settle()
    }

    /// An empty slot means the task was admitted. A full one after wake-up
    /// means the queue closed and dropped the wake-up sender.
    fn settle(&mut self) -> QueueResult<()> {
        self.settled = true;
        match self.task.lock().take() {
            None => Ok(()),
            Some(task) => Err(QueueError::Closed(task)),
        }
    }
}

impl Drop for PendingEnqueue<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.task.lock().take() {
            Some(task) => tracing::debug!("Enqueue of task {} abandoned while waiting", task.id),
            None => self.queue.enqueue_stats.record(self.start.elapsed()),
        }
    }
}

/// A dequeue waiting for a task.
///
/// Dropped after a producer already handed it a task, it puts that task back.
struct PendingDequeue<'a> {
    queue: &'a BoundedQueue,
    rx: Option<oneshot::Receiver<Task>>,
}

impl PendingDequeue<'_> {
    async fn wait(&mut self) -> Option<Task> {
        let rx = self.rx.as_mut()?;
        let task = rx.await.ok();
        self.rx = None;
        task
    }

    fn blocking_wait(&mut self) -> Option<Task> {
        self.rx.take()?.blocking_recv().ok()
    }
}

impl Drop for PendingDequeue<'_> {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if let Ok(task) = rx.try_recv() {
                tracing::debug!("Dequeue abandoned after hand-off, requeueing task {}", task.id);
                self.queue.restore(task);
            }
        }
    }
}

/// Bounded, instrumented work queue.
///
/// # Examples
///
/// ```rust
/// use tallyq::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> QueueResult<()> {
/// let queue = BoundedQueue::new(2);
/// queue.enqueue(Task::new(1, "a")).await?;
/// queue.enqueue(Task::new(2, "b")).await?;
/// assert_eq!(queue.len(), 2);
///
/// assert_eq!(queue.dequeue().await, Some(Task::new(1, "a")));
/// assert_eq!(queue.enqueue_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BoundedQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    /// Mirror of the buffer length, written only while holding `inner`.
    len: AtomicUsize,
    max_len: AtomicUsize,
    /// Written only while holding `inner`.
    closed: AtomicBool,
    enqueue_stats: LatencyRecorder,
    dequeue_stats: LatencyRecorder,
    /// Reserved statistic, never incremented.
    block_count: AtomicI64,
}

impl BoundedQueue {
    /// Create a queue holding up to `capacity` tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(capacity),
                senders: VecDeque::new(),
                receivers: VecDeque::new(),
            }),
            len: AtomicUsize::new(0),
            max_len: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            enqueue_stats: LatencyRecorder::new(),
            dequeue_stats: LatencyRecorder::new(),
            block_count: AtomicI64::new(0),
        }
    }

    /// Create a queue from configuration.
    pub fn with_config(config: &QueueConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Add a task at the back of the queue, waiting for room if it is full.
    ///
    /// Fails only if the queue is closed, either before the call or while
    /// the call was waiting for room. The task is handed back in the error.
    pub async fn enqueue(&self, task: Task) -> QueueResult<()> {
        let start = Instant::now();
        let task_id = task.id;

        if let Admission::Parked(slot, wake) = self.offer(task)? {
            tracing::debug!("Queue full, task {} waiting for room", task_id);
            self.pending_enqueue(slot, wake, start).wait().await?;
        }

        self.enqueue_stats.record(start.elapsed());
        tracing::debug!("Enqueued task: {}", task_id);
        Ok(())
    }

    /// Remove the oldest task, waiting for one if the queue is empty.
    ///
    /// Returns `None` only once the queue is closed and no task is left.
    pub async fn dequeue(&self) -> Option<Task> {
        let start = Instant::now();

        let task = match self.take() {
            Take::Ready(task) => task,
            Take::Parked(rx) => self.pending_dequeue(rx).wait().await?,
            Take::Closed => return None,
        };

        self.dequeue_stats.record(start.elapsed());
        tracing::debug!("Dequeued task: {}", task.id);
        Some(task)
    }

    /// Same as [`enqueue`](Self::enqueue), blocking the current thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_enqueue(&self, task: Task) -> QueueResult<()> {
        let start = Instant::now();
        let task_id = task.id;

        if let Admission::Parked(slot, wake) = self.offer(task)? {
            tracing::debug!("Queue full, task {} blocking for room", task_id);
            self.pending_enqueue(slot, wake, start).blocking_wait()?;
        }

        self.enqueue_stats.record(start.elapsed());
        tracing::debug!("Enqueued task: {}", task_id);
        Ok(())
    }

    /// Same as [`dequeue`](Self::dequeue), blocking the current thread.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_dequeue(&self) -> Option<Task> {
        let start = Instant::now();

        let task = match self.take() {
            Take::Ready(task) => task,
            Take::Parked(rx) => self.pending_dequeue(rx).blocking_wait()?,
            Take::Closed => return None,
        };

        self.dequeue_stats.record(start.elapsed());
        tracing::debug!("Dequeued task: {}", task.id);
        Some(task)
    }

    /// Close the queue.
    ///
    /// New enqueues fail, producers waiting for room get their task back,
    /// and consumers keep receiving buffered tasks until none is left.
    /// Returns `false` if the queue was already closed.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.closed.store(true, Ordering::Release);

        // Dropping a wake-up sender rejects its producer. Tasks already
        // accepted stay in line.
        let mut rejected = 0;
        inner.senders.retain(|parked| {
            if parked.wake.is_none() {
                return true;
            }
            if !parked.is_withdrawn() {
                rejected += 1;
            }
            false
        });
        // Dropping the senders wakes every parked consumer with `None`.
        inner.receivers.clear();

        if rejected > 0 {
            tracing::warn!("Queue closed with {} producers still waiting", rejected);
        }
        tracing::debug!("Queue closed with {} buffered tasks", inner.buffer.len());
        true
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Remove every buffered task at once, oldest first.
    ///
    /// Drained tasks are not counted as dequeues. Producers waiting for
    /// room are let in as space frees up.
    pub fn drain(&self) -> Vec<Task> {
        let mut inner = self.inner.lock();
        let drained: Vec<Task> = inner.buffer.drain(..).collect();
        while inner.buffer.len() < self.capacity && Self::admit_parked(&mut inner) {}
        self.sync_len(&inner);

        tracing::debug!("Drained {} tasks from queue", drained.len());
        drained
    }

    /// Whether the queue currently holds no task.
    ///
    /// This is a snapshot: another producer or consumer may change it the
    /// moment after it is taken.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buffered tasks, as a snapshot.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Maximum number of buffered tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest number of tasks ever buffered at once.
    pub fn max_len(&self) -> usize {
        self.max_len.load(Ordering::Relaxed)
    }

    /// Total time spent in enqueue, in microseconds.
    pub fn total_enqueue_time(&self) -> i64 {
        self.enqueue_stats.total()
    }

    /// Total time spent in dequeue, in microseconds.
    pub fn total_dequeue_time(&self) -> i64 {
        self.dequeue_stats.total()
    }

    /// Mean enqueue latency in microseconds, 0 before the first enqueue.
    pub fn average_enqueue_time(&self) -> f64 {
        self.enqueue_stats.average()
    }

    /// Mean dequeue latency in microseconds, 0 before the first dequeue.
    pub fn average_dequeue_time(&self) -> f64 {
        self.dequeue_stats.average()
    }

    pub fn max_enqueue_time(&self) -> i64 {
        self.enqueue_stats.max()
    }

    pub fn min_enqueue_time(&self) -> i64 {
        self.enqueue_stats.min()
    }

    pub fn max_dequeue_time(&self) -> i64 {
        self.dequeue_stats.max()
    }

    pub fn min_dequeue_time(&self) -> i64 {
        self.dequeue_stats.min()
    }

    /// Number of completed enqueues.
    pub fn enqueue_count(&self) -> i64 {
        self.enqueue_stats.count()
    }

    /// Number of completed dequeues.
    pub fn dequeue_count(&self) -> i64 {
        self.dequeue_stats.count()
    }

    /// Reserved blocking counter. Always 0.
    pub fn block_count(&self) -> i64 {
        self.block_count.load(Ordering::Relaxed)
    }

    /// Snapshot of every statistic. Never takes the buffer lock.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            len: self.len(),
            max_len: self.max_len(),
            closed: self.is_closed(),
            block_count: self.block_count(),
            enqueue: self.enqueue_stats.snapshot(),
            dequeue: self.dequeue_stats.snapshot(),
        }
    }

    fn pending_enqueue(
        &self,
        task: Slot,
        wake: oneshot::Receiver<()>,
        start: Instant,
    ) -> PendingEnqueue<'_> {
        PendingEnqueue {
            queue: self,
            task,
            wake: Some(wake),
            start,
            settled: false,
        }
    }

    fn pending_dequeue(&self, rx: oneshot::Receiver<Task>) -> PendingDequeue<'_> {
        PendingDequeue {
            queue: self,
            rx: Some(rx),
        }
    }

    fn offer(&self, mut task: Task) -> QueueResult<Admission> {
        let mut inner = self.inner.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed(task));
        }

        // A parked consumer implies an empty buffer, so handing the task over
        // directly keeps FIFO order.
        while let Some(receiver) = inner.receivers.pop_front() {
            match receiver.send(task) {
                Ok(()) => return Ok(Admission::Accepted),
                Err(returned) => task = returned,
            }
        }

        if inner.buffer.len() < self.capacity {
            inner.buffer.push_back(task);
            self.sync_len(&inner);
            return Ok(Admission::Accepted);
        }

        inner.senders.retain(|parked| !parked.is_withdrawn());
        let slot = Arc::new(Mutex::new(Some(task)));
        let (wake, rx) = oneshot::channel();
        inner.senders.push_back(ParkedSender {
            task: Arc::clone(&slot),
            wake: Some(wake),
        });
        Ok(Admission::Parked(slot, rx))
    }

    fn take(&self) -> Take {
        let mut inner = self.inner.lock();

        if let Some(task) = inner.buffer.pop_front() {
            Self::admit_parked(&mut inner);
            self.sync_len(&inner);
            return Take::Ready(task);
        }

        // With an empty buffer, parked producers only exist at capacity 0.
        while let Some(parked) = inner.senders.pop_front() {
            if let Some(task) = parked.claim() {
                return Take::Ready(task);
            }
        }

        if self.closed.load(Ordering::Acquire) {
            return Take::Closed;
        }

        inner.receivers.retain(|tx| !tx.is_closed());
        let (tx, rx) = oneshot::channel();
        inner.receivers.push_back(tx);
        Take::Parked(rx)
    }

    /// Move the oldest parked task into the buffer, skipping producers that
    /// withdrew.
    fn admit_parked(inner: &mut Inner) -> bool {
        while let Some(parked) = inner.senders.pop_front() {
            if let Some(task) = parked.claim() {
                inner.buffer.push_back(task);
                return true;
            }
        }
        false
    }

    /// Put back a task handed to a consumer that went away before taking it.
    ///
    /// The task is older than anything buffered, so it goes first. When the
    /// buffer is full the newest buffered task moves to the head of the
    /// parked producers instead.
    fn restore(&self, mut task: Task) {
        let mut inner = self.inner.lock();
        while let Some(receiver) = inner.receivers.pop_front() {
            match receiver.send(task) {
                Ok(()) => return,
                Err(returned) => task = returned,
            }
        }

        if inner.buffer.len() < self.capacity {
            inner.buffer.push_front(task);
        } else {
            let waiting = match inner.buffer.pop_back() {
                Some(newest) => {
                    inner.buffer.push_front(task);
                    newest
                }
                None => task,
            };
            inner.senders.push_front(ParkedSender::accepted(waiting));
        }
        self.sync_len(&inner);
    }

    fn sync_len(&self, inner: &Inner) {
        let len = inner.buffer.len();
        self.len.store(len, Ordering::Release);
        self.max_len.fetch_max(len, Ordering::Relaxed);
    }
}
