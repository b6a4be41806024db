//! Priority task queue and drain coordination for the mirror run.
//!
//! The queue is the single coordination point between the producer and the
//! worker pool. Tasks are ordered by `(priority, insertion sequence)` — the
//! high band always dispatches first, FIFO within a band — and the queue
//! tracks enough state to decide when a run is permanently over:
//!
//! - `producing` — true until the producer finishes enumeration
//! - the pending heap — tasks waiting for a worker
//! - `in_flight` — tasks a worker has dequeued but not yet finished
//!
//! A worker's [`dequeue`](TaskQueue::dequeue) returns `None` only when all
//! three are exhausted. An in-flight task may still re-enqueue itself through
//! the retry path, so "heap empty" alone never terminates a worker; every
//! retry strictly decreases a task's budget, which is what makes the drain
//! check reach `None` in finite time.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::types::Task;

/// Interval between drain re-checks when a worker is parked on an empty queue
const DRAIN_RECHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Internal struct representing a task waiting in the priority heap
#[derive(Debug, Clone, Eq, PartialEq)]
struct QueuedTask {
    task: Task,
    /// Monotonic insertion sequence for FIFO tie-breaking within a band
    seq: u64,
}

// Implement Ord for BinaryHeap (max-heap by default)
impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed on both keys: the heap surfaces the lowest (priority, seq)
        // pair, i.e. the high band first and the oldest insertion within it.
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Concurrency-safe priority queue shared by the producer and all workers
pub struct TaskQueue {
    heap: Mutex<BinaryHeap<QueuedTask>>,
    /// Wakes parked dequeuers on enqueue, producer completion, and task completion
    items: Notify,
    /// Wakes parked enqueuers when a slot frees
    space: Notify,
    capacity: usize,
    producing: AtomicBool,
    in_flight: AtomicUsize,
    next_seq: AtomicU64,
}

impl TaskQueue {
    /// Create a queue accepting at most `capacity` pending tasks
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            items: Notify::new(),
            space: Notify::new(),
            capacity,
            producing: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Insert a task, blocking until the queue has room
    ///
    /// Safe to call concurrently with dequeues and other enqueues. Producers
    /// must tolerate this backpressure; the call never fails.
    pub async fn enqueue(&self, task: Task) {
        loop {
            let space = self.space.notified();
            {
                let mut heap = self.heap.lock().await;
                if heap.len() < self.capacity {
                    self.push_locked(&mut heap, task);
                    return;
                }
            }
            space.await;
        }
    }

    /// Re-insert a task from the retry path
    ///
    /// A requeued task reoccupies the slot its own dequeue freed, so this
    /// never waits for capacity — a worker blocked here while every other
    /// worker did the same would stall the queue for good.
    pub async fn requeue(&self, task: Task) {
        let mut heap = self.heap.lock().await;
        self.push_locked(&mut heap, task);
    }

    fn push_locked(&self, heap: &mut BinaryHeap<QueuedTask>, task: Task) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        heap.push(QueuedTask { task, seq });
        self.items.notify_one();
    }

    /// Remove and return the highest-priority, oldest-inserted pending task
    ///
    /// Blocks while the queue is empty but work may still arrive (the
    /// producer is running, or another worker holds an in-flight task that
    /// could retry). Returns `None` once the queue is permanently drained;
    /// the calling worker should then exit its consume loop.
    pub async fn dequeue(&self) -> Option<Task> {
        loop {
            let notified = self.items.notified();
            {
                let mut heap = self.heap.lock().await;
                if let Some(queued) = heap.pop() {
                    self.in_flight.fetch_add(1, Ordering::SeqCst);
                    drop(heap);
                    self.space.notify_one();
                    return Some(queued.task);
                }
                if !self.producing.load(Ordering::SeqCst)
                    && self.in_flight.load(Ordering::SeqCst) == 0
                {
                    drop(heap);
                    // Cascade the drain observation to the next parked worker.
                    self.items.notify_one();
                    return None;
                }
            }
            // Wait for an enqueue or a state change; the interval fallback
            // covers wake-ups lost to a racing direct pop.
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(DRAIN_RECHECK_INTERVAL) => {}
            }
        }
    }

    /// Signal that a dequeued task is fully finished
    ///
    /// Must be called exactly once per successful [`dequeue`](Self::dequeue),
    /// after any [`requeue`](Self::requeue) the task's outcome demanded.
    pub fn task_done(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.items.notify_waiters();
    }

    /// Signal that enumeration has finished; called exactly once by the producer
    pub fn mark_producing_done(&self) {
        self.producing.store(false, Ordering::SeqCst);
        self.items.notify_waiters();
    }

    /// Whether the producer is still enumerating
    pub fn is_producing(&self) -> bool {
        self.producing.load(Ordering::SeqCst)
    }

    /// Number of tasks currently waiting in the queue
    pub async fn pending_count(&self) -> usize {
        self.heap.lock().await.len()
    }

    /// Number of tasks currently held by workers
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
