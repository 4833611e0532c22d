//! Priority queue + visited-URL dedup + in-flight accounting.
//!
//! Priority-ordered pop, visited-set dedup at `put`, and an `unfinished`
//! counter covering both queued and in-flight items so callers can tell
//! when a crawl has genuinely drained. The blocking wait in `get` uses
//! `tokio::sync::Notify` rather than a polling loop.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::model::CrawlTask;

/// Wraps a `CrawlTask` with an insertion sequence so that equal-priority
/// tasks dequeue in FIFO order (ties broken by insertion order, per §3).
struct QueueEntry {
    task: CrawlTask,
    seq: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.task.priority == other.task.priority && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; priority is ascending (HIGH=1 dequeues
        // first) so we reverse the priority comparison, and reverse the
        // sequence comparison too (lower seq = earlier insertion = higher
        // heap priority among equal priorities).
        other
            .task
            .priority
            .cmp(&self.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub total_queued: u64,
    pub completed: u64,
    pub failed: u64,
    pub pending: u64,
    pub visited: u64,
}

struct Inner {
    heap: BinaryHeap<QueueEntry>,
    visited: HashSet<String>,
    unfinished: u64,
    completed: u64,
    failed: u64,
    total_queued: u64,
    next_seq: u64,
}

/// Ordered, deduplicated, bounded-wait delivery of `CrawlTask`s to
/// workers, plus accounting sufficient to detect run completion.
pub struct CrawlQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    /// Fast-path size check without taking the lock, for diagnostics only.
    approx_size: AtomicU64,
}

impl Default for CrawlQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                visited: HashSet::new(),
                unfinished: 0,
                completed: 0,
                failed: 0,
                total_queued: 0,
                next_seq: 0,
            }),
            notify: Notify::new(),
            approx_size: AtomicU64::new(0),
        }
    }

    /// Enqueue a task unless its URL was already seen this queue lifetime.
    /// Returns `false` without enqueueing on a duplicate.
    pub async fn put(&self, task: CrawlTask) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.visited.insert(task.url.clone()) {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(QueueEntry { task, seq });
        inner.unfinished += 1;
        inner.total_queued += 1;
        self.approx_size
            .store(inner.heap.len() as u64, AtomicOrdering::Relaxed);
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Blocking pop with a timeout. Returns the highest-priority task, or
    /// `None` if the timeout elapses with nothing available. Does not
    /// remove the URL from the visited set.
    pub async fn get(&self, timeout: Duration) -> Option<CrawlTask> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.heap.pop() {
                    self.approx_size
                        .store(inner.heap.len() as u64, AtomicOrdering::Relaxed);
                    return Some(entry.task);
                }
            }
            let notified = self.notify.notified();
            if tokio::time::timeout(timeout, notified).await.is_err() {
                return None;
            }
        }
    }

    /// Report the outcome of a previously-popped task.
    pub async fn task_done(&self, success: bool) {
        let mut inner = self.inner.lock().await;
        if success {
            inner.completed += 1;
        } else {
            inner.failed += 1;
        }
        inner.unfinished = inner.unfinished.saturating_sub(1);
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.heap.is_empty()
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    pub async fn unfinished(&self) -> u64 {
        self.inner.lock().await.unfinished
    }

    pub async fn get_stats(&self) -> QueueStats {
        let inner = self.inner.lock().await;
        QueueStats {
            total_queued: inner.total_queued,
            completed: inner.completed,
            failed: inner.failed,
            pending: inner.heap.len() as u64,
            visited: inner.visited.len() as u64,
        }
    }

    /// Drop queued items and reset the visited set and counters.
    /// In-flight items already owned by workers continue independently.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.heap.clear();
        inner.visited.clear();
        inner.unfinished = 0;
        inner.completed = 0;
        inner.failed = 0;
        inner.total_queued = 0;
        inner.next_seq = 0;
        self.approx_size.store(0, AtomicOrdering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;

    #[tokio::test]
    async fn put_rejects_duplicate_url() {
        let q = CrawlQueue::new();
        assert!(q.put(CrawlTask::seed("https://a.example/")).await);
        assert!(!q.put(CrawlTask::seed("https://a.example/")).await);
        assert_eq!(q.get_stats().await.total_queued, 1);
    }

    #[tokio::test]
    async fn get_returns_highest_priority_first() {
        let q = CrawlQueue::new();
        q.put(CrawlTask {
            url: "https://a.example/low".into(),
            depth: 1,
            priority: Priority::Low,
            referer: None,
        })
        .await;
        q.put(CrawlTask {
            url: "https://a.example/high".into(),
            depth: 1,
            priority: Priority::High,
            referer: None,
        })
        .await;
        let first = q.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(first.url, "https://a.example/high");
    }

    #[tokio::test]
    async fn get_times_out_on_empty_queue() {
        let q = CrawlQueue::new();
        assert!(q.get(Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn unfinished_tracks_queued_and_inflight() {
        let q = CrawlQueue::new();
        q.put(CrawlTask::seed("https://a.example/")).await;
        assert_eq!(q.unfinished().await, 1);
        let task = q.get(Duration::from_millis(50)).await.unwrap();
        assert_eq!(q.unfinished().await, 1);
        q.task_done(true).await;
        assert_eq!(q.unfinished().await, 0);
        let _ = task;
    }

    #[tokio::test]
    async fn clear_drops_queue_and_visited_set() {
        let q = CrawlQueue::new();
        q.put(CrawlTask::seed("https://a.example/")).await;
        q.clear().await;
        assert!(q.is_empty().await);
        assert!(q.put(CrawlTask::seed("https://a.example/")).await);
    }

    #[tokio::test]
    async fn total_queued_equals_completed_plus_failed_at_run_end() {
        let q = CrawlQueue::new();
        for i in 0..5 {
            q.put(CrawlTask::seed(format!("https://a.example/{i}")))
                .await;
        }
        for i in 0..5 {
            let _ = q.get(Duration::from_millis(50)).await;
            q.task_done(i % 2 == 0).await;
        }
        let stats = q.get_stats().await;
        assert_eq!(stats.total_queued, stats.completed + stats.failed);
        assert_eq!(q.unfinished().await, 0);
    }
}
