//! Jobs, the bounded queue, the tracker, and pool statistics.
//!
//! One condition variable gates the queue: workers wait until it is
//! non-empty or shutdown is signaled. Enqueue never blocks; at capacity it
//! fails immediately so the HTTP layer can answer 503. Job status moves
//! monotonically Queued → Processing → {Completed, Failed}.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use rand::Rng;
use serde::Serialize;

use crate::error::ServiceError;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for a worker.
    Queued,
    /// A worker is decoding it.
    Processing,
    /// Finished with artifacts on disk.
    Completed,
    /// Finished with an error reason.
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One capture to decode and its artifact destinations.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique identifier handed back to the client.
    pub id: String,
    /// Spooled upload to decode; removed when the job reaches a terminal
    /// state.
    pub input_path: PathBuf,
    /// Caller-supplied metadata text, preserved verbatim.
    pub metadata: Option<String>,
    /// Artifact path without extension.
    pub output_stem: PathBuf,
    /// Stream this upload belongs to.
    pub stream_name: String,
    /// Requested audio output format.
    pub audio_format: String,
    /// Bitrate for converted formats; 0 selects the format default.
    pub audio_bitrate_kbps: u32,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// When the upload was accepted.
    pub received_at: DateTime<Utc>,
    /// Set when a worker picks the job up.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the job reaches a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure reason, set iff status is `Failed`.
    pub error: Option<String>,
}

/// A job shared between the queue, tracker, and its worker.
pub type SharedJob = Arc<Mutex<Job>>;

/// Collision-free job identifier generator: a per-process random prefix
/// plus a receive counter.
pub struct JobIdGen {
    prefix: u32,
    counter: AtomicU64,
}

impl JobIdGen {
    /// Generator with a fresh random prefix.
    #[must_use]
    pub fn new() -> JobIdGen {
        JobIdGen {
            prefix: rand::thread_rng().gen(),
            counter: AtomicU64::new(0),
        }
    }

    /// Next identifier.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}-{n}", self.prefix)
    }
}

impl Default for JobIdGen {
    fn default() -> Self {
        JobIdGen::new()
    }
}

/// Bounded FIFO queue gated by one condition variable.
pub struct JobQueue {
    inner: Mutex<VecDeque<SharedJob>>,
    available: Condvar,
    capacity: usize,
}

impl JobQueue {
    /// Queue holding at most `capacity` jobs.
    #[must_use]
    pub fn new(capacity: usize) -> JobQueue {
        JobQueue {
            inner: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Append a job, failing immediately at capacity.
    pub fn enqueue(&self, job: SharedJob) -> Result<(), ServiceError> {
        {
            let mut queue = self.inner.lock();
            if queue.len() >= self.capacity {
                return Err(ServiceError::QueueFull);
            }
            queue.push_back(job);
        }

        self.available.notify_one();
        Ok(())
    }

    /// Wait for a job. Returns `None` once shutdown is signaled and the
    /// queue has drained.
    pub fn dequeue(&self, shutdown: &AtomicBool) -> Option<SharedJob> {
        let mut queue = self.inner.lock();

        loop {
            if let Some(job) = queue.pop_front() {
                return Some(job);
            }
            if shutdown.load(Ordering::Acquire) {
                return None;
            }
            self.available.wait(&mut queue);
        }
    }

    /// Wake every waiting worker, used at shutdown.
    pub fn wake_all(&self) {
        self.available.notify_all();
    }

    /// Jobs currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Job-ID to snapshot table for status lookups.
///
/// Terminal jobs are retained until shutdown by default; with a retention
/// period configured they are purged lazily on access.
pub struct JobTracker {
    jobs: Mutex<HashMap<String, SharedJob>>,
    retention: Option<Duration>,
}

impl JobTracker {
    /// Tracker with the given retention policy.
    #[must_use]
    pub fn new(retention: Option<Duration>) -> JobTracker {
        JobTracker {
            jobs: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Track a job.
    pub fn insert(&self, job: SharedJob) {
        let id = job.lock().id.clone();
        let mut jobs = self.jobs.lock();
        self.purge_expired(&mut jobs);
        jobs.insert(id, job);
    }

    /// Copy of a job's current state.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        self.purge_expired(&mut jobs);
        jobs.get(id).map(|job| job.lock().clone())
    }

    /// Stop tracking a job.
    pub fn remove(&self, id: &str) {
        self.jobs.lock().remove(id);
    }

    /// Tracked job count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether any jobs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self, jobs: &mut HashMap<String, SharedJob>) {
        let Some(retention) = self.retention else {
            return;
        };
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return;
        };

        let now = Utc::now();
        jobs.retain(|_, job| {
            let job = job.lock();
            match (job.status.is_terminal(), job.completed_at) {
                (true, Some(done)) => now - done < retention,
                _ => true,
            }
        });
    }
}

/// Monotone pool counters.
#[derive(Default)]
pub struct PoolStats {
    /// Jobs accepted into the queue.
    pub queued: AtomicU64,
    /// Jobs finished successfully.
    pub completed: AtomicU64,
    /// Jobs finished with an error.
    pub failed: AtomicU64,
    /// Workers currently processing.
    pub active: AtomicU64,
    /// Total processing time of finished jobs, for the mean.
    pub processing_ms: AtomicU64,
}

impl PoolStats {
    /// Point-in-time statistics view.
    #[must_use]
    pub fn snapshot(&self, queue_depth: usize) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let finished = completed + failed;
        let avg = if finished == 0 {
            0.0
        } else {
            self.processing_ms.load(Ordering::Relaxed) as f64 / finished as f64
        };

        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            completed,
            failed,
            active_workers: self.active.load(Ordering::Relaxed),
            queue_depth,
            avg_processing_ms: avg,
        }
    }
}

/// Statistics reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Jobs accepted into the queue since start.
    pub queued: u64,
    /// Jobs finished successfully.
    pub completed: u64,
    /// Jobs finished with an error.
    pub failed: u64,
    /// Workers currently processing.
    pub active_workers: u64,
    /// Jobs waiting right now.
    pub queue_depth: usize,
    /// Simple mean processing time of finished jobs.
    pub avg_processing_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> SharedJob {
        Arc::new(Mutex::new(Job {
            id: id.to_string(),
            input_path: PathBuf::from("/tmp/x.p25"),
            metadata: None,
            output_stem: PathBuf::from("/tmp/x"),
            stream_name: "default".to_string(),
            audio_format: "wav".to_string(),
            audio_bitrate_kbps: 0,
            status: JobStatus::Queued,
            received_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }))
    }

    #[test]
    fn queue_rejects_beyond_capacity() {
        let queue = JobQueue::new(2);
        queue.enqueue(job("a")).unwrap();
        queue.enqueue(job("b")).unwrap();
        assert!(matches!(
            queue.enqueue(job("c")),
            Err(ServiceError::QueueFull)
        ));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn dequeue_after_full_makes_room_for_exactly_one() {
        let queue = JobQueue::new(1);
        let shutdown = AtomicBool::new(false);

        queue.enqueue(job("a")).unwrap();
        assert!(queue.enqueue(job("b")).is_err());

        let got = queue.dequeue(&shutdown).unwrap();
        assert_eq!(got.lock().id, "a");

        queue.enqueue(job("b")).unwrap();
        assert!(queue.enqueue(job("c")).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dequeue_is_fifo() {
        let queue = JobQueue::new(8);
        let shutdown = AtomicBool::new(false);

        for id in ["1", "2", "3"] {
            queue.enqueue(job(id)).unwrap();
        }
        for id in ["1", "2", "3"] {
            assert_eq!(queue.dequeue(&shutdown).unwrap().lock().id, id);
        }
    }

    #[test]
    fn shutdown_drains_then_returns_none() {
        let queue = JobQueue::new(8);
        let shutdown = AtomicBool::new(true);

        queue.enqueue(job("left-over")).unwrap();
        assert!(queue.dequeue(&shutdown).is_some());
        assert!(queue.dequeue(&shutdown).is_none());
    }

    #[test]
    fn ids_do_not_collide() {
        let ids = JobIdGen::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }

    #[test]
    fn tracker_snapshot_reflects_updates() {
        let tracker = JobTracker::new(None);
        let shared = job("j1");
        tracker.insert(shared.clone());

        assert_eq!(tracker.snapshot("j1").unwrap().status, JobStatus::Queued);

        {
            let mut job = shared.lock();
            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
        }
        assert_eq!(
            tracker.snapshot("j1").unwrap().status,
            JobStatus::Processing
        );
        assert!(tracker.snapshot("nope").is_none());
    }

    #[test]
    fn retention_purges_terminal_jobs() {
        let tracker = JobTracker::new(Some(Duration::from_secs(0)));
        let shared = job("old");
        {
            let mut job = shared.lock();
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now() - chrono::Duration::seconds(10));
        }
        tracker.insert(shared);

        assert!(tracker.snapshot("old").is_none());
    }

    #[test]
    fn status_ordering_is_monotone() {
        assert!(JobStatus::Queued < JobStatus::Processing);
        assert!(JobStatus::Processing < JobStatus::Completed);
        assert!(!JobStatus::Queued.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
