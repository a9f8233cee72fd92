//! The decoder worker pool.
//!
//! A fixed set of OS threads pulls jobs FIFO from the bounded queue. Each
//! worker owns exactly one decoder, created lazily on its first job and
//! reused afterwards: the vocoder carries per-call state that is reset by
//! reopening the capture, never shared. Shutdown is cooperative and drains
//! already-queued jobs.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use trunkdec_audio::convert::{self, AudioFormat};
use trunkdec_audio::metadata;
use trunkdec_codec::NullVocoder;
use trunkdec_crypto::KeyTable;
use trunkdec_decoder::{DecodeError, Decoder};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::hook;
use crate::jobs::{
    Job, JobIdGen, JobQueue, JobStatus, JobTracker, PoolStats, SharedJob, StatsSnapshot,
};

/// Everything the HTTP layer supplies for one upload.
pub struct JobSpec {
    /// Spooled upload path.
    pub input_path: std::path::PathBuf,
    /// Caller metadata text.
    pub metadata: Option<String>,
    /// Artifact path without extension.
    pub output_stem: std::path::PathBuf,
    /// Stream this upload belongs to.
    pub stream_name: String,
}

/// Fixed-size pool of decoder workers.
pub struct WorkerPool {
    config: Arc<ServiceConfig>,
    keys: Arc<KeyTable>,
    queue: Arc<JobQueue>,
    tracker: Arc<JobTracker>,
    stats: Arc<PoolStats>,
    ids: JobIdGen,
    shutdown: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Pool over the given configuration and key table; call
    /// [`WorkerPool::start`] to spawn the workers.
    #[must_use]
    pub fn new(config: Arc<ServiceConfig>, keys: Arc<KeyTable>) -> WorkerPool {
        let retention = config.job_retention_secs.map(Duration::from_secs);

        WorkerPool {
            queue: Arc::new(JobQueue::new(config.max_queue_size)),
            tracker: Arc::new(JobTracker::new(retention)),
            stats: Arc::new(PoolStats::default()),
            ids: JobIdGen::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
            config,
            keys,
        }
    }

    /// Spawn the worker threads. Idempotent.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            return;
        }

        self.shutdown.store(false, Ordering::Release);

        for index in 0..self.config.max_workers {
            let queue = Arc::clone(&self.queue);
            let stats = Arc::clone(&self.stats);
            let shutdown = Arc::clone(&self.shutdown);
            let config = Arc::clone(&self.config);
            let keys = Arc::clone(&self.keys);

            handles.push(
                thread::Builder::new()
                    .name(format!("decode-worker-{index}"))
                    .spawn(move || worker_main(&queue, &stats, &shutdown, &config, &keys))
                    .expect("spawn worker thread"),
            );
        }

        info!(workers = self.config.max_workers, "worker pool started");
    }

    /// Signal shutdown, wake waiting workers, and join them. Queued jobs
    /// drain first; no new dequeues occur after the joined workers exit.
    pub fn stop(&self) {
        let mut handles = self.handles.lock();
        if handles.is_empty() {
            return;
        }

        self.shutdown.store(true, Ordering::Release);
        self.queue.wake_all();

        for handle in handles.drain(..) {
            let _ = handle.join();
        }

        info!("worker pool stopped");
    }

    /// Accept an upload: track it and enqueue it.
    ///
    /// On a full queue the job is untracked again, the spooled upload is
    /// removed, and [`ServiceError::QueueFull`] is returned.
    pub fn submit(&self, spec: JobSpec) -> Result<String, ServiceError> {
        let id = self.ids.next_id();
        let job = Arc::new(Mutex::new(Job {
            id: id.clone(),
            input_path: spec.input_path.clone(),
            metadata: spec.metadata,
            output_stem: spec.output_stem,
            stream_name: spec.stream_name,
            audio_format: self.config.audio_format.clone(),
            audio_bitrate_kbps: self.config.audio_bitrate_kbps,
            status: JobStatus::Queued,
            received_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }));

        self.tracker.insert(Arc::clone(&job));

        if let Err(e) = self.queue.enqueue(job) {
            self.tracker.remove(&id);
            remove_temp_file(&spec.input_path);
            return Err(e);
        }

        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        debug!(job_id = %id, "job queued");
        Ok(id)
    }

    /// Copy of a job's current state.
    #[must_use]
    pub fn job_snapshot(&self, id: &str) -> Option<Job> {
        self.tracker.snapshot(id)
    }

    /// Point-in-time pool statistics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.queue.len())
    }

    /// Queue capacity from the configuration.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_main(
    queue: &JobQueue,
    stats: &PoolStats,
    shutdown: &AtomicBool,
    config: &ServiceConfig,
    keys: &KeyTable,
) {
    // The decoder (and its vocoder state) is created on first use and
    // lives as long as the worker.
    let mut decoder: Option<Decoder> = None;

    while let Some(job) = queue.dequeue(shutdown) {
        let started = Instant::now();
        let (id, stream) = {
            let mut job = job.lock();
            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            (job.id.clone(), job.stream_name.clone())
        };

        stats.active.fetch_add(1, Ordering::Relaxed);
        debug!(job_id = %id, stream = %stream, "job started");

        let decoder = decoder.get_or_insert_with(|| {
            let mut d = Decoder::new(Box::new(NullVocoder));
            d.load_keys(keys);
            d
        });

        let outcome = process_job(decoder, &job, config);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        stats.processing_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        stats.active.fetch_sub(1, Ordering::Relaxed);

        let mut job = job.lock();
        remove_temp_file(&job.input_path);
        job.completed_at = Some(Utc::now());
        match outcome {
            Ok(()) => {
                job.status = JobStatus::Completed;
                stats.completed.fetch_add(1, Ordering::Relaxed);
                info!(job_id = %job.id, elapsed_ms, "job completed");
            }
            Err(reason) => {
                job.status = JobStatus::Failed;
                job.error = Some(reason.clone());
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = %job.id, elapsed_ms, reason = %reason, "job failed");
            }
        }
    }
}

/// Decode one job and emit its artifacts. Returns the failure reason on
/// error.
fn process_job(decoder: &mut Decoder, job: &SharedJob, config: &ServiceConfig) -> Result<(), String> {
    let (input, stem, metadata, format, bitrate, timeout) = {
        let job = job.lock();
        (
            job.input_path.clone(),
            job.output_stem.clone(),
            job.metadata.clone(),
            job.audio_format.clone(),
            job.audio_bitrate_kbps,
            Duration::from_secs(config.job_timeout_secs),
        )
    };

    let format: AudioFormat = format
        .parse()
        .map_err(|_| format!("unsupported audio format \"{format}\""))?;

    if let Some(parent) = stem.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("create output directory: {e}"))?;
    }

    let wav_path = stem.with_extension("wav");
    let deadline = Instant::now() + timeout;

    let summary = decoder
        .decode_file(&input, Some(&wav_path), Some(deadline))
        .map_err(|e| match e {
            DecodeError::Timeout => "timeout".to_string(),
            other => other.to_string(),
        })?;

    let basename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sidecar = metadata::merge_sidecar(metadata.as_deref(), &summary.metadata, &basename);
    let json_path = stem.with_extension("json");
    fs::write(&json_path, sidecar).map_err(|e| format!("write metadata sidecar: {e}"))?;

    if let Err(e) = convert::convert(&wav_path, format, bitrate) {
        // Converted output is best-effort; the decoded artifacts stand.
        warn!(error = %e, "media conversion failed, keeping WAV");
    }

    if let Some(script) = &config.hook_script {
        hook::run(script, &wav_path, &json_path);
    }

    Ok(())
}

fn remove_temp_file(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "temp file cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trunkdec_testkit::{sample_params, CaptureBuilder};

    fn pool_with(config: ServiceConfig) -> WorkerPool {
        WorkerPool::new(Arc::new(config), Arc::new(KeyTable::new()))
    }

    fn spool_capture(dir: &std::path::Path) -> std::path::PathBuf {
        let mut builder = CaptureBuilder::new(0x293);
        builder.header().ldu1(&sample_params()).terminator();
        let path = dir.join("upload.p25");
        builder.write_to(&path).unwrap();
        path
    }

    fn wait_terminal(pool: &WorkerPool, id: &str) -> Job {
        for _ in 0..200 {
            let job = pool.job_snapshot(id).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job {id} never finished");
    }

    #[test]
    fn job_runs_to_completion_with_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_with(ServiceConfig {
            max_workers: 1,
            output_dir: dir.path().to_path_buf(),
            ..ServiceConfig::default()
        });
        pool.start();

        let input = spool_capture(dir.path());
        let stem = dir.path().join("out").join("call");
        let id = pool
            .submit(JobSpec {
                input_path: input.clone(),
                metadata: Some("{\"short_name\": \"SYS1\"}".to_string()),
                output_stem: stem.clone(),
                stream_name: "default".to_string(),
            })
            .unwrap();

        let job = wait_terminal(&pool, &id);
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());
        assert!(stem.with_extension("wav").exists());
        assert!(stem.with_extension("json").exists());
        assert!(!input.exists(), "temp upload must be removed");

        let sidecar = fs::read_to_string(stem.with_extension("json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(v["short_name"], "SYS1");
        assert_eq!(v["voice_frames"], 1);

        let stats = pool.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);
        pool.stop();
    }

    #[test]
    fn unsupported_format_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_with(ServiceConfig {
            max_workers: 1,
            audio_format: "webm".to_string(),
            ..ServiceConfig::default()
        });
        pool.start();

        let input = spool_capture(dir.path());
        let id = pool
            .submit(JobSpec {
                input_path: input,
                metadata: None,
                output_stem: dir.path().join("call"),
                stream_name: "default".to_string(),
            })
            .unwrap();

        let job = wait_terminal(&pool, &id);
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("unsupported audio format"));
        pool.stop();
    }

    #[test]
    fn queue_full_removes_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // No workers started: the queue never drains.
        let pool = pool_with(ServiceConfig {
            max_queue_size: 1,
            ..ServiceConfig::default()
        });

        let first = spool_capture(dir.path());
        pool.submit(JobSpec {
            input_path: first,
            metadata: None,
            output_stem: dir.path().join("a"),
            stream_name: "default".to_string(),
        })
        .unwrap();

        let second = dir.path().join("second.p25");
        fs::write(&second, b"x").unwrap();
        let err = pool
            .submit(JobSpec {
                input_path: second.clone(),
                metadata: None,
                output_stem: dir.path().join("b"),
                stream_name: "default".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, ServiceError::QueueFull));
        assert!(!second.exists(), "rejected upload must be removed");
    }

    #[test]
    fn shutdown_drains_queued_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool_with(ServiceConfig {
            max_workers: 2,
            ..ServiceConfig::default()
        });

        let mut ids = Vec::new();
        for i in 0..3 {
            let input = dir.path().join(format!("u{i}.p25"));
            let mut builder = CaptureBuilder::new(0x293);
            builder.ldu1(&sample_params());
            builder.write_to(&input).unwrap();

            ids.push(
                pool.submit(JobSpec {
                    input_path: input,
                    metadata: None,
                    output_stem: dir.path().join(format!("o{i}")),
                    stream_name: "default".to_string(),
                })
                .unwrap(),
            );
        }

        pool.start();
        pool.stop();

        for id in ids {
            let job = pool.job_snapshot(&id).unwrap();
            assert!(job.status.is_terminal(), "job {id} must have drained");
        }
    }
}
