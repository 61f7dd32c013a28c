pub mod video;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::video::{GenerationMode, GenerationRequest, ProducedVideo, VideoGenerationJob};

/// Finished jobs kept before the oldest are evicted and their assets revoked.
pub const DEFAULT_FINISHED_LIMIT: usize = 20;

/// Callback invoked with the final snapshot when a job finishes.
pub type OnCompleteCallback = Arc<dyn Fn(JobSnapshot) + Send + Sync>;

/// In-memory job table. The lock is only taken for short reads and writes,
/// never across an await.
pub type SharedJobs = Arc<Mutex<HashMap<String, JobRecord>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug)]
pub struct JobRecord {
    pub id: String,
    pub mode: GenerationMode,
    pub status: JobStatus,
    pub output: Option<ProducedVideo>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    cancel: CancellationToken,
}

impl JobRecord {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            mode: self.mode,
            status: self.status,
            video_uri: self
                .output
                .as_ref()
                .map(|v| v.provider_handle.as_str().to_string()),
            asset_handle: self.output.as_ref().map(|v| v.asset.handle().to_string()),
            asset_path: self
                .output
                .as_ref()
                .map(|v| v.asset.path().to_string_lossy().to_string()),
            size_bytes: self.output.as_ref().map(|v| v.asset.size()),
            error: self.error.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

/// Read-only view of a job for callers outside the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: String,
    pub mode: GenerationMode,
    pub status: JobStatus,
    /// Provider handle; pass back as `video_uri` to extend the video.
    pub video_uri: Option<String>,
    pub asset_handle: Option<String>,
    pub asset_path: Option<String>,
    pub size_bytes: Option<u64>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// JobQueue: owns the job table + generation runner, spawns async work
// ---------------------------------------------------------------------------

pub struct JobQueue {
    jobs: SharedJobs,
    runner: Arc<VideoGenerationJob>,
    on_complete: Option<OnCompleteCallback>,
    finished_limit: usize,
}

impl JobQueue {
    pub fn new(runner: VideoGenerationJob) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            runner: Arc::new(runner),
            on_complete: None,
            finished_limit: DEFAULT_FINISHED_LIMIT,
        }
    }

    /// Cap on finished jobs kept in the table. At least one is always kept so
    /// a caller can read the outcome of the job that just ended.
    pub fn with_finished_limit(mut self, limit: usize) -> Self {
        self.finished_limit = limit.max(1);
        self
    }

    /// Register a callback for job completion.
    pub fn set_on_complete(&mut self, cb: OnCompleteCallback) {
        self.on_complete = Some(cb);
    }

    /// Submit a video generation job. Returns the job ID immediately.
    ///
    /// Configuration errors are reported here, before a job is created.
    pub fn submit_video(&self, request: GenerationRequest) -> Result<String> {
        request.validate(self.runner.options().reference_policy)?;

        let now = Utc::now();
        let cancel = CancellationToken::new();
        let record = JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            mode: request.mode(),
            status: JobStatus::Pending,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            cancel: cancel.clone(),
        };
        let job_id = record.id.clone();
        {
            let mut jobs = lock(&self.jobs)?;
            jobs.insert(job_id.clone(), record);
        }

        info!(job_id = %job_id, mode = %request.mode(), "video job submitted");
        self.spawn_video(job_id.clone(), request, cancel);
        Ok(job_id)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>> {
        let jobs = lock(&self.jobs)?;
        Ok(jobs.get(job_id).map(JobRecord::snapshot))
    }

    pub fn list_jobs(&self) -> Result<Vec<JobSnapshot>> {
        let jobs = lock(&self.jobs)?;
        let mut all: Vec<_> = jobs.values().map(JobRecord::snapshot).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    /// Request cancellation. Returns false if the job is unknown or already finished.
    pub fn cancel_job(&self, job_id: &str) -> Result<bool> {
        let jobs = lock(&self.jobs)?;
        match jobs.get(job_id) {
            Some(job) if !job.status.is_terminal() => {
                job.cancel.cancel();
                info!(job_id = %job_id, "video job cancellation requested");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Forget a finished job, revoking its local asset.
    pub async fn remove_job(&self, job_id: &str) -> Result<bool> {
        let removed = {
            let mut jobs = lock(&self.jobs)?;
            let terminal = jobs
                .get(job_id)
                .map_or(false, |job| job.status.is_terminal());
            if terminal {
                jobs.remove(job_id)
            } else {
                None
            }
        };
        match removed {
            Some(record) => {
                info!(job_id = %job_id, "video job removed");
                release(record).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn spawn_video(&self, job_id: String, request: GenerationRequest, cancel: CancellationToken) {
        let jobs = Arc::clone(&self.jobs);
        let runner = Arc::clone(&self.runner);
        let on_complete = self.on_complete.clone();
        let finished_limit = self.finished_limit;

        tokio::spawn(async move {
            video::run_video_task(&jobs, &runner, &job_id, &request, &cancel).await;
            let updated = jobs
                .lock()
                .ok()
                .and_then(|g| g.get(&job_id).map(JobRecord::snapshot));

            for record in take_evicted(&jobs, finished_limit) {
                info!(job_id = %record.id, "evicting finished video job");
                release(record).await;
            }

            if let (Some(updated), Some(cb)) = (updated, on_complete.as_ref()) {
                cb(updated);
            }
        });
    }
}

/// Pull the oldest finished jobs out of the table once more than `limit` are kept.
fn take_evicted(jobs: &SharedJobs, limit: usize) -> Vec<JobRecord> {
    let mut guard = match jobs.lock() {
        Ok(guard) => guard,
        Err(e) => {
            error!("job table lock poisoned: {e}");
            return Vec::new();
        }
    };

    let mut finished: Vec<(DateTime<Utc>, String)> = guard
        .values()
        .filter(|job| job.status.is_terminal())
        .map(|job| (job.updated_at, job.id.clone()))
        .collect();
    if finished.len() <= limit {
        return Vec::new();
    }
    finished.sort();

    let excess = finished.len() - limit;
    finished
        .into_iter()
        .take(excess)
        .filter_map(|(_, id)| guard.remove(&id))
        .collect()
}

async fn release(record: JobRecord) {
    if let Some(video) = record.output {
        video.asset.revoke().await;
    }
}

fn lock(jobs: &SharedJobs) -> Result<std::sync::MutexGuard<'_, HashMap<String, JobRecord>>> {
    jobs.lock().map_err(|e| anyhow!("job table lock poisoned: {e}"))
}
