use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{JobRecord, JobStatus, SharedJobs};
use crate::error::GenerationError;
use crate::video::{GenerationRequest, VideoGenerationJob};

/// Execute one queued job and record its outcome in the job table.
pub async fn run_video_task(
    jobs: &SharedJobs,
    runner: &VideoGenerationJob,
    job_id: &str,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) {
    update(jobs, job_id, |job| job.status = JobStatus::Running);

    match runner.submit_with_cancel(request, cancel).await {
        Ok(video) => {
            info!(job_id = %job_id, video = %video.provider_handle, "video job completed");
            update(jobs, job_id, |job| {
                job.status = JobStatus::Done;
                job.output = Some(video);
            });
        }
        Err(GenerationError::Cancelled) => {
            info!(job_id = %job_id, "video job cancelled");
            update(jobs, job_id, |job| {
                job.status = JobStatus::Cancelled;
                job.error = Some(GenerationError::Cancelled.to_string());
            });
        }
        Err(e) => {
            error!(job_id = %job_id, "video job failed: {e:#}");
            update(jobs, job_id, |job| {
                job.status = JobStatus::Failed;
                job.error = Some(format!("{e:#}"));
            });
        }
    }
}

fn update(jobs: &SharedJobs, job_id: &str, f: impl FnOnce(&mut JobRecord)) {
    match jobs.lock() {
        Ok(mut guard) => {
            if let Some(job) = guard.get_mut(job_id) {
                f(job);
                job.updated_at = Utc::now();
            }
        }
        Err(e) => error!(job_id = %job_id, "job table lock poisoned, status not recorded: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn poisoned_job_table_is_reported() {
        let jobs: SharedJobs = Arc::new(Mutex::new(HashMap::new()));
        let holder = Arc::clone(&jobs);
        let _ = std::thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("worker died holding the job table");
        })
        .join();
        assert!(jobs.is_poisoned());

        update(&jobs, "job-1", |job| job.status = JobStatus::Running);
        assert!(logs_contain("lock poisoned, status not recorded"));
    }
}
