use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::{sleep, timeout_at, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{GenerationRequest, LocalAsset, ReferencePolicy, VideoHandle};
use crate::error::GenerationError;
use crate::gemini::types::Operation;
use crate::gemini::{ApiError, GeminiClient};

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_WAIT: Duration = Duration::from_secs(20 * 60); // 20 minutes

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub poll_interval: Duration,
    /// Upper bound on one run, from submission through download.
    pub max_wait: Duration,
    pub reference_policy: ReferencePolicy,
    /// Where downloaded videos are written.
    pub assets_dir: PathBuf,
}

impl JobOptions {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_wait: MAX_WAIT,
            reference_policy: ReferencePolicy::default(),
            assets_dir: assets_dir.into(),
        }
    }
}

/// A finished generation: the provider's handle plus the downloaded file.
#[derive(Debug)]
pub struct ProducedVideo {
    /// Reusable as the input of an extend request.
    pub provider_handle: VideoHandle,
    pub asset: LocalAsset,
}

pub struct VideoGenerationJob {
    client: Arc<GeminiClient>,
    options: JobOptions,
}

impl VideoGenerationJob {
    pub fn new(client: Arc<GeminiClient>, options: JobOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Submit, poll until done, download. Runs until completion, failure or
    /// `max_wait`, which bounds the whole run including in-flight requests.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<ProducedVideo, GenerationError> {
        self.submit_with_cancel(request, &CancellationToken::new())
            .await
    }

    pub async fn submit_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<ProducedVideo, GenerationError> {
        // Step 1: Project the request; configuration errors surface here, offline.
        let body = request.to_provider_request(self.options.reference_policy)?;
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let budget = Budget::new(cancel, self.options.max_wait);

        // Step 2: Create the long-running operation
        let model = request.model();
        info!(mode = %request.mode(), model = model.id(), "submitting video generation");
        let operation = budget
            .race(model.id(), self.client.generate_videos(model.id(), &body))
            .await??;
        info!(operation = %operation.name, "video operation created");

        // Step 3: Poll, then download
        let operation = self.poll_until_done(operation, &budget).await?;
        self.collect(&operation, &budget).await
    }

    /// Continue from an existing operation: poll if needed, then download the
    /// result. Never submits a new job.
    pub async fn resume(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<ProducedVideo, GenerationError> {
        let budget = Budget::new(cancel, self.options.max_wait);
        let operation = self.poll_until_done(operation, &budget).await?;
        self.collect(&operation, &budget).await
    }

    /// Poll at the fixed interval until `done`. An already-done operation is
    /// returned as is without touching the network.
    pub async fn wait_for_completion(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
    ) -> Result<Operation, GenerationError> {
        let budget = Budget::new(cancel, self.options.max_wait);
        self.poll_until_done(operation, &budget).await
    }

    async fn poll_until_done(
        &self,
        mut operation: Operation,
        budget: &Budget<'_>,
    ) -> Result<Operation, GenerationError> {
        while !operation.done {
            let remaining = budget.remaining();
            if remaining.is_zero() {
                warn!(operation = %operation.name, "video operation timed out");
                return Err(budget.timeout(&operation.name));
            }

            budget
                .race(&operation.name, sleep(self.options.poll_interval.min(remaining)))
                .await?;
            operation = budget
                .race(&operation.name, self.client.get_operation(&operation.name))
                .await??;
            info!(operation = %operation.name, done = operation.done, "polled video operation");
        }

        Ok(operation)
    }

    /// Turn a finished operation into a local asset.
    async fn collect(
        &self,
        operation: &Operation,
        budget: &Budget<'_>,
    ) -> Result<ProducedVideo, GenerationError> {
        if let Some(err) = &operation.error {
            return Err(ApiError::Operation {
                name: operation.name.clone(),
                code: err.code,
                message: err
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            }
            .into());
        }

        let uri = operation
            .video_uris()
            .first()
            .map(|s| s.to_string())
            .ok_or(GenerationError::NoVideoProduced)?;

        let bytes = match budget
            .race(&operation.name, self.client.fetch_asset(&uri))
            .await?
        {
            Ok(bytes) => bytes,
            Err(ApiError::Status { status, .. }) => {
                return Err(GenerationError::AssetFetchFailed {
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let asset = LocalAsset::write(&self.options.assets_dir, &bytes)
            .await
            .map_err(GenerationError::Asset)?;
        info!(operation = %operation.name, handle = %asset.handle(), size = asset.size(), "video downloaded");

        Ok(ProducedVideo {
            provider_handle: VideoHandle::new(uri),
            asset,
        })
    }
}

/// Cancellation plus one deadline shared by every provider call of a run.
struct Budget<'a> {
    cancel: &'a CancellationToken,
    started: Instant,
    deadline: Instant,
}

impl<'a> Budget<'a> {
    fn new(cancel: &'a CancellationToken, max_wait: Duration) -> Self {
        let started = Instant::now();
        Self {
            cancel,
            started,
            deadline: started + max_wait,
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn timeout(&self, operation: &str) -> GenerationError {
        GenerationError::Timeout {
            operation: operation.to_string(),
            waited: self.started.elapsed(),
        }
    }

    /// Drive `fut` unless the token fires or the deadline passes first.
    /// Dropping `fut` aborts any request it has in flight.
    async fn race<F: Future>(&self, operation: &str, fut: F) -> Result<F::Output, GenerationError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!(operation = %operation, "video operation cancelled");
                Err(GenerationError::Cancelled)
            }
            res = timeout_at(self.deadline, fut) => match res {
                Ok(output) => Ok(output),
                Err(_) => {
                    warn!(operation = %operation, "video operation timed out");
                    Err(self.timeout(operation))
                }
            },
        }
    }
}
