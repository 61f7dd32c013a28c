use std::time::Duration;

use crate::gemini::ApiError;

/// Why a video generation did not produce a playable asset.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The request is incomplete for its mode. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Provider(#[from] ApiError),
    #[error("operation finished without producing a video")]
    NoVideoProduced,
    #[error("failed to fetch generated video: HTTP {status}")]
    AssetFetchFailed { status: u16 },
    #[error("video generation timed out after {}s (operation: {operation})", .waited.as_secs())]
    Timeout { operation: String, waited: Duration },
    #[error("video generation cancelled")]
    Cancelled,
    #[error("{supplied} reference images supplied, at most {max} allowed")]
    TooManyReferenceImages { supplied: usize, max: usize },
    #[error("failed to store generated video: {0}")]
    Asset(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("assistant returned an empty response")]
    EmptyResponse,
    #[error(transparent)]
    Provider(#[from] ApiError),
}
