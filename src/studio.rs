//! Headless UI state: active view, video job lifecycle and chat transcript.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::chat::{ChatQuery, ChatTurn};
use crate::error::{ChatError, GenerationError};
use crate::video::{GenerationRequest, ProducedVideo, Resolution, VeoModel, VideoGenerationJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Home,
    Catalog,
    VideoStudio,
    Assistant,
}

#[derive(Debug, Default)]
pub enum JobState {
    #[default]
    Idle,
    Loading,
    Success(ProducedVideo),
    Error(String),
}

impl JobState {
    pub fn video(&self) -> Option<&ProducedVideo> {
        match self {
            JobState::Success(video) => Some(video),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, JobState::Loading)
    }
}

#[derive(Debug, Default)]
pub struct StudioState {
    view: View,
    video: JobState,
    transcript: Vec<ChatTurn>,
    chat_error: Option<String>,
}

impl StudioState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn navigate(&mut self, view: View) {
        self.view = view;
    }

    pub fn video_state(&self) -> &JobState {
        &self.video
    }

    /// Run a generation and record the outcome. The previously shown video,
    /// if any, is revoked as soon as the new job starts.
    pub async fn generate(&mut self, job: &VideoGenerationJob, request: GenerationRequest) -> &JobState {
        self.release_video().await;
        if !request.is_submittable() {
            self.video = JobState::Error(
                GenerationError::Configuration(format!(
                    "{} request is missing required inputs",
                    request.mode()
                ))
                .to_string(),
            );
            return &self.video;
        }

        self.video = JobState::Loading;
        self.video = match job.submit(&request).await {
            Ok(video) => {
                info!(handle = %video.asset.handle(), "showing generated video");
                JobState::Success(video)
            }
            Err(e) => {
                warn!("video generation failed: {e}");
                JobState::Error(e.to_string())
            }
        };
        &self.video
    }

    /// Build an extend request continuing the video currently shown.
    pub fn extension_request(&self, prompt: impl Into<String>, resolution: Resolution) -> GenerationRequest {
        GenerationRequest::ExtendVideo {
            prompt: prompt.into(),
            model: VeoModel::default(),
            resolution,
            input_video: self.video.video().map(|v| v.provider_handle.clone()),
        }
    }

    /// Back to idle, revoking the shown video.
    pub async fn reset_video(&mut self) {
        self.release_video().await;
    }

    async fn release_video(&mut self) {
        if let JobState::Success(video) = std::mem::take(&mut self.video) {
            video.asset.revoke().await;
        }
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn chat_error(&self) -> Option<&str> {
        self.chat_error.as_deref()
    }

    /// Append the user's message, ask the assistant, append the reply.
    /// Blank input is ignored.
    pub async fn send_message(&mut self, chat: &ChatQuery, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        self.chat_error = None;
        let history_len = self.transcript.len();
        self.transcript.push(ChatTurn::user(text));

        match chat.ask_with_history(&self.transcript[..history_len], text).await {
            Ok(reply) => {
                self.transcript.push(ChatTurn::assistant(reply));
                Ok(())
            }
            Err(e) => {
                warn!("chat request failed: {e}");
                self.chat_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
