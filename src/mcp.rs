use anyhow::Context;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::catalog::{self, Category};
use crate::chat::{ChatQuery, ChatTurn};
use crate::error::ChatError;
use crate::tasks::JobQueue;
use crate::video::{
    AspectRatio, GenerationMode, GenerationRequest, ImagePayload, Resolution, VeoModel,
    VideoHandle,
};

// ---------------------------------------------------------------------------
// Tool parameter schemas (derive JsonSchema for rmcp auto-schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateVideoParams {
    /// Generation mode: "text_to_video", "frames_to_video", "references_to_video" or "extend_video".
    pub mode: GenerationMode,
    /// Text prompt describing the video. Optional for frames and extend modes.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Veo model. Ignored for references_to_video, which always uses the standard model.
    #[serde(default)]
    pub model: Option<VeoModel>,
    /// "16:9" (default) or "9:16". Ignored for extend_video.
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    /// "720p" (default) or "1080p".
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Local image file used as the first frame (frames_to_video).
    #[serde(default)]
    pub start_frame_path: Option<String>,
    /// Local image file used as the last frame (frames_to_video).
    #[serde(default)]
    pub end_frame_path: Option<String>,
    /// Loop back to the start frame (frames_to_video).
    #[serde(default)]
    pub is_looping: Option<bool>,
    /// Local reference image files (references_to_video).
    #[serde(default)]
    pub reference_image_paths: Option<Vec<String>>,
    /// Local logo image file, sent as the first reference (references_to_video).
    #[serde(default)]
    pub logo_image_path: Option<String>,
    /// videoUri of a finished job to extend (extend_video).
    #[serde(default)]
    pub video_uri: Option<String>,
}

impl GenerateVideoParams {
    /// Read the referenced image files and build the request for `mode`.
    pub async fn into_request(self) -> anyhow::Result<GenerationRequest> {
        let prompt = self.prompt.unwrap_or_default();
        let model = self.model.unwrap_or_default();
        let aspect_ratio = self.aspect_ratio.unwrap_or_default();
        let resolution = self.resolution.unwrap_or_default();

        let request = match self.mode {
            GenerationMode::TextToVideo => GenerationRequest::TextToVideo {
                prompt,
                model,
                aspect_ratio,
                resolution,
            },
            GenerationMode::FramesToVideo => GenerationRequest::FramesToVideo {
                prompt,
                model,
                aspect_ratio,
                resolution,
                start_frame: read_optional_image(self.start_frame_path.as_deref()).await?,
                end_frame: read_optional_image(self.end_frame_path.as_deref()).await?,
                is_looping: self.is_looping.unwrap_or(false),
            },
            GenerationMode::ReferencesToVideo => {
                let mut reference_images = Vec::new();
                for path in self.reference_image_paths.unwrap_or_default() {
                    reference_images.push(read_image(&path).await?);
                }
                GenerationRequest::ReferencesToVideo {
                    prompt,
                    aspect_ratio,
                    resolution,
                    reference_images,
                    logo_image: read_optional_image(self.logo_image_path.as_deref()).await?,
                }
            }
            GenerationMode::ExtendVideo => GenerationRequest::ExtendVideo {
                prompt,
                model,
                resolution,
                input_video: self.video_uri.map(VideoHandle::new),
            },
        };
        Ok(request)
    }
}

async fn read_image(path: &str) -> anyhow::Result<ImagePayload> {
    ImagePayload::from_file(path)
        .await
        .with_context(|| format!("failed to read image {path}"))
}

async fn read_optional_image(path: Option<&str>) -> anyhow::Result<Option<ImagePayload>> {
    match path {
        Some(p) => Ok(Some(read_image(p).await?)),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct JobIdParams {
    /// The job ID returned by generate_video.
    pub job_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AskAssistantParams {
    /// The customer's question.
    pub question: String,
    /// Forget earlier questions and answers before asking.
    #[serde(default)]
    pub new_conversation: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListProductsParams {
    /// Restrict to one category. Lists everything when omitted.
    #[serde(default)]
    pub category: Option<Category>,
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AgroStudioMcp {
    job_queue: Arc<JobQueue>,
    chat: Arc<ChatQuery>,
    /// Assistant conversation so far. Only sent when the chat is multi-turn.
    transcript: Arc<Mutex<Vec<ChatTurn>>>,
    tool_router: ToolRouter<Self>,
}

impl AgroStudioMcp {
    pub fn new(job_queue: Arc<JobQueue>, chat: Arc<ChatQuery>) -> Self {
        Self {
            job_queue,
            chat,
            transcript: Arc::new(Mutex::new(Vec::new())),
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result(value: serde_json::Value) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(value.to_string())]))
}

fn error_result(message: String) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::error(vec![Content::text(message)]))
}

#[tool_router]
impl AgroStudioMcp {
    #[tool(description = "Generate a short marketing video with Veo. \
        Returns a job ID immediately; poll with job_status until done (typically 1-5 min). \
        Modes: text_to_video (prompt), frames_to_video (start/end frame images, optional loop), \
        references_to_video (up to 3 images including the logo), extend_video (videoUri of a finished job). \
        Resolutions: 720p (default), 1080p. Aspect ratios: 16:9 (default), 9:16.")]
    async fn generate_video(
        &self,
        Parameters(params): Parameters<GenerateVideoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let request = match params.into_request().await {
            Ok(request) => request,
            Err(e) => return error_result(format!("Invalid video request: {e:#}")),
        };

        match self.job_queue.submit_video(request) {
            Ok(job_id) => json_result(serde_json::json!({
                "jobId": job_id,
                "status": "submitted",
                "message": "Video generation job submitted. Use job_status to check progress."
            })),
            Err(e) => error_result(format!("Failed to submit video job: {e:#}")),
        }
    }

    #[tool(description = "Check the status of a video job. \
        Returns status (pending/running/done/failed/cancelled), the local asset path and \
        videoUri on completion, or an error message on failure.")]
    async fn job_status(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.job_queue.get_job(&params.job_id) {
            Ok(Some(job)) => match serde_json::to_value(&job) {
                Ok(v) => json_result(v),
                Err(e) => error_result(format!("Failed to serialize job: {e}")),
            },
            Ok(None) => error_result(format!("Job '{}' not found", params.job_id)),
            Err(e) => error_result(format!("Failed to query job: {e:#}")),
        }
    }

    #[tool(description = "Cancel a pending or running video job.")]
    async fn cancel_job(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.job_queue.cancel_job(&params.job_id) {
            Ok(cancelled) => json_result(serde_json::json!({
                "jobId": params.job_id,
                "cancelled": cancelled,
            })),
            Err(e) => error_result(format!("Failed to cancel job: {e:#}")),
        }
    }

    #[tool(description = "Remove a finished video job and delete its local video file. \
        Call this once the video is no longer needed; running jobs must be cancelled first.")]
    async fn remove_job(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.job_queue.remove_job(&params.job_id).await {
            Ok(removed) => json_result(serde_json::json!({
                "jobId": params.job_id,
                "removed": removed,
            })),
            Err(e) => error_result(format!("Failed to remove job: {e:#}")),
        }
    }

    #[tool(description = "Ask the Greenfield Agro Supply assistant a question about crops, \
        products or growing practice. Answers are grounded in the product catalog. \
        Set new_conversation=true to start over.")]
    async fn ask_assistant(
        &self,
        Parameters(params): Parameters<AskAssistantParams>,
    ) -> Result<CallToolResult, ErrorData> {
        // Held for the whole exchange so turns stay in order.
        let mut transcript = self.transcript.lock().await;
        if params.new_conversation.unwrap_or(false) {
            transcript.clear();
        }

        match self.chat.ask_with_history(&transcript, &params.question).await {
            Ok(reply) => {
                transcript.push(ChatTurn::user(params.question.as_str()));
                transcript.push(ChatTurn::assistant(reply.as_str()));
                Ok(CallToolResult::success(vec![Content::text(reply)]))
            }
            Err(ChatError::EmptyResponse) => {
                error_result("The assistant returned an empty response.".to_string())
            }
            Err(e) => error_result(format!("Assistant request failed: {e:#}")),
        }
    }

    #[tool(description = "List catalog products, optionally filtered by category \
        (seeds, fertilizers, crop_protection, irrigation, equipment).")]
    async fn list_products(
        &self,
        Parameters(params): Parameters<ListProductsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let products = catalog::products_in(params.category);
        match serde_json::to_value(&products) {
            Ok(v) => json_result(v),
            Err(e) => error_result(format!("Failed to serialize products: {e}")),
        }
    }
}

#[tool_handler]
impl ServerHandler for AgroStudioMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Server instructions: injected as domain knowledge for AI clients
// ---------------------------------------------------------------------------

const SERVER_INSTRUCTIONS: &str = "\
AgroStudio MCP server: Greenfield Agro Supply catalog assistant and video studio.

# Workflow

1. **Answer questions**: Use ask_assistant for agronomy and product questions. Use list_products \
to browse the catalog directly.
2. **Generate video**: Call generate_video. It returns a jobId right away.
3. **Poll completion**: Call job_status with the jobId every 10-20s. Video takes 1-5min.
4. **Extend**: Pass the videoUri from a finished job as video_uri with mode extend_video.
5. **Cancel**: cancel_job stops polling for a job that is no longer needed.
6. **Clean up**: remove_job deletes a finished job's local video file. Only the most recent \
finished jobs are kept; older ones are removed automatically.

# Video Prompt Tips

- Lead with subject and action: \"a green tractor sowing maize at sunrise\".
- Name the setting and light: \"rolling wheat fields, golden hour, light haze\".
- Add one camera move: slow dolly, low drone pass, or static tripod.
- For branded clips use references_to_video with the logo and up to two product photos.
- For seamless loops use frames_to_video with is_looping=true and a single start frame.
";
