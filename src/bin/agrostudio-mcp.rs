//! Standalone MCP server binary for AgroStudio.
//!
//! Communicates with AI clients (e.g. Claude Desktop) over stdio JSON-RPC and
//! exposes the catalog assistant and the video studio as tools.

use anyhow::{bail, Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use std::sync::Arc;
use tracing::info;

use agrostudio_lib::chat::ChatQuery;
use agrostudio_lib::gemini::GeminiClient;
use agrostudio_lib::mcp::AgroStudioMcp;
use agrostudio_lib::tasks::{JobQueue, JobSnapshot};
use agrostudio_lib::video::VideoGenerationJob;
use agrostudio_lib::{load_settings, resolve_data_dir, API_KEY_ENV};

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so stdout stays clean for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let data_dir = resolve_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let settings = load_settings(&data_dir).with_env_override();
    if settings.api_key.trim().is_empty() {
        bail!(
            "no API key configured: set apiKey in {} or {API_KEY_ENV}",
            data_dir.join("settings.json").display()
        );
    }
    info!(
        base_url = %settings.base_url,
        chat_model = %settings.chat_model,
        multi_turn = settings.multi_turn_chat,
        "loaded settings"
    );

    let client = Arc::new(GeminiClient::new(
        settings.base_url.clone(),
        settings.api_key.clone(),
    ));

    let job_options = settings.job_options(&data_dir);
    info!(assets_dir = %job_options.assets_dir.display(), "video assets directory");
    let mut job_queue = JobQueue::new(VideoGenerationJob::new(Arc::clone(&client), job_options))
        .with_finished_limit(settings.finished_job_limit);
    job_queue.set_on_complete(Arc::new(|job: JobSnapshot| {
        info!(job_id = %job.job_id, status = ?job.status, "video job finished");
    }));

    let chat = ChatQuery::new(Arc::clone(&client), settings.chat_model.clone())
        .with_multi_turn(settings.multi_turn_chat);

    let server = AgroStudioMcp::new(Arc::new(job_queue), Arc::new(chat));

    info!("AgroStudio MCP server starting on stdio");

    let service = server
        .serve(stdio())
        .await
        .context("MCP server failed to start")?;

    service.waiting().await?;

    Ok(())
}
