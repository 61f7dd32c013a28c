#![allow(dead_code)]

use agrostudio_lib::gemini::GeminiClient;
use agrostudio_lib::video::{JobOptions, VideoGenerationJob};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "test-api-key";
pub const FAST_MODEL: &str = "veo-3.1-fast-generate-preview";
pub const OPERATION: &str = "models/veo-3.1-fast-generate-preview/operations/op-1";
pub const VIDEO_BYTES: &[u8] = b"fake-mp4-bytes";

pub fn client(server: &MockServer) -> Arc<GeminiClient> {
    Arc::new(GeminiClient::new(server.uri(), API_KEY.to_string()))
}

pub fn fast_options(assets: &Path) -> JobOptions {
    let mut opts = JobOptions::new(assets);
    opts.poll_interval = Duration::from_millis(10);
    opts.max_wait = Duration::from_secs(5);
    opts
}

pub fn video_job(server: &MockServer, assets: &Path) -> VideoGenerationJob {
    VideoGenerationJob::new(client(server), fast_options(assets))
}

pub fn video_uri(server: &MockServer) -> String {
    format!("{}/files/video-1:download?alt=media", server.uri())
}

pub fn pending_operation() -> Value {
    json!({ "name": OPERATION, "done": false })
}

pub fn done_operation(uris: &[String]) -> Value {
    let samples: Vec<Value> = uris
        .iter()
        .map(|u| json!({ "video": { "uri": u } }))
        .collect();
    json!({
        "name": OPERATION,
        "done": true,
        "response": {
            "generateVideoResponse": { "generatedSamples": samples }
        }
    })
}

pub fn submit_path(model: &str) -> String {
    format!("/models/{model}:predictLongRunning")
}

/// Submission returns a pending operation, the first poll is still pending,
/// the second is done with one sample.
pub async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(submit_path(FAST_MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{OPERATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{OPERATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(done_operation(&[video_uri(server)])))
        .mount(server)
        .await;

    mount_asset(server, 200).await;
}

pub async fn mount_asset(server: &MockServer, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_bytes(VIDEO_BYTES)
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/files/video-1:download"))
        .and(query_param("alt", "media"))
        .and(query_param("key", API_KEY))
        .respond_with(template)
        .mount(server)
        .await;
}

pub fn chat_reply(text: &str) -> Value {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [{ "text": text }] } }
        ]
    })
}
