use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Video generation: long-running operation pattern
// POST {baseURL}/models/{model}:predictLongRunning  → operation
// GET  {baseURL}/{operation.name}                    → status + generated samples
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictLongRunningRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// First frame for image-to-video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame: Option<InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_images: Option<Vec<ReferenceImage>>,
    /// Previously generated video to extend. Only the provider URI is accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub image: InlineImage,
    pub reference_type: String, // always "asset"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub number_of_videos: u32,
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<OperationResponse>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

impl Operation {
    /// URIs of every generated sample that carries one, in provider order.
    pub fn video_uris(&self) -> Vec<&str> {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .map(|r| {
                r.generated_samples
                    .iter()
                    .filter_map(|s| s.video.as_ref().and_then(|v| v.uri.as_deref()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Chat: single request/response
// POST {baseURL}/models/{model}:generateContent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>, // "user" | "model"
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(String::from),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if it has any.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if parts.iter().all(|p| p.text.is_none()) {
            return None;
        }
        Some(text)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_without_response_has_no_uris() {
        let op: Operation =
            serde_json::from_value(json!({ "name": "operations/abc" })).expect("deserialize");
        assert!(!op.done);
        assert!(op.video_uris().is_empty());
    }

    #[test]
    fn operation_collects_sample_uris_in_order() {
        let op: Operation = serde_json::from_value(json!({
            "name": "operations/abc",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": "https://files/a" } },
                        { "video": {} },
                        { "video": { "uri": "https://files/b" } }
                    ]
                }
            }
        }))
        .expect("deserialize");
        assert_eq!(op.video_uris(), vec!["https://files/a", "https://files/b"]);
    }

    #[test]
    fn instance_omits_absent_fields() {
        let v = serde_json::to_value(VideoInstance::default()).unwrap();
        assert_eq!(v, json!({}));
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "farmer." }] } },
                { "content": { "role": "model", "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hello, farmer."));
    }

    #[test]
    fn response_text_is_none_without_candidates() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.text().is_none());
    }
}
