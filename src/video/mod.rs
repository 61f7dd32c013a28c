pub mod asset;
pub mod job;

use base64::Engine;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::GenerationError;
use crate::gemini::types::{
    InlineImage, PredictLongRunningRequest, ReferenceImage, VideoInstance, VideoParameters,
    VideoRef,
};

pub use asset::LocalAsset;
pub use job::{JobOptions, ProducedVideo, VideoGenerationJob};

// ---------------------------------------------------------------------------
// Valid values: aligned with the Veo 3.1 generation API
// ---------------------------------------------------------------------------

/// Combined cap for logo + reference images sent with one request.
pub const MAX_REFERENCE_IMAGES: usize = 3;

/// Videos requested per submission.
pub const NUMBER_OF_VIDEOS: u32 = 1;

const REFERENCE_TYPE_ASSET: &str = "asset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum VeoModel {
    #[default]
    #[serde(rename = "veo-3.1-fast-generate-preview")]
    Fast,
    #[serde(rename = "veo-3.1-generate-preview")]
    Standard,
}

impl VeoModel {
    pub fn id(self) -> &'static str {
        match self {
            VeoModel::Fast => "veo-3.1-fast-generate-preview",
            VeoModel::Standard => "veo-3.1-generate-preview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    TextToVideo,
    FramesToVideo,
    ReferencesToVideo,
    ExtendVideo,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationMode::TextToVideo => "text_to_video",
            GenerationMode::FramesToVideo => "frames_to_video",
            GenerationMode::ReferencesToVideo => "references_to_video",
            GenerationMode::ExtendVideo => "extend_video",
        })
    }
}

/// What to do when logo + reference images exceed [`MAX_REFERENCE_IMAGES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Keep the first entries (logo first) and drop the rest.
    #[default]
    Truncate,
    /// Fail with [`GenerationError::TooManyReferenceImages`].
    Reject,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Image bytes plus MIME type, as picked from a file input.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, guessing the MIME type from its extension.
    pub async fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self { bytes, mime_type })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    fn to_inline(&self) -> InlineImage {
        InlineImage {
            bytes_base64_encoded: self.to_base64(),
            mime_type: self.mime_type.clone(),
        }
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Provider-issued locator of a previously generated video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoHandle(String);

impl VideoHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest: one variant per mode, each carrying only its own inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    TextToVideo {
        prompt: String,
        model: VeoModel,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
    },
    FramesToVideo {
        prompt: String,
        model: VeoModel,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
        start_frame: Option<ImagePayload>,
        end_frame: Option<ImagePayload>,
        /// Send the start frame as the last frame too.
        is_looping: bool,
    },
    /// Always generated with [`VeoModel::Standard`].
    ReferencesToVideo {
        prompt: String,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
        reference_images: Vec<ImagePayload>,
        logo_image: Option<ImagePayload>,
    },
    ExtendVideo {
        prompt: String,
        model: VeoModel,
        resolution: Resolution,
        input_video: Option<VideoHandle>,
    },
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        GenerationRequest::TextToVideo {
            prompt: prompt.into(),
            model: VeoModel::default(),
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
        }
    }

    pub fn mode(&self) -> GenerationMode {
        match self {
            GenerationRequest::TextToVideo { .. } => GenerationMode::TextToVideo,
            GenerationRequest::FramesToVideo { .. } => GenerationMode::FramesToVideo,
            GenerationRequest::ReferencesToVideo { .. } => GenerationMode::ReferencesToVideo,
            GenerationRequest::ExtendVideo { .. } => GenerationMode::ExtendVideo,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::TextToVideo { prompt, .. }
            | GenerationRequest::FramesToVideo { prompt, .. }
            | GenerationRequest::ReferencesToVideo { prompt, .. }
            | GenerationRequest::ExtendVideo { prompt, .. } => prompt,
        }
    }

    /// Model the request is submitted to.
    pub fn model(&self) -> VeoModel {
        match self {
            GenerationRequest::TextToVideo { model, .. }
            | GenerationRequest::FramesToVideo { model, .. }
            | GenerationRequest::ExtendVideo { model, .. } => *model,
            GenerationRequest::ReferencesToVideo { .. } => VeoModel::Standard,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            GenerationRequest::TextToVideo { resolution, .. }
            | GenerationRequest::FramesToVideo { resolution, .. }
            | GenerationRequest::ReferencesToVideo { resolution, .. }
            | GenerationRequest::ExtendVideo { resolution, .. } => *resolution,
        }
    }

    /// Presence checks that gate the submit button.
    pub fn is_submittable(&self) -> bool {
        let has_prompt = !self.prompt().trim().is_empty();
        match self {
            GenerationRequest::TextToVideo { .. } => has_prompt,
            GenerationRequest::FramesToVideo { start_frame, .. } => start_frame.is_some(),
            GenerationRequest::ReferencesToVideo {
                reference_images,
                logo_image,
                ..
            } => has_prompt && (!reference_images.is_empty() || logo_image.is_some()),
            GenerationRequest::ExtendVideo { input_video, .. } => input_video.is_some(),
        }
    }

    /// Checks that must pass before anything is sent to the provider.
    pub fn validate(&self, policy: ReferencePolicy) -> Result<(), GenerationError> {
        match self {
            GenerationRequest::ExtendVideo {
                input_video: None, ..
            } => Err(GenerationError::Configuration(
                "extend_video requires the handle of a previously generated video".into(),
            )),
            GenerationRequest::ReferencesToVideo {
                reference_images,
                logo_image,
                ..
            } if policy == ReferencePolicy::Reject => {
                let supplied = reference_images.len() + usize::from(logo_image.is_some());
                if supplied > MAX_REFERENCE_IMAGES {
                    return Err(GenerationError::TooManyReferenceImages {
                        supplied,
                        max: MAX_REFERENCE_IMAGES,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Project the request onto the provider payload for its mode.
    pub fn to_provider_request(
        &self,
        policy: ReferencePolicy,
    ) -> Result<PredictLongRunningRequest, GenerationError> {
        self.validate(policy)?;

        let mut instance = VideoInstance {
            prompt: outgoing_prompt(self.prompt()),
            ..Default::default()
        };
        let mut parameters = VideoParameters {
            number_of_videos: NUMBER_OF_VIDEOS,
            resolution: self.resolution().as_str().to_string(),
            aspect_ratio: None,
        };

        match self {
            GenerationRequest::TextToVideo { aspect_ratio, .. } => {
                parameters.aspect_ratio = Some(aspect_ratio.as_str().to_string());
            }
            GenerationRequest::FramesToVideo {
                aspect_ratio,
                start_frame,
                end_frame,
                is_looping,
                ..
            } => {
                parameters.aspect_ratio = Some(aspect_ratio.as_str().to_string());
                instance.image = start_frame.as_ref().map(ImagePayload::to_inline);
                let last = if *is_looping { start_frame } else { end_frame };
                instance.last_frame = last.as_ref().map(ImagePayload::to_inline);
            }
            GenerationRequest::ReferencesToVideo {
                aspect_ratio,
                reference_images,
                logo_image,
                ..
            } => {
                parameters.aspect_ratio = Some(aspect_ratio.as_str().to_string());
                let references = collect_references(logo_image.as_ref(), reference_images);
                if !references.is_empty() {
                    instance.reference_images = Some(references);
                }
            }
            GenerationRequest::ExtendVideo { input_video, .. } => {
                instance.video = input_video.as_ref().map(|h| VideoRef {
                    uri: Some(h.as_str().to_string()),
                });
            }
        }

        Ok(PredictLongRunningRequest {
            instances: vec![instance],
            parameters,
        })
    }
}

fn outgoing_prompt(prompt: &str) -> Option<String> {
    if prompt.trim().is_empty() {
        None
    } else {
        Some(prompt.to_string())
    }
}

/// Logo first, then references in order, capped at [`MAX_REFERENCE_IMAGES`].
fn collect_references(logo: Option<&ImagePayload>, references: &[ImagePayload]) -> Vec<ReferenceImage> {
    let supplied = references.len() + usize::from(logo.is_some());
    if supplied > MAX_REFERENCE_IMAGES {
        tracing::warn!(
            supplied,
            max = MAX_REFERENCE_IMAGES,
            "dropping reference images beyond the cap"
        );
    }
    logo.into_iter()
        .chain(references)
        .take(MAX_REFERENCE_IMAGES)
        .map(|img| ReferenceImage {
            image: img.to_inline(),
            reference_type: REFERENCE_TYPE_ASSET.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(tag: u8) -> ImagePayload {
        ImagePayload::new(vec![tag; 4], "image/png")
    }

    fn frames(is_looping: bool, end_frame: Option<ImagePayload>) -> GenerationRequest {
        GenerationRequest::FramesToVideo {
            prompt: "tractor at dawn".into(),
            model: VeoModel::Fast,
            aspect_ratio: AspectRatio::Landscape,
            resolution: Resolution::P720,
            start_frame: Some(img(1)),
            end_frame,
            is_looping,
        }
    }

    fn references(count: usize, logo: bool) -> GenerationRequest {
        GenerationRequest::ReferencesToVideo {
            prompt: "our seed bags on a pallet".into(),
            aspect_ratio: AspectRatio::Portrait,
            resolution: Resolution::P720,
            reference_images: (0..count).map(|i| img(10 + i as u8)).collect(),
            logo_image: logo.then(|| img(99)),
        }
    }

    #[test]
    fn text_to_video_sends_prompt_and_aspect_ratio() {
        let req = GenerationRequest::text("sunrise over a valley");
        let body = serde_json::to_value(req.to_provider_request(ReferencePolicy::Truncate).unwrap())
            .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "instances": [{ "prompt": "sunrise over a valley" }],
                "parameters": {
                    "numberOfVideos": 1,
                    "resolution": "720p",
                    "aspectRatio": "16:9"
                }
            })
        );
    }

    #[test]
    fn blank_prompt_is_omitted() {
        for prompt in ["", "   ", "\n\t"] {
            let req = GenerationRequest::text(prompt);
            let out = req.to_provider_request(ReferencePolicy::Truncate).unwrap();
            assert!(out.instances[0].prompt.is_none(), "prompt {prompt:?} leaked");
            let v = serde_json::to_value(&out).unwrap();
            assert!(v["instances"][0].get("prompt").is_none());
        }
    }

    #[test]
    fn looping_forces_last_frame_to_start_frame() {
        let out = frames(true, Some(img(2)))
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        let instance = &out.instances[0];
        assert_eq!(instance.image, Some(img(1).to_inline()));
        assert_eq!(instance.last_frame, Some(img(1).to_inline()));
    }

    #[test]
    fn non_looping_uses_explicit_end_frame() {
        let out = frames(false, Some(img(2)))
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        assert_eq!(out.instances[0].last_frame, Some(img(2).to_inline()));

        let out = frames(false, None)
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        assert!(out.instances[0].last_frame.is_none());
    }

    #[test]
    fn references_are_capped_with_logo_first() {
        let out = references(2, true)
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        let refs = out.instances[0].reference_images.as_ref().unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].image, img(99).to_inline());
        assert_eq!(refs[1].image, img(10).to_inline());
        assert!(refs.iter().all(|r| r.reference_type == "asset"));

        let out = references(5, true)
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        let refs = out.instances[0].reference_images.as_ref().unwrap();
        assert_eq!(refs.len(), MAX_REFERENCE_IMAGES);
        assert_eq!(refs[0].image, img(99).to_inline());
        assert_eq!(refs[2].image, img(11).to_inline());
    }

    #[test]
    fn empty_reference_list_is_not_attached() {
        let out = references(0, false)
            .to_provider_request(ReferencePolicy::Truncate)
            .unwrap();
        assert!(out.instances[0].reference_images.is_none());
    }

    #[test]
    fn reject_policy_reports_excess_references() {
        let err = references(3, true)
            .to_provider_request(ReferencePolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::TooManyReferenceImages { supplied: 4, max: 3 }
        ));
        assert!(references(2, true).validate(ReferencePolicy::Reject).is_ok());
    }

    #[test]
    fn references_force_standard_model() {
        assert_eq!(references(1, false).model(), VeoModel::Standard);
    }

    #[test]
    fn extend_without_handle_is_a_configuration_error() {
        let req = GenerationRequest::ExtendVideo {
            prompt: "keep going".into(),
            model: VeoModel::Fast,
            resolution: Resolution::P720,
            input_video: None,
        };
        assert!(matches!(
            req.to_provider_request(ReferencePolicy::Truncate),
            Err(GenerationError::Configuration(_))
        ));
    }

    #[test]
    fn extend_sends_handle_and_omits_aspect_ratio() {
        let req = GenerationRequest::ExtendVideo {
            prompt: String::new(),
            model: VeoModel::Fast,
            resolution: Resolution::P720,
            input_video: Some(VideoHandle::new("https://files/v1")),
        };
        let v = serde_json::to_value(req.to_provider_request(ReferencePolicy::Truncate).unwrap())
            .unwrap();
        assert_eq!(v["instances"][0], serde_json::json!({ "video": { "uri": "https://files/v1" } }));
        assert!(v["parameters"].get("aspectRatio").is_none());
        assert_eq!(v["parameters"]["resolution"], "720p");
    }

    #[test]
    fn submittable_presence_checks() {
        assert!(GenerationRequest::text("fields").is_submittable());
        assert!(!GenerationRequest::text("  ").is_submittable());
        assert!(frames(false, None).is_submittable());
        assert!(references(1, false).is_submittable());
        assert!(!references(0, false).is_submittable());
        assert!(references(0, true).is_submittable());
    }

    #[test]
    fn enums_serialize_to_provider_values() {
        assert_eq!(serde_json::to_value(AspectRatio::Portrait).unwrap(), "9:16");
        assert_eq!(serde_json::to_value(Resolution::P1080).unwrap(), "1080p");
        assert_eq!(
            serde_json::to_value(VeoModel::Standard).unwrap(),
            VeoModel::Standard.id()
        );
        let mode: GenerationMode = serde_json::from_str("\"frames_to_video\"").unwrap();
        assert_eq!(mode, GenerationMode::FramesToVideo);
        assert_eq!(mode.to_string(), "frames_to_video");
    }

    #[tokio::test]
    async fn image_payload_from_file_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.jpg");
        tokio::fs::write(&path, [0xff, 0xd8, 0xff]).await.unwrap();

        let payload = ImagePayload::from_file(&path).await.unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.to_base64(), "/9j/");
    }
}
