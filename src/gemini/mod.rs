pub mod types;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use types::{GenerateContentRequest, GenerateContentResponse, Operation, PredictLongRunningRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Failure talking to the provider API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{what} request failed: {source}")]
    Transport {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{what} API error {status}: {body}")]
    Status {
        what: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid asset URI \"{uri}\": {reason}")]
    InvalidUri { uri: String, reason: String },
    /// The operation finished with a provider-reported error.
    #[error("operation {name} failed (code {code:?}): {message}")]
    Operation {
        name: String,
        code: Option<i32>,
        message: String,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub struct GeminiClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /models/{model}:predictLongRunning: returns the operation handle.
    pub async fn generate_videos(
        &self,
        model: &str,
        req: &PredictLongRunningRequest,
    ) -> Result<Operation, ApiError> {
        let what = "video generation";
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|source| ApiError::Transport { what, source })?;

        parse_json(resp, what).await
    }

    /// GET /{operation name}: poll operation status.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, ApiError> {
        let what = "operation status";
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ApiError::Transport { what, source })?;

        parse_json(resp, what).await
    }

    /// POST /models/{model}:generateContent: one chat exchange.
    pub async fn generate_content(
        &self,
        model: &str,
        req: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let what = "chat";
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|source| ApiError::Transport { what, source })?;

        parse_json(resp, what).await
    }

    /// Resolve a generated sample URI into a URL that can be fetched without
    /// headers: the API key travels as the `key` query parameter.
    pub fn asset_url(&self, uri: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(uri).map_err(|e| ApiError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Plain GET of a generated asset.
    pub async fn fetch_asset(&self, uri: &str) -> Result<Vec<u8>, ApiError> {
        let what = "asset download";
        let url = self.asset_url(uri)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport { what, source })?;

        let resp = check_status(resp, what).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { what, source })?;
        Ok(bytes.to_vec())
    }
}

async fn check_status(resp: Response, what: &'static str) -> Result<Response, ApiError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { what, status, body })
}

async fn parse_json<T: DeserializeOwned>(resp: Response, what: &'static str) -> Result<T, ApiError> {
    check_status(resp, what)
        .await?
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { what, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_url_appends_key_to_existing_query() {
        let client = GeminiClient::new(DEFAULT_BASE_URL.into(), "secret".into());
        let url = client
            .asset_url("https://files.example/v1beta/files/abc:download?alt=media")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://files.example/v1beta/files/abc:download?alt=media&key=secret"
        );
    }

    #[test]
    fn asset_url_rejects_relative_uri() {
        let client = GeminiClient::new(DEFAULT_BASE_URL.into(), "secret".into());
        let err = client.asset_url("files/abc").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUri { .. }));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GeminiClient::new("http://localhost:9000/v1beta/".into(), String::new());
        assert_eq!(client.base_url(), "http://localhost:9000/v1beta");
    }
}
