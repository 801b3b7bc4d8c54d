//! Remote media-processing API surface.
//!
//! The service accepts a binary upload, processes it server-side through an
//! opaque state machine, answers generation requests against the processed
//! asset, and deletes assets on request. [`RemoteMedia`] is the seam the
//! job tracker works against; [`MediaApiClient`] is the HTTP
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Remote asset lifecycle state as the service reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

impl FileState {
    /// Whether the state machine has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Active | FileState::Failed)
    }
}

/// Failure detail attached to a remote asset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusDetail {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// One uploaded binary object on the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    /// Opaque handle, e.g. `files/abc123`
    pub name: String,

    /// Content URI used in generation requests
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default = "default_state")]
    pub state: FileState,

    /// Populated when the asset failed processing
    #[serde(default)]
    pub error: Option<StatusDetail>,
}

fn default_state() -> FileState {
    FileState::Processing
}

impl RemoteFile {
    /// Failure message for error reporting, with a fallback when the
    /// service gave none.
    pub fn failure_message(&self) -> String {
        self.error
            .as_ref()
            .filter(|d| !d.message.is_empty())
            .map(|d| d.message.clone())
            .unwrap_or_else(|| format!("asset {} reached FAILED state", self.name))
    }
}

/// Options for a generation request.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Model name, e.g. `gemini-2.5-pro`
    pub model: String,
    pub temperature: f32,
    /// Ask the service for a JSON response body
    pub json_response: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            temperature: 0.2,
            json_response: true,
        }
    }
}

/// The remote processing API as the job tracker sees it.
#[async_trait]
pub trait RemoteMedia: Send + Sync {
    /// Upload a binary asset; returns the tracked remote file.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> ClientResult<RemoteFile>;

    /// Fetch the current state of an uploaded asset.
    async fn get_file(&self, name: &str) -> ClientResult<RemoteFile>;

    /// Run a generation request against a processed asset; returns the raw
    /// model text.
    async fn generate(
        &self,
        file: &RemoteFile,
        prompt: &str,
        options: &GenerateOptions,
    ) -> ClientResult<String>;

    /// Delete an uploaded asset.
    async fn delete_file(&self, name: &str) -> ClientResult<()>;
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct MediaApiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Request timeout; generation against long videos is slow.
    pub timeout: Duration,
}

impl MediaApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ClientError::config("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("MEDIA_API_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = std::env::var("MEDIA_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "fileUri")]
    file_uri: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

// =============================================================================
// HTTP client
// =============================================================================

/// HTTP implementation of [`RemoteMedia`].
pub struct MediaApiClient {
    http: Client,
    config: MediaApiConfig,
}

impl MediaApiClient {
    /// Create a new client.
    pub fn new(config: MediaApiConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(MediaApiConfig::from_env()?)
    }

    /// Map non-success statuses into the error taxonomy.
    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::from_status(status, body))
        }
    }
}

#[async_trait]
impl RemoteMedia for MediaApiClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> ClientResult<RemoteFile> {
        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );

        debug!(display_name, size = bytes.len(), "uploading asset");

        let response = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-File-Name", display_name)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        let upload: UploadResponse = Self::check(response).await?.json().await?;
        Ok(upload.file)
    }

    async fn get_file(&self, name: &str) -> ClientResult<RemoteFile> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );

        let response = self.http.get(&url).send().await?;
        let file: RemoteFile = Self::check(response).await?.json().await?;
        Ok(file)
    }

    async fn generate(
        &self,
        file: &RemoteFile,
        prompt: &str,
        options: &GenerateOptions,
    ) -> ClientResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, options.model, self.config.api_key
        );

        let file_uri = file.uri.clone().unwrap_or_else(|| file.name.clone());
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        file_data: Some(FileData {
                            file_uri,
                            mime_type: None,
                        }),
                    },
                    Part {
                        text: Some(prompt.to_string()),
                        file_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                response_mime_type: options
                    .json_response
                    .then(|| "application/json".to_string()),
            },
        };

        let response = self.http.post(&url).json(&request).send().await?;
        let generated: GenerateResponse = Self::check(response).await?.json().await?;

        generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ClientError::MalformedResponse("no content in response".to_string()))
    }

    async fn delete_file(&self, name: &str) -> ClientResult<()> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );

        let response = self.http.delete(&url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
