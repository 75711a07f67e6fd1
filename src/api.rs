//! Backend batch upload contract and its HTTP client.
//!
//! The submitter only sees [`BatchApi`]: one call per warmth group, carrying
//! the compressed images, the shared tag and the session id. [`HttpBatchApi`]
//! is the production implementation, a `multipart/form-data` POST:
//!
//! | Field | Value |
//! |---|---|
//! | `files` | one part per image, `image/jpeg`, with its filename |
//! | `user_id` | session identifier |
//! | `warmth` | `薄`, `適中` or `厚` |
//!
//! The response body is JSON:
//!
//! ```json
//! {
//!   "success": true,
//!   "success_count": 2,
//!   "fail_count": 0,
//!   "items": [{"name": "Linen shirt", "category": "上衣", "color": "白", "style": "casual"}],
//!   "fail_details": []
//! }
//! ```

use crate::config::BackendConfig;
use crate::types::{NormalizedImage, WarmthTag};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One group's worth of upload.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub images: Vec<NormalizedImage>,
    pub warmth: WarmthTag,
    pub user_id: String,
}

/// Backend record for an accepted item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerItem {
    #[serde(default, deserialize_with = "string_or_number")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub style: String,
    /// Fields this client does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accept `"abc"`, `42` or `null` for an id.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    }))
}

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Backend verdict for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fail_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ServerItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_details: Option<Vec<String>>,
}

/// The backend's batch upload endpoint.
#[async_trait]
pub trait BatchApi: Send + Sync {
    async fn upload_batch(&self, request: BatchRequest) -> Result<BatchResponse, ApiError>;
}

/// [`BatchApi`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpBatchApi {
    client: Client,
    url: String,
}

impl HttpBatchApi {
    pub fn new(base_url: &str, upload_path: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: join_url(base_url, upload_path),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.base_url,
            &config.upload_path,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Build the multipart body for one group.
fn build_form(request: BatchRequest) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for image in request.images {
        let part = Part::bytes(image.bytes)
            .file_name(image.name)
            .mime_str(image.encoding.mime_type())?;
        form = form.part("files", part);
    }
    Ok(form
        .text("user_id", request.user_id)
        .text("warmth", request.warmth.wire_value()))
}

#[async_trait]
impl BatchApi for HttpBatchApi {
    async fn upload_batch(&self, request: BatchRequest) -> Result<BatchResponse, ApiError> {
        let count = request.images.len();
        let warmth = request.warmth;
        let form = build_form(request)?;

        tracing::debug!(url = %self.url, tag = %warmth, count, "POST batch");
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
