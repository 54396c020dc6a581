// src/providers/mod.rs
//
// Contracts for the external generation APIs. Workflows only see these
// traits; the HTTP clients live in the submodules.

pub mod gemini;
pub mod musicgpt;
pub mod openai;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ProviderError;

pub use gemini::GeminiClient;
pub use musicgpt::MusicGptClient;
pub use openai::OpenAiClient;

/// Image bytes plus their declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Text/vision model used to draft image prompts and music prompts.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends `prompt` together with the product photo and returns the raw reply.
    async fn describe_product(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, ProviderError>;

    /// System + user exchange constrained to a JSON object reply.
    async fn compose_json(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Image model that renders the final marketing picture.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Returns the decoded bytes of the first inline image in the reply.
    async fn render(
        &self,
        prompt: &str,
        product: &ImagePayload,
        logo: Option<&ImagePayload>,
    ) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicJob {
    pub prompt: String,
    pub music_style: String,
    pub instrumental: bool,
    pub duration_secs: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed { audio_url: String },
    Failed(String),
}

/// Asynchronous music generation: submit, then poll by conversion id.
#[async_trait]
pub trait MusicModel: Send + Sync {
    async fn submit(&self, job: &MusicJob) -> Result<String, ProviderError>;
    async fn status(&self, conversion_id: &str) -> Result<JobStatus, ProviderError>;
    async fn download(&self, audio_url: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Reads a non-2xx response into [`ProviderError::Api`].
pub(crate) async fn ensure_success(
    provider: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn http_error(provider: &'static str) -> impl Fn(reqwest::Error) -> ProviderError {
    move |source| ProviderError::Http { provider, source }
}

pub(crate) fn invalid_response(provider: &'static str, detail: impl ToString) -> ProviderError {
    ProviderError::InvalidResponse {
        provider,
        detail: detail.to_string(),
    }
}
