// src/providers/gemini.rs

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use super::{ImageModel, ImagePayload, ensure_success, http_error, invalid_response};
use crate::config::Config;
use crate::error::ProviderError;

const PROVIDER: &str = "gemini";
const RENDER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.gemini_api_key,
            &config.gemini_model,
            &config.gemini_base_url,
        )
    }
}

fn inline_part(image: &ImagePayload) -> Value {
    json!({
        "inline_data": {
            "mime_type": image.mime_type,
            "data": image.to_base64()
        }
    })
}

/// First inline image of the first candidate, still base64 encoded.
fn first_inline_image(reply: &Value) -> Result<&str, ProviderError> {
    let candidate = reply["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or(ProviderError::MissingOutput {
            provider: PROVIDER,
            what: "candidates",
        })?;

    candidate["content"]["parts"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|part| {
            let inline = part.get("inlineData").or_else(|| part.get("inline_data"))?;
            inline.get("data")?.as_str()
        })
        .next()
        .ok_or(ProviderError::MissingOutput {
            provider: PROVIDER,
            what: "image",
        })
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn render(
        &self,
        prompt: &str,
        product: &ImagePayload,
        logo: Option<&ImagePayload>,
    ) -> Result<Vec<u8>, ProviderError> {
        let mut parts = vec![json!({ "text": prompt }), inline_part(product)];
        if let Some(logo) = logo {
            parts.push(inline_part(logo));
        }

        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
        });

        let resp = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .timeout(RENDER_TIMEOUT)
            .send()
            .await
            .map_err(http_error(PROVIDER))?;

        let resp = ensure_success(PROVIDER, resp).await?;
        let reply: Value = resp.json().await.map_err(http_error(PROVIDER))?;

        let encoded = first_inline_image(&reply)?;
        STANDARD
            .decode(encoded)
            .map_err(|e| invalid_response(PROVIDER, format!("image is not base64: {e}")))
    }
}
