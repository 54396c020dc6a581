// src/providers/openai.rs
//
// Chat completions client used for product analysis (vision) and for the
// music prompt draft.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ImagePayload, LanguageModel, ensure_success, http_error, invalid_response};
use crate::config::Config;
use crate::error::ProviderError;

const PROVIDER: &str = "openai";
const VISION_TIMEOUT: Duration = Duration::from_secs(60);
const TEXT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
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
            &config.openai_api_key,
            &config.openai_model,
            &config.openai_base_url,
        )
    }

    async fn chat(&self, body: Value, timeout: Duration) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(http_error(PROVIDER))?;

        let resp = ensure_success(PROVIDER, resp).await?;
        let json: Value = resp.json().await.map_err(http_error(PROVIDER))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid_response(PROVIDER, "no message content in choices"))
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn describe_product(
        &self,
        prompt: &str,
        image: &ImagePayload,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image.data_url() } }
                ]
            }],
            "max_tokens": 2000,
            "temperature": 0.7
        });
        self.chat(body, VISION_TIMEOUT).await
    }

    async fn compose_json(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "temperature": 0.7,
            "response_format": { "type": "json_object" }
        });
        self.chat(body, TEXT_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[tokio::test]
    async fn vision_request_carries_image_as_data_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("Authorization", "Bearer sk-test")
                    .body_contains("data:image/png;base64,AQID");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "content": "{\"image_prompt\": \"x\"}" } }]
                }));
            })
            .await;

        let client = OpenAiClient::new("sk-test", "gpt-4o", server.base_url());
        let image = ImagePayload::new("image/png", vec![1, 2, 3]);
        let reply = client.describe_product("hola", &image).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "{\"image_prompt\": \"x\"}");
    }

    #[tokio::test]
    async fn api_errors_keep_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = OpenAiClient::new("sk-test", "gpt-4o", server.base_url());
        let err = client.compose_json("sys", "user").await.unwrap_err();
        match err {
            ProviderError::Api { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
