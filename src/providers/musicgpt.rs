// src/providers/musicgpt.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{JobStatus, MusicJob, MusicModel, ensure_success, http_error, invalid_response};
use crate::config::Config;
use crate::error::ProviderError;

const PROVIDER: &str = "musicgpt";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Bucket holding conversion paths the status endpoint returns without a host.
const RESULT_BUCKET_URL: &str = "https://lalals.s3.amazonaws.com";

#[derive(Clone)]
pub struct MusicGptClient {
    http: reqwest::Client,
    authorization: String,
    base_url: String,
}

impl MusicGptClient {
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            authorization: authorization_header(api_key),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.musicgpt_api_key, &config.musicgpt_api_url)
    }
}

/// Keys are sometimes configured with their `Bearer` prefix already attached.
fn authorization_header(api_key: &str) -> String {
    if api_key.starts_with("Bearer") {
        api_key.to_string()
    } else {
        format!("Bearer {api_key}")
    }
}

fn conversion_id(reply: &Value) -> Result<String, ProviderError> {
    if reply["success"].as_bool() != Some(true) {
        return Err(invalid_response(
            PROVIDER,
            format!("request not accepted: {reply}"),
        ));
    }
    reply["conversion_id"]
        .as_str()
        .or_else(|| reply["conversion_id_1"].as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(ProviderError::MissingOutput {
            provider: PROVIDER,
            what: "conversion_id",
        })
}

fn job_status(reply: &Value) -> JobStatus {
    let conversion = &reply["conversion"];
    let status = conversion["status"]
        .as_str()
        .or_else(|| conversion["message"].as_str());

    match status {
        Some("COMPLETED") | Some("success") => {
            if let Some(url) = conversion["audio_url"].as_str().filter(|u| !u.is_empty()) {
                return JobStatus::Completed {
                    audio_url: url.to_string(),
                };
            }
            let path = conversion["conversion_path_1"]
                .as_str()
                .or_else(|| conversion["conversion_path_2"].as_str())
                .filter(|p| !p.is_empty());
            match path {
                Some(p) if p.starts_with("http") => JobStatus::Completed {
                    audio_url: p.to_string(),
                },
                Some(p) => JobStatus::Completed {
                    audio_url: format!("{RESULT_BUCKET_URL}/{}", p.trim_start_matches('/')),
                },
                // Marked done before the file is attached; keep waiting.
                None => JobStatus::Running,
            }
        }
        Some("FAILED") | Some("ERROR") => JobStatus::Failed(format!(
            "Generación falló en el servidor: {conversion}"
        )),
        _ => JobStatus::Running,
    }
}

#[async_trait]
impl MusicModel for MusicGptClient {
    async fn submit(&self, job: &MusicJob) -> Result<String, ProviderError> {
        let body = json!({
            "prompt": job.prompt,
            "music_style": job.music_style,
            "make_instrumental": job.instrumental,
            "duration": job.duration_secs
        });

        let resp = self
            .http
            .post(format!("{}/MusicAI", self.base_url))
            .header("Authorization", &self.authorization)
            .json(&body)
            .timeout(SUBMIT_TIMEOUT)
            .send()
            .await
            .map_err(http_error(PROVIDER))?;

        let resp = ensure_success(PROVIDER, resp).await?;
        let reply: Value = resp.json().await.map_err(http_error(PROVIDER))?;
        conversion_id(&reply)
    }

    async fn status(&self, conversion_id: &str) -> Result<JobStatus, ProviderError> {
        let resp = self
            .http
            .get(format!("{}/byId", self.base_url))
            .header("Authorization", &self.authorization)
            .query(&[("conversionType", "MUSIC_AI"), ("conversion_id", conversion_id)])
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(http_error(PROVIDER))?;

        let resp = ensure_success(PROVIDER, resp).await?;
        let reply: Value = resp.json().await.map_err(http_error(PROVIDER))?;
        Ok(job_status(&reply))
    }

    async fn download(&self, audio_url: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self
            .http
            .get(audio_url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(http_error(PROVIDER))?;

        let resp = ensure_success(PROVIDER, resp).await?;
        let bytes = resp.bytes().await.map_err(http_error(PROVIDER))?;
        Ok(bytes.to_vec())
    }
}
