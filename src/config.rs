// src/config.rs

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBackend {
    Local,
    S3 {
        bucket: String,
        endpoint: Option<String>,
        public_base_url: String,
    },
}

/// Bounded wait-for-completion policy for the music provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,

    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub free_credits_on_signup: i32,

    pub base_url: String,

    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,

    pub musicgpt_api_key: String,
    pub musicgpt_api_url: String,
    pub music_poll: PollPolicy,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub stripe_webhook_tolerance_secs: i64,

    /// MXN per 1 USD.
    pub mxn_usd_rate: f64,

    pub generated_dir: PathBuf,
    pub artifact_backend: ArtifactBackend,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let artifact_backend = match optional("ARTIFACT_BACKEND").as_deref() {
            None | Some("local") => ArtifactBackend::Local,
            Some("s3") => {
                let bucket = required("S3_BUCKET")?;
                let public_base_url = optional("S3_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com"));
                ArtifactBackend::S3 {
                    endpoint: optional("S3_ENDPOINT"),
                    public_base_url,
                    bucket,
                }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "ARTIFACT_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let mxn_usd_rate: f64 = parsed("MXN_USD_RATE", 17.50)?;
        if !(mxn_usd_rate > 0.0) {
            return Err(ConfigError::Invalid {
                key: "MXN_USD_RATE",
                value: mxn_usd_rate.to_string(),
            });
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT", 5001)?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_hours: parsed("JWT_EXPIRATION_HOURS", 24 * 7)?,
            free_credits_on_signup: parsed("FREE_CREDITS_ON_SIGNUP", 1)?,
            base_url: optional("BASE_URL").unwrap_or_else(|| "http://localhost:5001".to_string()),
            openai_api_key: optional("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: optional("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_base_url: optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            gemini_api_key: optional("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-3-pro-image-preview".to_string()),
            gemini_base_url: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            musicgpt_api_key: optional("MUSICGPT_API_KEY").unwrap_or_default(),
            musicgpt_api_url: optional("MUSICGPT_API_URL")
                .unwrap_or_else(|| "https://api.musicgpt.com/api/public/v1".to_string()),
            music_poll: PollPolicy {
                interval: Duration::from_millis(parsed("MUSIC_POLL_INTERVAL_MS", 2000)?),
                max_attempts: parsed("MUSIC_POLL_MAX_ATTEMPTS", 60)?,
            },
            stripe_secret_key: optional("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_api_base: optional("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
            stripe_webhook_tolerance_secs: parsed("STRIPE_WEBHOOK_TOLERANCE_SECS", 300)?,
            mxn_usd_rate,
            generated_dir: optional("GENERATED_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./generated")),
            artifact_backend,
        })
    }

    /// Configuration for tests and local tooling; nothing is read from the environment.
    pub fn for_tests(generated_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: String::new(),
            jwt_secret: "test-jwt-secret".to_string(),
            jwt_expiration_hours: 1,
            free_credits_on_signup: 1,
            base_url: "http://localhost".to_string(),
            openai_api_key: "test-openai".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "http://localhost".to_string(),
            gemini_api_key: "test-gemini".to_string(),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: "http://localhost".to_string(),
            musicgpt_api_key: "test-musicgpt".to_string(),
            musicgpt_api_url: "http://localhost".to_string(),
            music_poll: PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 5,
            },
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: "http://localhost".to_string(),
            stripe_webhook_tolerance_secs: 300,
            mxn_usd_rate: 17.50,
            generated_dir: generated_dir.into(),
            artifact_backend: ArtifactBackend::Local,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
