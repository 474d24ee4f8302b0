// src/config.rs
//! Environment-based configuration.

use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid number format in environment variable {0}")]
    ParseError(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    /// Expiry applied to every stored blob, in seconds.
    pub blob_ttl_secs: usize,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Base URL the service is reachable at. Without it URLs cannot be signed.
    pub public_base_url: Option<String>,
    pub signed_url_ttl_secs: i64,
    /// Base for the unsigned public-URL fallback.
    pub asset_base_url: Option<String>,
    /// HMAC key for blob links. A random key is used when unset, so links
    /// do not survive a restart.
    pub signing_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub redis: RedisSettings,
    pub storage: StorageSettings,
    pub llm: LlmSettings,
    pub uploads: UploadSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            server: ServerSettings {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
                port: parse_var("SERVER_PORT", 8080)?,
            },
            redis: RedisSettings {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
                blob_ttl_secs: parse_var("BLOB_TTL_SECS", 7 * 24 * 3600)?,
            },
            storage: StorageSettings {
                public_base_url: non_empty_var("STORAGE_PUBLIC_BASE_URL"),
                signed_url_ttl_secs: parse_var("SIGNED_URL_TTL_SECS", 3600)?,
                asset_base_url: non_empty_var("ASSET_BASE_URL"),
                signing_secret: env::var("STORAGE_SIGNING_SECRET")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            },
            llm: LlmSettings {
                api_key: non_empty_var("DASHSCOPE_API_KEY"),
                base_url: env::var("LLM_BASE_URL").unwrap_or_else(|_| {
                    "https://dashscope.aliyuncs.com/compatible-mode/v1".into()
                }),
                vision_model: env::var("LLM_VISION_MODEL")
                    .unwrap_or_else(|_| "qwen-vl-plus".into()),
                text_model: env::var("LLM_TEXT_MODEL").unwrap_or_else(|_| "qwen-plus".into()),
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", 30)?,
            },
            uploads: UploadSettings {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, SettingsError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::ParseError(name)),
        Err(_) => Ok(default),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}
