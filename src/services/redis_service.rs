// src/services/redis_service.rs
use crate::config::{RedisSettings, StorageSettings};
use crate::errors::HydraError;
use crate::services::collaborators::{BlobStore, StoredBlob};
use crate::services::url_signer::UrlSigner;
use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, Client};
use std::sync::Arc;

pub struct RedisBlobStore {
    client: Client,
    ttl_secs: usize,
    public_base_url: Option<String>,
    signed_url_ttl_secs: i64,
    signer: Arc<UrlSigner>,
}

impl RedisBlobStore {
    pub async fn new(
        redis: &RedisSettings,
        storage: &StorageSettings,
        signer: Arc<UrlSigner>,
    ) -> Result<Self, HydraError> {
        let client = Client::open(redis.url.as_str()).map_err(|e| HydraError::Redis(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        Ok(Self {
            client,
            ttl_secs: redis.blob_ttl_secs,
            public_base_url: storage.public_base_url.clone(),
            signed_url_ttl_secs: storage.signed_url_ttl_secs,
            signer,
        })
    }
}

fn data_key(key: &str) -> String {
    format!("blob:{}", key)
}

fn content_type_key(key: &str) -> String {
    format!("blob:{}:content_type", key)
}

/// `{base}/api/v1/blobs/{key}?expires={unix seconds}&sig={signature}`
pub fn signed_blob_url(base_url: &str, key: &str, expires_at: i64, signature: &str) -> String {
    format!(
        "{}/api/v1/blobs/{}?expires={}&sig={}",
        base_url.trim_end_matches('/'),
        key,
        expires_at,
        signature
    )
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), HydraError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        conn.set_ex::<_, _, ()>(data_key(key), data.as_ref(), self.ttl_secs)
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        conn.set_ex::<_, _, ()>(content_type_key(key), content_type, self.ttl_secs)
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, HydraError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        let data: Option<Vec<u8>> = conn
            .get(data_key(key))
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;
        let data = data.ok_or_else(|| HydraError::NotFound(key.to_string()))?;

        let content_type: Option<String> = conn
            .get(content_type_key(key))
            .await
            .map_err(|e| HydraError::Redis(e.to_string()))?;

        Ok(StoredBlob {
            data: Bytes::from(data),
            content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }

    async fn sign_url(&self, key: &str) -> Result<String, HydraError> {
        let base = self
            .public_base_url
            .as_deref()
            .ok_or_else(|| HydraError::Storage("STORAGE_PUBLIC_BASE_URL not configured".to_string()))?;

        let key = key.trim_start_matches('/');
        let expires_at = chrono::Utc::now().timestamp() + self.signed_url_ttl_secs;
        let signature = self.signer.sign(key, expires_at)?;
        Ok(signed_blob_url(base, key, expires_at, &signature))
    }
}
