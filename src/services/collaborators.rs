// src/services/collaborators.rs
// Seams to the hosted models and object storage.
use crate::errors::HydraError;
use crate::models::{Classification, NarrativeOverride, Report};
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Produces override fields for a computed report. Best-effort: callers
    /// fall back to the computed values on any error.
    async fn generate(&self, report: &Report) -> Result<NarrativeOverride, HydraError>;
}

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &[u8], mime_type: &str) -> Result<Classification, HydraError>;
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), HydraError>;

    async fn get(&self, key: &str) -> Result<StoredBlob, HydraError>;

    async fn sign_url(&self, key: &str) -> Result<String, HydraError>;
}
