// src/services/mod.rs
pub mod collaborators;
pub mod color_corrector;
pub mod color_space;
pub mod image_processor;
pub mod llm_service;
pub mod mask;
pub mod redis_service;
pub mod report_aggregator;
pub mod tongue_analyzer;
pub mod urine_analyzer;
pub mod url_signer;

pub use collaborators::{BlobStore, ImageClassifier, NarrativeGenerator};
pub use image_processor::ImageProcessor;
pub use llm_service::LLMService;
pub use redis_service::RedisBlobStore;
pub use report_aggregator::ReportAggregator;
pub use url_signer::UrlSigner;
