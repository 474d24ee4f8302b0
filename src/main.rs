// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::Settings;
use crate::handlers::{create_report, get_blob, get_report, validate_image};
use crate::services::{
    BlobStore, ImageClassifier, ImageProcessor, LLMService, NarrativeGenerator, RedisBlobStore,
    ReportAggregator, UrlSigner,
};

#[derive(Clone)]
pub struct AppState {
    blob_store: Arc<dyn BlobStore>,
    classifier: Arc<dyn ImageClassifier>,
    aggregator: Arc<ReportAggregator>,
    image_processor: Arc<ImageProcessor>,
    url_signer: Arc<UrlSigner>,
    max_upload_bytes: usize,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting HydraScan service...");

    let settings = Settings::from_env().context("invalid configuration")?;

    let signing_secret = match settings.storage.signing_secret.clone() {
        Some(secret) => secret,
        None => {
            warn!("STORAGE_SIGNING_SECRET not set; blob links expire on restart");
            format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
        }
    };
    let url_signer = Arc::new(UrlSigner::new(signing_secret));

    // Initialize services
    let blob_store: Arc<dyn BlobStore> = Arc::new(
        RedisBlobStore::new(&settings.redis, &settings.storage, url_signer.clone())
            .await
            .context("failed to connect to Redis")?,
    );
    let llm_service = Arc::new(LLMService::new(&settings.llm)?);
    if settings.llm.api_key.is_none() {
        warn!("DASHSCOPE_API_KEY not set; classification and narratives are disabled");
    }

    let narrative: Arc<dyn NarrativeGenerator> = llm_service.clone();
    let aggregator = Arc::new(ReportAggregator::new(
        blob_store.clone(),
        Some(narrative),
        settings.storage.asset_base_url.clone(),
    ));

    let app_state = AppState {
        blob_store,
        classifier: llm_service,
        aggregator,
        image_processor: Arc::new(ImageProcessor::new(settings.uploads.max_upload_bytes)),
        url_signer,
        max_upload_bytes: settings.uploads.max_upload_bytes,
    };

    let bind = (settings.server.host.clone(), settings.server.port);
    info!("Starting HTTP server on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/validate-image", web::post().to(validate_image))
                    .route("/reports", web::post().to(create_report))
                    .route("/reports/{report_id}", web::get().to(get_report))
                    .route("/blobs/{key:.*}", web::get().to(get_blob)),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "hydrascan",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
