// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HydraError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("No tongue detected. Check lighting/focus.")]
    NoTongueDetected,

    #[error("Urine region of interest is empty")]
    EmptyRegion,

    #[error("Narrative unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("LLM service error: {0}")]
    LLM(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for HydraError {
    fn error_response(&self) -> HttpResponse {
        let body = |error: &str| {
            serde_json::json!({
                "error": error,
                "message": self.to_string()
            })
        };

        match self {
            HydraError::Decode(_) | HydraError::Validation(_) => {
                HttpResponse::BadRequest().json(body("Invalid input"))
            }
            HydraError::NoTongueDetected | HydraError::EmptyRegion => {
                HttpResponse::UnprocessableEntity().json(body("Image analysis error"))
            }
            HydraError::NarrativeUnavailable(_) | HydraError::LLM(_) => {
                HttpResponse::ServiceUnavailable().json(body("AI service error"))
            }
            HydraError::Forbidden(_) => HttpResponse::Forbidden().json(body("Access denied")),
            HydraError::NotFound(_) => HttpResponse::NotFound().json(body("Not found")),
            HydraError::Redis(_) | HydraError::Storage(_) => {
                HttpResponse::InternalServerError().json(body("Storage error"))
            }
            HydraError::Serialization(_) | HydraError::Internal(_) => {
                HttpResponse::InternalServerError().json(body("Data processing error"))
            }
        }
    }
}
