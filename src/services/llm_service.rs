// src/services/llm_service.rs
use crate::config::LlmSettings;
use crate::errors::HydraError;
use crate::models::*;
use crate::services::collaborators::{ImageClassifier, NarrativeGenerator};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::debug;
use reqwest::Client;
use serde_json::json;
use std::time::{Duration, Instant};

const CLASSIFY_PROMPT: &str = "Determine if the image shows (A) a close-up human tongue or \
(B) urine in a toilet bowl. Reply ONLY with JSON: \
{\"label\":\"tongue|urine|other\",\"reason\":\"short reason\"}.";

const NARRATIVE_PROMPT: &str = r#"
You are writing the text of a hydration wellness report. The JSON document
below holds objective measurements taken from a urine photo and a tongue
photo, plus a computed hydration summary. Fields may be empty when a photo
was not supplied.

Write short, friendly, non-diagnostic text grounded in the numbers, and pick
exactly one drink from "recommendedDrinks" by its "id".

Reply ONLY with JSON of this shape (omit keys you cannot fill):
{
    "hydrationSummaryLevel": 0-100,
    "hydrationSummaryStatus": "...",
    "hydrationSummaryWellnessTip": "...",
    "urineInsight": "...",
    "urineStatus": "...",
    "urineColorLevel": "...",
    "tongueInsight": "...",
    "tongueStatus": "...",
    "drinkId": "...",
    "drinkReason": "..."
}

Report:
"#;

pub struct LLMService {
    api_key: Option<String>,
    base_url: String,
    vision_model: String,
    text_model: String,
    client: Client,
}

impl LLMService {
    pub fn new(settings: &LlmSettings) -> Result<Self, HydraError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| HydraError::LLM(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            vision_model: settings.vision_model.clone(),
            text_model: settings.text_model.clone(),
            client,
        })
    }

    /// Sends one chat completion and returns the text of the first choice.
    async fn complete(
        &self,
        api_key: &str,
        body: serde_json::Value,
    ) -> Result<String, HydraError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| HydraError::LLM(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HydraError::LLM(format!("Completion error: {}", error_text)));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HydraError::LLM(format!("Failed to parse completion response: {}", e)))?;

        result["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| HydraError::LLM("No content in completion response".to_string()))
    }
}

/// Pulls the outermost JSON object out of a model reply, tolerating code fences
/// and surrounding prose.
pub fn extract_json(text: &str) -> Result<serde_json::Value, HydraError> {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&text[start..=end])
            .map_err(|e| HydraError::Serialization(format!("Invalid JSON in reply: {}", e))),
        _ => Err(HydraError::Serialization("No JSON object found".to_string())),
    }
}

pub fn parse_classification(content: &str) -> Classification {
    match extract_json(content) {
        Ok(parsed) => Classification {
            label: ScanLabel::parse(parsed["label"].as_str().unwrap_or("other")),
            reason: parsed["reason"]
                .as_str()
                .unwrap_or("Unclear image")
                .to_string(),
        },
        Err(_) => Classification {
            label: ScanLabel::Other,
            reason: "Model response was not valid JSON".to_string(),
        },
    }
}

pub fn parse_narrative(content: &str) -> Result<NarrativeOverride, HydraError> {
    let value = extract_json(content)
        .map_err(|e| HydraError::NarrativeUnavailable(e.to_string()))?;
    serde_json::from_value(value)
        .map_err(|e| HydraError::NarrativeUnavailable(format!("Non-conforming narrative: {}", e)))
}

#[async_trait]
impl ImageClassifier for LLMService {
    async fn classify(&self, image: &[u8], mime_type: &str) -> Result<Classification, HydraError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Classification {
                label: ScanLabel::Other,
                reason: "DASHSCOPE_API_KEY not set".to_string(),
            });
        };

        let base64_image = general_purpose::STANDARD.encode(image);

        let content = self
            .complete(
                api_key,
                json!({
                    "model": self.vision_model,
                    "messages": [{
                        "role": "user",
                        "content": [
                            {
                                "type": "image_url",
                                "image_url": {
                                    "url": format!("data:{};base64,{}", mime_type, base64_image)
                                }
                            },
                            {
                                "type": "text",
                                "text": CLASSIFY_PROMPT
                            }
                        ]
                    }],
                    "temperature": 0
                }),
            )
            .await?;

        Ok(parse_classification(&content))
    }
}

#[async_trait]
impl NarrativeGenerator for LLMService {
    async fn generate(&self, report: &Report) -> Result<NarrativeOverride, HydraError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            HydraError::NarrativeUnavailable("DASHSCOPE_API_KEY not set".to_string())
        })?;

        let start = Instant::now();
        let document = serde_json::to_string_pretty(report)
            .map_err(|e| HydraError::Serialization(e.to_string()))?;

        let content = self
            .complete(
                api_key,
                json!({
                    "model": self.text_model,
                    "messages": [{
                        "role": "user",
                        "content": format!("{}{}", NARRATIVE_PROMPT, document)
                    }],
                    "temperature": 0.3,
                    "response_format": { "type": "json_object" }
                }),
            )
            .await
            .map_err(|e| HydraError::NarrativeUnavailable(e.to_string()))?;

        debug!("narrative generated in {} ms", start.elapsed().as_millis());

        parse_narrative(&content)
    }
}
