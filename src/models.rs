// src/models.rs
use serde::{Deserialize, Serialize};

/// Perceptual colour statistics in standard Lab ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorMetrics {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TongueMetrics {
    pub body_redness_a: f64,
    #[serde(rename = "body_lightness_L")]
    pub body_lightness_l: f64,
    pub body_yellow_b: f64,
    pub coating_percentage: f64,
    pub moisture_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrineMetrics {
    #[serde(rename = "L_star")]
    pub l_star: f64,
    pub a_star: f64,
    pub b_star: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsgPrediction {
    #[serde(rename = "< 1.020")]
    BelowNormal,
    #[serde(rename = ">= 1.020")]
    AtOrAboveNormal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub hydration_status: String,
    pub risk_level: String,
    pub estimated_armstrong_grade: u8,
    pub predicted_usg_threshold: UsgPrediction,
}

/// Body colour class of a tongue, before it becomes a diagnosis tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyColor {
    Red,
    Pale,
    Normal,
}

impl BodyColor {
    pub fn label(&self) -> &'static str {
        match self {
            BodyColor::Red => "High Heat / Dehydration (Red Body)",
            BodyColor::Pale => "Cold / Dampness (Pale Body)",
            BodyColor::Normal => "Normal Color",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TongueAnalysis {
    pub metrics: TongueMetrics,
    pub body_color: BodyColor,
    pub diagnosis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrineAnalysis {
    pub metrics: UrineMetrics,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationSummary {
    pub level: Option<u8>,
    pub status: String,
    pub wellness_tip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrineSection {
    pub status: String,
    pub color_level: String,
    pub insight: String,
    /// Quantitative summary; folded into `insight` once a narrative is applied.
    pub analysis: String,
    pub metrics: Option<UrineMetrics>,
    pub analysis_data: Option<AnalysisResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TongueSection {
    pub status: String,
    pub insight: String,
    pub metrics: Option<TongueMetrics>,
    pub diagnosis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drink {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub benefit: String,
    pub img: String,
    pub is_best: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub test_date: String,
    pub user_profile: UserProfile,
    pub hydration_summary: HydrationSummary,
    pub urine_analysis: UrineSection,
    pub tongue_analysis: TongueSection,
    pub recommended_drinks: Vec<Drink>,
}

/// Fields a narrative generator may supply to override computed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrativeOverride {
    pub hydration_summary_level: Option<f64>,
    pub hydration_summary_status: Option<String>,
    pub hydration_summary_wellness_tip: Option<String>,
    pub urine_insight: Option<String>,
    pub urine_status: Option<String>,
    pub urine_color_level: Option<String>,
    pub tongue_insight: Option<String>,
    pub tongue_status: Option<String>,
    pub drink_id: Option<String>,
    pub drink_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanLabel {
    Tongue,
    Urine,
    Other,
}

impl ScanLabel {
    /// Parses a label case-insensitively; anything unknown becomes `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tongue" => ScanLabel::Tongue,
            "urine" => ScanLabel::Urine,
            _ => ScanLabel::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: ScanLabel,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub accepted: bool,
    pub label: ScanLabel,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_document_field_names() {
        let report = Report {
            test_date: "Oct 17, 2026".to_string(),
            user_profile: UserProfile::default(),
            hydration_summary: HydrationSummary::default(),
            urine_analysis: UrineSection {
                metrics: Some(UrineMetrics {
                    l_star: 80.0,
                    a_star: 1.5,
                    b_star: 15.0,
                }),
                ..Default::default()
            },
            tongue_analysis: TongueSection::default(),
            recommended_drinks: vec![],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["testDate"], "Oct 17, 2026");
        assert!(value["hydrationSummary"]["level"].is_null());
        assert_eq!(value["urineAnalysis"]["metrics"]["L_star"], 80.0);
        assert_eq!(value["urineAnalysis"]["colorLevel"], "");
        assert!(value["tongueAnalysis"]["metrics"].is_null());
    }

    #[test]
    fn narrative_override_tolerates_missing_keys() {
        let parsed: NarrativeOverride =
            serde_json::from_str(r#"{"drinkId": "zero", "urineStatus": "Concentrated"}"#).unwrap();
        assert_eq!(parsed.drink_id.as_deref(), Some("zero"));
        assert_eq!(parsed.urine_status.as_deref(), Some("Concentrated"));
        assert!(parsed.hydration_summary_level.is_none());
    }

    #[test]
    fn usg_prediction_uses_threshold_labels() {
        let json = serde_json::to_string(&UsgPrediction::BelowNormal).unwrap();
        assert_eq!(json, "\"< 1.020\"");
        let json = serde_json::to_string(&UsgPrediction::AtOrAboveNormal).unwrap();
        assert_eq!(json, "\">= 1.020\"");
    }

    #[test]
    fn unknown_scan_labels_become_other() {
        assert_eq!(ScanLabel::parse(" Tongue "), ScanLabel::Tongue);
        assert_eq!(ScanLabel::parse("URINE"), ScanLabel::Urine);
        assert_eq!(ScanLabel::parse("cat"), ScanLabel::Other);
    }
}
