// src/services/report_aggregator.rs
//! Fuses urine and tongue analyses into one hydration report.
//!
//! Each analyzer runs on the blocking pool and either yields a section or an
//! explicit absence; the composite score needs both. A narrative generator may
//! then overwrite the text fields, and finally a single drink is kept.

use crate::errors::HydraError;
use crate::models::*;
use crate::services::collaborators::{BlobStore, NarrativeGenerator};
use crate::services::tongue_analyzer::TongueAnalyzer;
use crate::services::urine_analyzer::{UrineAnalyzer, lookup};
use bytes::Bytes;
use futures_util::future::join_all;
use log::{info, warn};
use std::sync::Arc;

struct DrinkCandidate {
    id: &'static str,
    name: &'static str,
    desc: &'static str,
    benefit: &'static str,
    file: &'static str,
}

const DRINK_CANDIDATES: [DrinkCandidate; 3] = [
    DrinkCandidate {
        id: "regular",
        name: "Mizone Regular",
        desc: "Balanced hydration for daily use.",
        benefit: "Balanced",
        file: "regular.png",
    },
    DrinkCandidate {
        id: "zero",
        name: "Mizone Zero",
        desc: "Zero carbohydrates with light hydration.",
        benefit: "No Carbohydrate",
        file: "zero.png",
    },
    DrinkCandidate {
        id: "electrolyte",
        name: "Mizone Electrolyte",
        desc: "Added electrolytes for recovery.",
        benefit: "Electrolytes",
        file: "electrolyte.png",
    },
];

/// Upper b* bound (exclusive) -> urine colour label.
const COLOR_LEVELS: [(f64, &str); 5] = [
    (10.0, "Very Pale"),
    (20.0, "Pale Yellow"),
    (30.0, "Light Yellow"),
    (40.0, "Yellow"),
    (50.0, "Dark Yellow"),
];
const COLOR_LEVEL_FALLBACK: &str = "Amber";

const URINE_WEIGHT: f64 = 0.55;
const MOISTURE_WEIGHT: f64 = 0.25;
const COATING_WEIGHT: f64 = 0.12;
const REDNESS_WEIGHT: f64 = 0.08;

const TIP_GOOD: &str =
    "Hydration looks good\u{2014}maintain your current intake and spread fluids evenly.";
const TIP_URINE: &str =
    "Urine color looks concentrated\u{2014}sip 250-500ml of water over the next hour.";
const TIP_DRYNESS: &str =
    "Tongue signs suggest dryness\u{2014}sip fluids regularly and avoid long gaps.";
const TIP_HEAT: &str =
    "Tongue redness suggests heat\u{2014}prefer cool fluids and lighter meals today.";

#[derive(Debug)]
pub enum AbsenceReason {
    NotSupplied,
    Failed(HydraError),
}

#[derive(Debug)]
pub enum SectionOutcome<T> {
    Present(T),
    Absent(AbsenceReason),
}

impl<T> SectionOutcome<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            SectionOutcome::Present(value) => Some(value),
            SectionOutcome::Absent(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum NarrativeOutcome {
    Applied,
    NotConfigured,
    Failed(HydraError),
}

#[derive(Debug)]
pub struct ReportBuild {
    pub report: Report,
    pub urine: SectionOutcome<UrineAnalysis>,
    pub tongue: SectionOutcome<TongueAnalysis>,
    pub narrative: NarrativeOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Urine,
    Moisture,
    Coating,
    Redness,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HydrationScore {
    pub dehydration: f64,
    pub level: u8,
    pub dominant: Driver,
}

pub struct ReportAggregator {
    blob_store: Arc<dyn BlobStore>,
    narrative: Option<Arc<dyn NarrativeGenerator>>,
    asset_base_url: Option<String>,
}

impl ReportAggregator {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        narrative: Option<Arc<dyn NarrativeGenerator>>,
        asset_base_url: Option<String>,
    ) -> Self {
        Self {
            blob_store,
            narrative,
            asset_base_url,
        }
    }

    pub async fn build(
        &self,
        urine: Option<Bytes>,
        tongue: Option<Bytes>,
        profile: UserProfile,
        test_date: Option<String>,
    ) -> ReportBuild {
        let (base, urine, tongue) = tokio::join!(
            self.base_report(profile, test_date),
            run_analyzer(urine, UrineAnalyzer::analyze),
            run_analyzer(tongue, TongueAnalyzer::analyze),
        );

        let mut report = with_tongue(with_urine(base, urine.present()), tongue.present());
        if let Some(summary) = hydration_summary(
            report.urine_analysis.metrics.as_ref(),
            report.tongue_analysis.metrics.as_ref(),
        ) {
            report.hydration_summary = summary;
        }

        let (overlay, narrative) = match &self.narrative {
            None => (None, NarrativeOutcome::NotConfigured),
            Some(generator) => match generator.generate(&report).await {
                Ok(overlay) => (Some(overlay), NarrativeOutcome::Applied),
                Err(e) => {
                    warn!("Narrative unavailable, keeping computed values: {}", e);
                    (None, NarrativeOutcome::Failed(e))
                }
            },
        };

        let report = finalize_drinks(merge_narrative(report, overlay.as_ref()), overlay.as_ref());

        info!(
            "Report built: urine={}, tongue={}, level={:?}",
            urine.present().is_some(),
            tongue.present().is_some(),
            report.hydration_summary.level
        );

        ReportBuild {
            report,
            urine,
            tongue,
            narrative,
        }
    }

    async fn base_report(&self, profile: UserProfile, test_date: Option<String>) -> Report {
        let urls = join_all(DRINK_CANDIDATES.iter().map(|d| self.drink_url(d.file))).await;

        let recommended_drinks = DRINK_CANDIDATES
            .iter()
            .zip(urls)
            .map(|(d, img)| Drink {
                id: d.id.to_string(),
                name: d.name.to_string(),
                desc: d.desc.to_string(),
                benefit: d.benefit.to_string(),
                img,
                is_best: false,
                reason: String::new(),
            })
            .collect();

        Report {
            test_date: test_date
                .unwrap_or_else(|| chrono::Local::now().format("%b %d, %Y").to_string()),
            user_profile: profile,
            hydration_summary: HydrationSummary::default(),
            urine_analysis: UrineSection::default(),
            tongue_analysis: TongueSection::default(),
            recommended_drinks,
        }
    }

    async fn drink_url(&self, file: &str) -> String {
        let key = format!("drinks/{}", file);
        match self.blob_store.sign_url(&key).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not sign {}: {}", key, e);
                public_url(self.asset_base_url.as_deref(), &key)
            }
        }
    }
}

pub fn public_url(asset_base_url: Option<&str>, key: &str) -> String {
    match asset_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("/{}", key),
    }
}

async fn run_analyzer<T: Send + 'static>(
    data: Option<Bytes>,
    analyze: fn(&[u8]) -> Result<T, HydraError>,
) -> SectionOutcome<T> {
    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return SectionOutcome::Absent(AbsenceReason::NotSupplied);
    };

    let result = tokio::task::spawn_blocking(move || analyze(&data))
        .await
        .map_err(|e| HydraError::Internal(format!("Analysis task failed: {}", e)))
        .and_then(|r| r);

    match result {
        Ok(value) => SectionOutcome::Present(value),
        Err(e) => {
            warn!("Section left empty: {}", e);
            SectionOutcome::Absent(AbsenceReason::Failed(e))
        }
    }
}

pub fn color_level(b_star: f64) -> &'static str {
    lookup(&COLOR_LEVELS, COLOR_LEVEL_FALLBACK, b_star)
}

pub fn quantitative_summary(metrics: &UrineMetrics, risk_level: &str) -> String {
    format!(
        "L* {:?}, a* {:?}, b* {:?} indicate {} dehydration risk.",
        metrics.l_star,
        metrics.a_star,
        metrics.b_star,
        risk_level.to_lowercase()
    )
}

pub fn with_urine(mut report: Report, analysis: Option<&UrineAnalysis>) -> Report {
    let Some(analysis) = analysis else {
        return report;
    };

    let section = &mut report.urine_analysis;
    section.status = analysis.result.hydration_status.clone();
    section.color_level = color_level(analysis.metrics.b_star).to_string();
    section.insight = format!(
        "Armstrong Grade {}",
        analysis.result.estimated_armstrong_grade
    );
    section.analysis = quantitative_summary(&analysis.metrics, &analysis.result.risk_level);
    section.metrics = Some(analysis.metrics.clone());
    section.analysis_data = Some(analysis.result.clone());
    report
}

pub fn with_tongue(mut report: Report, analysis: Option<&TongueAnalysis>) -> Report {
    let Some(analysis) = analysis else {
        return report;
    };

    let section = &mut report.tongue_analysis;
    section.status = analysis.body_color.label().to_string();
    section.metrics = Some(analysis.metrics.clone());
    section.diagnosis = analysis.diagnosis.clone();
    report
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub fn hydration_score(b_star: f64, moisture: f64, coating: f64, redness: f64) -> HydrationScore {
    let scores = [
        (Driver::Urine, clamp01((b_star - 5.0) / 45.0)),
        (Driver::Moisture, clamp01((12.0 - moisture) / 8.0)),
        (Driver::Coating, clamp01((20.0 - coating) / 30.0)),
        (Driver::Redness, clamp01((redness - 20.0) / 20.0)),
    ];
    let weights = [URINE_WEIGHT, MOISTURE_WEIGHT, COATING_WEIGHT, REDNESS_WEIGHT];

    let dehydration: f64 = scores.iter().zip(weights).map(|((_, s), w)| s * w).sum();

    // earliest driver wins a tie
    let dominant = scores
        .iter()
        .fold(scores[0], |best, s| if s.1 > best.1 { *s } else { best })
        .0;

    HydrationScore {
        dehydration,
        level: (100.0 * (1.0 - dehydration)).round().clamp(0.0, 100.0) as u8,
        dominant,
    }
}

pub fn hydration_status(level: u8) -> &'static str {
    match level {
        80.. => "Well Hydrated",
        60.. => "Mildly Dehydrated",
        40.. => "Moderately Dehydrated",
        _ => "Severely Dehydrated",
    }
}

pub fn wellness_tip(score: &HydrationScore) -> &'static str {
    if score.dehydration < 0.2 {
        return TIP_GOOD;
    }
    match score.dominant {
        Driver::Urine => TIP_URINE,
        Driver::Moisture | Driver::Coating => TIP_DRYNESS,
        Driver::Redness => TIP_HEAT,
    }
}

/// The composite summary, available only when urine b*, tongue moisture,
/// coating and redness are all known.
pub fn hydration_summary(
    urine: Option<&UrineMetrics>,
    tongue: Option<&TongueMetrics>,
) -> Option<HydrationSummary> {
    let (urine, tongue) = (urine?, tongue?);
    let score = hydration_score(
        urine.b_star,
        tongue.moisture_score,
        tongue.coating_percentage,
        tongue.body_redness_a,
    );

    Some(HydrationSummary {
        level: Some(score.level),
        status: hydration_status(score.level).to_string(),
        wellness_tip: wellness_tip(&score).to_string(),
    })
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|v| !v.trim().is_empty())
}

/// Overlays narrative text on a computed report. Without an overlay the
/// report is returned untouched.
pub fn merge_narrative(mut report: Report, overlay: Option<&NarrativeOverride>) -> Report {
    let Some(overlay) = overlay else {
        return report;
    };

    let summary = &mut report.hydration_summary;
    if let Some(level) = overlay.hydration_summary_level {
        summary.level = Some(level.round().clamp(0.0, 100.0) as u8);
    }
    if let Some(status) = non_empty(&overlay.hydration_summary_status) {
        summary.status = status.clone();
    }
    if let Some(tip) = non_empty(&overlay.hydration_summary_wellness_tip) {
        summary.wellness_tip = tip.clone();
    }

    let urine = &mut report.urine_analysis;
    if let Some(insight) = &overlay.urine_insight {
        urine.insight = insight.clone();
    }
    if let Some(status) = &overlay.urine_status {
        urine.status = status.clone();
    }
    if let Some(level) = &overlay.urine_color_level {
        urine.color_level = level.clone();
    }
    if !urine.analysis.is_empty() && !urine.insight.contains(&urine.analysis) {
        urine.insight = format!("{} {}", urine.insight, urine.analysis)
            .trim()
            .to_string();
    }
    urine.analysis.clear();

    let tongue = &mut report.tongue_analysis;
    if let Some(insight) = &overlay.tongue_insight {
        tongue.insight = insight.clone();
    }
    if let Some(status) = &overlay.tongue_status {
        tongue.status = status.clone();
    }

    report
}

/// Marks the chosen drink (the first candidate when none was chosen) and
/// drops every other candidate.
pub fn finalize_drinks(mut report: Report, overlay: Option<&NarrativeOverride>) -> Report {
    let selected = overlay.and_then(|o| non_empty(&o.drink_id));
    let reason = overlay.and_then(|o| non_empty(&o.drink_reason));

    if let Some(selected) = selected {
        for drink in report.recommended_drinks.iter_mut() {
            drink.is_best = &drink.id == selected;
            if drink.is_best {
                if let Some(reason) = reason {
                    drink.reason = reason.clone();
                }
            }
        }
    }

    if !report.recommended_drinks.iter().any(|d| d.is_best) {
        if let Some(first) = report.recommended_drinks.first_mut() {
            first.is_best = true;
        }
    }

    report.recommended_drinks.retain(|d| d.is_best);
    report
}
