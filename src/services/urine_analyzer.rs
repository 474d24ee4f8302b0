// src/services/urine_analyzer.rs
use crate::errors::HydraError;
use crate::models::{AnalysisResult, UrineAnalysis, UrineMetrics, UsgPrediction};
use crate::services::color_corrector::ColorCorrector;
use crate::services::color_space;
use crate::services::image_processor::ImageProcessor;
use image::{RgbImage, imageops};
use log::debug;

/// Gaussian sigma matching a 5x5 kernel.
const BLUR_SIGMA: f32 = 1.1;

/// Upper b* bound (exclusive) -> (hydration status, risk level).
const HYDRATION_BANDS: [(f64, (&str, &str)); 3] = [
    (20.0, ("Well Hydrated", "Low")),
    (30.0, ("Mild Dehydration", "Moderate")),
    (45.0, ("Significant Dehydration", "High")),
];
const HYDRATION_FALLBACK: (&str, &str) = ("Severe Dehydration", "Critical");

/// Upper b* bound (exclusive) -> Armstrong grade.
const ARMSTRONG_BANDS: [(f64, u8); 6] = [
    (10.0, 1),
    (15.0, 2),
    (20.0, 3),
    (30.0, 4),
    (40.0, 5),
    (50.0, 6),
];
const ARMSTRONG_FALLBACK: u8 = 7;

/// b* below which specific gravity is predicted under 1.020.
const USG_CUT: f64 = 22.6;

/// First entry whose bound exceeds `value`, else `fallback`.
pub(crate) fn lookup<T: Copy>(table: &[(f64, T)], fallback: T, value: f64) -> T {
    table
        .iter()
        .find(|(bound, _)| value < *bound)
        .map(|(_, v)| *v)
        .unwrap_or(fallback)
}

pub fn hydration_band(b_star: f64) -> (&'static str, &'static str) {
    lookup(&HYDRATION_BANDS, HYDRATION_FALLBACK, b_star)
}

pub fn armstrong_grade(b_star: f64) -> u8 {
    lookup(&ARMSTRONG_BANDS, ARMSTRONG_FALLBACK, b_star)
}

pub fn usg_prediction(b_star: f64) -> UsgPrediction {
    if b_star < USG_CUT {
        UsgPrediction::BelowNormal
    } else {
        UsgPrediction::AtOrAboveNormal
    }
}

pub fn interpret(b_star: f64) -> AnalysisResult {
    let (status, risk) = hydration_band(b_star);
    AnalysisResult {
        hydration_status: status.to_string(),
        risk_level: risk.to_string(),
        estimated_armstrong_grade: armstrong_grade(b_star),
        predicted_usg_threshold: usg_prediction(b_star),
    }
}

pub struct UrineAnalyzer;

impl UrineAnalyzer {
    pub fn analyze(data: &[u8]) -> Result<UrineAnalysis, HydraError> {
        let decoded = ImageProcessor::decode(data)?;
        Self::analyze_image(&decoded)
    }

    pub fn analyze_image(img: &RgbImage) -> Result<UrineAnalysis, HydraError> {
        let corrected = ColorCorrector::correct(img);
        let roi = central_roi(&corrected)?;

        let blurred = imageops::blur(&roi, BLUR_SIGMA);
        let lab = color_space::to_lab(&blurred);
        let color = color_space::masked_lab_mean(&lab, None).ok_or(HydraError::EmptyRegion)?;

        debug!(
            "urine roi {}x{}: L* {:.2}, a* {:.2}, b* {:.2}",
            roi.width(),
            roi.height(),
            color.l,
            color.a,
            color.b
        );

        Ok(UrineAnalysis {
            metrics: UrineMetrics {
                l_star: color_space::round_to(color.l, 2),
                a_star: color_space::round_to(color.a, 2),
                b_star: color_space::round_to(color.b, 2),
            },
            result: interpret(color.b),
        })
    }
}

/// The block spanning a fifth of each dimension on either side of centre.
fn central_roi(img: &RgbImage) -> Result<RgbImage, HydraError> {
    let (w, h) = img.dimensions();
    let (cx, cy) = (w / 2, h / 2);
    let (half_w, half_h) = (w / 5, h / 5);

    if half_w == 0 || half_h == 0 {
        return Err(HydraError::EmptyRegion);
    }

    Ok(imageops::crop_imm(img, cx - half_w, cy - half_h, 2 * half_w, 2 * half_h).to_image())
}
