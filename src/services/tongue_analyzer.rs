// src/services/tongue_analyzer.rs
use crate::errors::HydraError;
use crate::models::{BodyColor, TongueAnalysis, TongueMetrics};
use crate::services::color_corrector::ColorCorrector;
use crate::services::color_space::{self, HUE, LIGHTNESS, SATURATION, VALUE};
use crate::services::image_processor::ImageProcessor;
use crate::services::mask::Mask;
use image::RgbImage;
use log::debug;

const LOW_RED_HUE: (u8, u8) = (0, 10);
const HIGH_RED_HUE: (u8, u8) = (160, 180);
const MIN_SATURATION: u8 = 50;
const MIN_VALUE: u8 = 50;
const MIN_BRIGHTNESS: u8 = 40;
const KERNEL_SIZE: u32 = 5;
/// Saturation at or below this marks a pixel as coating.
const COATING_SATURATION: u8 = 60;

const RED_BODY_A: f64 = 35.0;
const PALE_BODY_A: f64 = 20.0;
const THICK_COATING: f64 = 50.0;
const NO_COATING: f64 = 10.0;

pub struct TongueAnalyzer;

impl TongueAnalyzer {
    pub fn analyze(data: &[u8]) -> Result<TongueAnalysis, HydraError> {
        let decoded = ImageProcessor::decode(data)?;
        Self::analyze_image(&decoded)
    }

    pub fn analyze_image(img: &RgbImage) -> Result<TongueAnalysis, HydraError> {
        let corrected = ColorCorrector::correct(img);
        let hsv = color_space::to_hsv(&corrected);

        let tongue = segment(&hsv);
        let total = tongue.count();
        if total == 0 {
            return Err(HydraError::NoTongueDetected);
        }

        let coating = Mask::from_fn(hsv.width(), hsv.height(), |x, y| {
            hsv.get_pixel(x, y)[SATURATION] <= COATING_SATURATION
        })
        .and(&tongue);
        let coating_ratio = coating.count() as f64 / total as f64 * 100.0;

        let mut body = tongue.and_not(&coating);
        if body.is_empty() {
            body = tongue.clone();
        }

        let lab = color_space::to_lab(&corrected);
        let color = color_space::masked_lab_mean(&lab, Some(&body))
            .ok_or(HydraError::NoTongueDetected)?;
        let moisture = color_space::masked_std_dev(&lab, LIGHTNESS, Some(&tongue))
            .ok_or(HydraError::NoTongueDetected)?;

        debug!(
            "tongue: {} px, coating {:.1}%, a* {:.2}, moisture {:.2}",
            total, coating_ratio, color.a, moisture
        );

        let body_color = classify_body_color(color.a);
        Ok(TongueAnalysis {
            metrics: TongueMetrics {
                body_redness_a: color_space::round_to(color.a, 2),
                body_lightness_l: color_space::round_to(color.l, 2),
                body_yellow_b: color_space::round_to(color.b, 2),
                coating_percentage: color_space::round_to(coating_ratio, 1),
                moisture_score: color_space::round_to(moisture, 2),
            },
            body_color,
            diagnosis: diagnose(body_color, coating_ratio),
        })
    }
}

/// Red-hue pixels bright enough to be tongue tissue, cleaned up and reduced
/// to the single largest region.
fn segment(hsv: &RgbImage) -> Mask {
    let in_band = |h: u8, (lo, hi): (u8, u8)| h >= lo && h <= hi;

    let raw = Mask::from_fn(hsv.width(), hsv.height(), |x, y| {
        let p = hsv.get_pixel(x, y);
        let colored = p[SATURATION] >= MIN_SATURATION && p[VALUE] >= MIN_VALUE;
        let red = in_band(p[HUE], LOW_RED_HUE) || in_band(p[HUE], HIGH_RED_HUE);
        red && colored && p[VALUE] >= MIN_BRIGHTNESS
    });

    raw.open(KERNEL_SIZE)
        .close(KERNEL_SIZE)
        .keep_largest_region()
}

pub fn classify_body_color(a_star: f64) -> BodyColor {
    if a_star > RED_BODY_A {
        BodyColor::Red
    } else if a_star < PALE_BODY_A {
        BodyColor::Pale
    } else {
        BodyColor::Normal
    }
}

/// Colour and coating tags, each rule evaluated on its own. A normal body
/// colour and a 10-50% coating produce no tag.
pub fn diagnose(body_color: BodyColor, coating_ratio: f64) -> Vec<String> {
    let mut tags = Vec::new();

    if body_color != BodyColor::Normal {
        tags.push(body_color.label().to_string());
    }

    if coating_ratio > THICK_COATING {
        tags.push("Thick Coating (Potential Dampness)".to_string());
    } else if coating_ratio < NO_COATING {
        tags.push("Peeled/No Coating (Yin Deficiency/Dry)".to_string());
    }

    tags
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::image_processor::tests::png_bytes;
    use image::Rgb;

    fn tongue_block(color: Rgb<u8>) -> RgbImage {
        RgbImage::from_fn(100, 100, |x, y| {
            if (30..70).contains(&x) && (30..70).contains(&y) {
                color
            } else {
                Rgb([120, 120, 120])
            }
        })
    }

    /// A saturated red block on a gray background.
    pub(crate) fn synthetic_tongue() -> RgbImage {
        tongue_block(Rgb([200, 60, 70]))
    }

    #[test]
    fn segments_a_red_tongue() {
        let analysis = TongueAnalyzer::analyze(&png_bytes(&synthetic_tongue())).unwrap();
        let m = &analysis.metrics;

        assert_eq!(m.coating_percentage, 0.0);
        assert_eq!(m.moisture_score, 0.0);
        assert!(m.body_redness_a > RED_BODY_A, "a* was {}", m.body_redness_a);
        assert_eq!(analysis.body_color, BodyColor::Red);
        assert_eq!(
            analysis.diagnosis,
            vec![
                "High Heat / Dehydration (Red Body)".to_string(),
                "Peeled/No Coating (Yin Deficiency/Dry)".to_string(),
            ]
        );
    }

    #[test]
    fn magenta_red_segments_through_the_upper_hue_band() {
        let analysis = TongueAnalyzer::analyze_image(&tongue_block(Rgb([210, 60, 110]))).unwrap();

        assert_eq!(analysis.metrics.coating_percentage, 0.0);
        assert_eq!(analysis.body_color, BodyColor::Red);
    }

    #[test]
    fn fully_coated_tongue_samples_body_from_whole_tongue() {
        // saturation lands just above the segmentation floor but inside the
        // coating band, so every tongue pixel counts as coating
        let analysis = TongueAnalyzer::analyze_image(&tongue_block(Rgb([200, 146, 146]))).unwrap();
        let m = &analysis.metrics;

        assert_eq!(m.coating_percentage, 100.0);
        assert!(m.body_redness_a > 0.0 && m.body_redness_a < PALE_BODY_A, "a* was {}", m.body_redness_a);
        assert!(m.body_lightness_l > 0.0);
        assert_eq!(
            analysis.diagnosis,
            vec![
                "Cold / Dampness (Pale Body)".to_string(),
                "Thick Coating (Potential Dampness)".to_string(),
            ]
        );
    }

    #[test]
    fn stray_red_specks_are_ignored() {
        let mut img = synthetic_tongue();
        // a 3x3 speck far from the tongue is removed by the opening
        for y in 5..8 {
            for x in 5..8 {
                img.put_pixel(x, y, Rgb([200, 60, 70]));
            }
        }
        let with_speck = TongueAnalyzer::analyze_image(&img).unwrap();
        assert!(with_speck.metrics.body_redness_a > RED_BODY_A);
        assert_eq!(with_speck.metrics.moisture_score, 0.0);
    }

    #[test]
    fn identical_bytes_give_identical_metrics() {
        let bytes = png_bytes(&synthetic_tongue());
        let first = TongueAnalyzer::analyze(&bytes).unwrap();
        let second = TongueAnalyzer::analyze(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn black_image_has_no_tongue() {
        let bytes = png_bytes(&RgbImage::from_pixel(40, 40, Rgb([0, 0, 0])));
        assert!(matches!(
            TongueAnalyzer::analyze(&bytes),
            Err(HydraError::NoTongueDetected)
        ));
    }

    #[test]
    fn bright_uniform_image_has_no_tongue() {
        let bytes = png_bytes(&RgbImage::from_pixel(40, 40, Rgb([250, 250, 250])));
        assert!(matches!(
            TongueAnalyzer::analyze(&bytes),
            Err(HydraError::NoTongueDetected)
        ));
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(matches!(
            TongueAnalyzer::analyze(&[0x89, 0x50, 0x4e, 0x47, 0x00]),
            Err(HydraError::Decode(_))
        ));
    }

    #[test]
    fn color_rule_bands() {
        assert_eq!(classify_body_color(35.5), BodyColor::Red);
        assert_eq!(classify_body_color(35.0), BodyColor::Normal);
        assert_eq!(classify_body_color(20.0), BodyColor::Normal);
        assert_eq!(classify_body_color(19.9), BodyColor::Pale);
    }

    #[test]
    fn diagnosis_emits_zero_to_two_tags() {
        assert!(diagnose(BodyColor::Normal, 30.0).is_empty());
        assert_eq!(
            diagnose(BodyColor::Pale, 75.0),
            vec![
                "Cold / Dampness (Pale Body)".to_string(),
                "Thick Coating (Potential Dampness)".to_string(),
            ]
        );
        assert_eq!(
            diagnose(BodyColor::Normal, 50.0),
            Vec::<String>::new()
        );
        assert_eq!(
            diagnose(BodyColor::Normal, 9.9),
            vec!["Peeled/No Coating (Yin Deficiency/Dry)".to_string()]
        );
    }
}
