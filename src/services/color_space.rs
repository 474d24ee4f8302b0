// src/services/color_space.rs
//! 8-bit encodings of HSV and Lab plus masked channel statistics.
//!
//! Both encodings reuse `RgbImage` as a plain three-channel byte grid:
//! HSV stores hue in `[0, 180]` (degrees halved) with saturation and value in
//! `[0, 255]`; Lab stores `L * 255 / 100`, `a + 128`, `b + 128`.

use crate::models::ColorMetrics;
use crate::services::mask::Mask;
use image::{Rgb, RgbImage};
use palette::{FromColor, Hsv, Lab, Srgb};

pub const HUE: usize = 0;
pub const SATURATION: usize = 1;
pub const VALUE: usize = 2;

pub const LIGHTNESS: usize = 0;

fn to_byte(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn srgb(p: &Rgb<u8>) -> Srgb<f32> {
    Srgb::new(p[0], p[1], p[2]).into_format::<f32>()
}

pub fn encode_hsv_pixel(p: &Rgb<u8>) -> Rgb<u8> {
    let hsv: Hsv = Hsv::from_color(srgb(p));
    Rgb([
        to_byte(hsv.hue.into_positive_degrees() / 2.0),
        to_byte(hsv.saturation * 255.0),
        to_byte(hsv.value * 255.0),
    ])
}

pub fn encode_lab_pixel(p: &Rgb<u8>) -> Rgb<u8> {
    let lab: Lab = Lab::from_color(srgb(p).into_linear());
    Rgb([
        to_byte(lab.l * 255.0 / 100.0),
        to_byte(lab.a + 128.0),
        to_byte(lab.b + 128.0),
    ])
}

pub fn to_hsv(img: &RgbImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        encode_hsv_pixel(img.get_pixel(x, y))
    })
}

pub fn to_lab(img: &RgbImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        encode_lab_pixel(img.get_pixel(x, y))
    })
}

/// Mean of one channel over the selected pixels, or over every pixel when
/// `mask` is `None`. Returns `None` when nothing is selected.
pub fn masked_mean(img: &RgbImage, channel: usize, mask: Option<&Mask>) -> Option<f64> {
    let (sum, count) = selected(img, mask).fold((0.0, 0usize), |(sum, count), p| {
        (sum + p[channel] as f64, count + 1)
    });
    (count > 0).then(|| sum / count as f64)
}

/// Population standard deviation of one channel over the selected pixels.
pub fn masked_std_dev(img: &RgbImage, channel: usize, mask: Option<&Mask>) -> Option<f64> {
    let mean = masked_mean(img, channel, mask)?;
    let (sq_sum, count) = selected(img, mask).fold((0.0, 0usize), |(acc, count), p| {
        let d = p[channel] as f64 - mean;
        (acc + d * d, count + 1)
    });
    Some((sq_sum / count as f64).sqrt())
}

/// Mean Lab colour of an encoded Lab buffer, rescaled to standard ranges.
pub fn masked_lab_mean(lab: &RgbImage, mask: Option<&Mask>) -> Option<ColorMetrics> {
    Some(ColorMetrics {
        l: masked_mean(lab, 0, mask)? * 100.0 / 255.0,
        a: masked_mean(lab, 1, mask)? - 128.0,
        b: masked_mean(lab, 2, mask)? - 128.0,
    })
}

fn selected<'a>(
    img: &'a RgbImage,
    mask: Option<&'a Mask>,
) -> impl Iterator<Item = &'a Rgb<u8>> + 'a {
    debug_assert!(
        mask.is_none_or(|m| (m.width(), m.height()) == img.dimensions()),
        "mask extent must match its image"
    );
    img.enumerate_pixels()
        .filter(move |(x, y, _)| mask.is_none_or(|m| m.get(*x, *y)))
        .map(|(_, _, p)| p)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
