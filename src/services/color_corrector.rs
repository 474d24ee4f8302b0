// src/services/color_corrector.rs
use image::{Rgb, RgbImage};

pub struct ColorCorrector;

impl ColorCorrector {
    /// Gray-world white balance: scales each channel so the three channel
    /// means meet at their common average.
    pub fn correct(img: &RgbImage) -> RgbImage {
        let pixels = (img.width() as f64) * (img.height() as f64);
        if pixels == 0.0 {
            return img.clone();
        }

        let mut sums = [0f64; 3];
        for p in img.pixels() {
            for c in 0..3 {
                sums[c] += p[c] as f64;
            }
        }

        let means = sums.map(|s| s / pixels);
        let gray = means.iter().sum::<f64>() / 3.0;
        // A channel with mean 0 is left with a divisor of 1.
        let gains = means.map(|m| if m == 0.0 { gray } else { gray / m });

        RgbImage::from_fn(img.width(), img.height(), |x, y| {
            let p = img.get_pixel(x, y);
            Rgb([0, 1, 2].map(|c| (p[c] as f64 * gains[c]).clamp(0.0, 255.0) as u8))
        })
    }
}
