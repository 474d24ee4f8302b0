// src/services/image_processor.rs
use crate::errors::HydraError;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, RgbImage};

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

const MAX_DIMENSION: u32 = 8192;

pub struct ImageProcessor {
    max_upload_bytes: usize,
}

impl ImageProcessor {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self { max_upload_bytes }
    }

    /// Decodes any supported raster format into an 8-bit RGB buffer.
    pub fn decode(data: &[u8]) -> Result<RgbImage, HydraError> {
        let img = image::load_from_memory(data)
            .map_err(|e| HydraError::Decode(format!("Invalid image format: {}", e)))?;
        Ok(img.to_rgb8())
    }

    /// Checks type, byte size and pixel size, returning the decoded upload.
    pub fn validate_upload(
        &self,
        content_type: &str,
        data: &[u8],
    ) -> Result<DynamicImage, HydraError> {
        if !ALLOWED_MIME_TYPES.contains(&content_type) {
            return Err(HydraError::Validation(format!(
                "Unsupported image type: {}",
                content_type
            )));
        }

        if data.len() > self.max_upload_bytes {
            return Err(HydraError::Validation(format!(
                "Image exceeds {} byte limit",
                self.max_upload_bytes
            )));
        }

        let img = image::load_from_memory(data)
            .map_err(|e| HydraError::Decode(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(HydraError::Validation(format!(
                "Image dimensions exceed {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            )));
        }

        Ok(img)
    }

    /// Shrinks an image so its longer side is at most `max_size`, re-encoded as
    /// PNG. Returns `None` when the image already fits.
    pub fn resize_if_needed(
        &self,
        img: &DynamicImage,
        max_size: u32,
    ) -> Result<Option<Vec<u8>>, HydraError> {
        let (width, height) = img.dimensions();

        if width <= max_size && height <= max_size {
            return Ok(None);
        }

        let ratio = (max_size as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| HydraError::Internal(format!("Failed to encode resized image: {}", e)))?;

        Ok(Some(output))
    }

    /// Validates an upload and produces the copy handed to the classifier,
    /// decoding it only once.
    pub fn prepare_for_classifier(
        &self,
        content_type: &str,
        data: Bytes,
        max_size: u32,
    ) -> Result<ClassifierInput, HydraError> {
        let img = self.validate_upload(content_type, &data)?;

        Ok(match self.resize_if_needed(&img, max_size)? {
            Some(resized) => ClassifierInput {
                data: Bytes::from(resized),
                mime_type: "image/png".to_string(),
            },
            None => ClassifierInput {
                data,
                mime_type: content_type.to_string(),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierInput {
    pub data: Bytes,
    pub mime_type: String,
}
