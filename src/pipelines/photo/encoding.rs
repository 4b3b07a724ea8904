// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding with a byte budget
//!
//! Encoding starts at a high quality and steps the quality down while the
//! output is larger than the budget. The loop stops at the quality floor
//! even when the result is still oversized; that result is returned as a
//! best effort.

use crate::config::OutputSettings;
use crate::errors::PhotoError;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};

/// Quality schedule and size limit for one encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeBudget {
    pub start_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
    pub max_bytes: usize,
}

impl From<&OutputSettings> for EncodeBudget {
    fn from(settings: &OutputSettings) -> Self {
        Self {
            start_quality: settings.start_quality,
            min_quality: settings.min_quality,
            quality_step: settings.quality_step,
            max_bytes: settings.max_bytes,
        }
    }
}

/// Encoded image data
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality the final data was encoded at
    pub quality: u8,
    /// Number of encodes performed
    pub attempts: u32,
    /// Whether the data fits the byte budget
    pub within_budget: bool,
}

/// Encode as JPEG at a fixed quality (1-100)
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));

    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    if buffer.is_empty() {
        return Err(PhotoError::EncodingFailed("Encoder produced no data".into()));
    }
    Ok(buffer)
}

/// Encode, lowering quality until the output fits `budget` or the floor is hit
pub fn encode_within_budget(
    image: &RgbImage,
    budget: &EncodeBudget,
) -> Result<EncodedImage, PhotoError> {
    let mut quality = budget.start_quality.clamp(1, 100);
    let floor = budget.min_quality.clamp(1, quality);
    let step = budget.quality_step.max(1);
    let mut attempts = 0u32;

    loop {
        let data = encode_jpeg(image, quality)?;
        attempts += 1;

        let within_budget = data.len() <= budget.max_bytes;
        if within_budget || quality <= floor {
            if within_budget {
                debug!(quality, attempts, size = data.len(), "Encoded within budget");
            } else {
                warn!(
                    quality,
                    size = data.len(),
                    max_bytes = budget.max_bytes,
                    "Quality floor reached, keeping oversized result"
                );
            }
            return Ok(EncodedImage {
                data,
                width: image.width(),
                height: image.height(),
                quality,
                attempts,
                within_budget,
            });
        }

        debug!(quality, size = data.len(), "Over budget, lowering quality");
        quality = quality.saturating_sub(step).max(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Noisy image that compresses poorly
    fn noisy(width: u32, height: u32) -> RgbImage {
        let mut state = 0x1234_5678u32;
        RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            image::Rgb([r, g, b])
        })
    }

    #[test]
    fn fits_generous_budget_first_try() {
        let image = RgbImage::from_pixel(64, 64, image::Rgb([128, 128, 128]));
        let budget = EncodeBudget {
            start_quality: 92,
            min_quality: 50,
            quality_step: 7,
            max_bytes: 1 << 20,
        };
        let encoded = encode_within_budget(&image, &budget).unwrap();
        assert_eq!(encoded.attempts, 1);
        assert_eq!(encoded.quality, 92);
        assert!(encoded.within_budget);
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn impossible_budget_stops_at_floor() {
        let image = noisy(128, 128);
        let budget = EncodeBudget {
            start_quality: 92,
            min_quality: 50,
            quality_step: 7,
            max_bytes: 16,
        };
        let encoded = encode_within_budget(&image, &budget).unwrap();
        assert_eq!(encoded.quality, 50);
        assert!(!encoded.within_budget);
        // 92, 85, 78, 71, 64, 57, 50
        assert_eq!(encoded.attempts, 7);
    }

    #[test]
    fn zero_step_still_terminates() {
        let image = noisy(32, 32);
        let budget = EncodeBudget {
            start_quality: 60,
            min_quality: 55,
            quality_step: 0,
            max_bytes: 1,
        };
        let encoded = encode_within_budget(&image, &budget).unwrap();
        assert_eq!(encoded.quality, 55);
        assert_eq!(encoded.attempts, 6);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let image = noisy(96, 96);
        let high = encode_jpeg(&image, 95).unwrap();
        let low = encode_jpeg(&image, 40).unwrap();
        assert!(low.len() < high.len());
    }
}
