// SPDX-License-Identifier: MPL-2.0

//! Crop and resize for captured frames
//!
//! The crop is either the region chosen by the capture controller or, when
//! no region was ever detected, a centered box matching the target aspect
//! ratio that fills most of the frame. The crop is then resized to a fixed
//! output size so the backend always sees the same scale, whatever the
//! camera resolution.

use crate::backends::camera::types::CameraFrame;
use crate::constants::output;
use crate::errors::PhotoError;
use crate::pipelines::capture::{AspectRatio, NormalizedRegion, PixelRect};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, warn};

/// Where the crop rectangle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSource {
    /// Region chosen by the capture controller
    Region,
    /// Centered fallback box
    CenterFallback,
}

/// Cropped and resized image
pub struct ProcessedImage {
    pub image: RgbImage,
    pub width: u32,
    pub height: u32,
    /// Crop taken from the source frame
    pub crop: PixelRect,
    pub source: CropSource,
}

/// Output dimensions for a target aspect ratio
///
/// Height is `round(width / aspect)`, never zero. Very tall ratios are
/// capped at `MAX_OUTPUT_SIDE` rows with the width scaled down to match.
pub fn output_size(width: u32, aspect: AspectRatio) -> (u32, u32) {
    let width = width.max(1);
    let height = (width as f64 / aspect.value()).round().max(1.0);
    if height <= output::MAX_OUTPUT_SIDE as f64 {
        return (width, height as u32);
    }

    let capped = output::MAX_OUTPUT_SIDE;
    let narrowed = ((capped as f64 * aspect.value()).round() as u32).clamp(1, width);
    warn!(
        aspect = aspect.value(),
        requested_height = height,
        width = narrowed,
        height = capped,
        "Output height capped"
    );
    (narrowed, capped)
}

/// Centered box of `aspect` covering `fill` of the largest such box that fits
pub fn center_crop(
    frame_width: u32,
    frame_height: u32,
    aspect: AspectRatio,
    fill: f32,
) -> PixelRect {
    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let fill = (fill as f64).clamp(0.01, 1.0);

    let (fit_w, fit_h) = if aspect.value() >= fw / fh {
        (fw, fw / aspect.value())
    } else {
        (fh * aspect.value(), fh)
    };
    let width = ((fit_w * fill).round() as u32).clamp(1, frame_width);
    let height = ((fit_h * fill).round() as u32).clamp(1, frame_height);

    PixelRect {
        x: (frame_width - width) / 2,
        y: (frame_height - height) / 2,
        width,
        height,
    }
}

/// Grow `rect` about its center until it has the target aspect
///
/// When the grown box would leave the frame the other dimension shrinks
/// instead, and the box slides back inside, so the result always matches
/// `aspect` to within a pixel.
pub fn fit_crop(
    rect: PixelRect,
    frame_width: u32,
    frame_height: u32,
    aspect: AspectRatio,
) -> PixelRect {
    let frame_width = frame_width.max(1);
    let frame_height = frame_height.max(1);
    let a = aspect.value();

    let mut w = rect.width.max(1) as f64;
    let mut h = rect.height.max(1) as f64;
    if w / h < a {
        w = h * a;
    } else {
        h = w / a;
    }
    if w > frame_width as f64 {
        w = frame_width as f64;
        h = w / a;
    }
    if h > frame_height as f64 {
        h = frame_height as f64;
        w = h * a;
    }

    // Derive the short side from the long one so rounding stays within a pixel
    let (width, height) = if a >= 1.0 {
        let width = (w.round() as u32).clamp(1, frame_width);
        let height = ((width as f64 / a).round() as u32).clamp(1, frame_height);
        (width, height)
    } else {
        let height = (h.round() as u32).clamp(1, frame_height);
        let width = ((height as f64 * a).round() as u32).clamp(1, frame_width);
        (width, height)
    };

    let cx = rect.x as f64 + rect.width as f64 / 2.0;
    let cy = rect.y as f64 + rect.height as f64 / 2.0;
    let x = (cx - width as f64 / 2.0).round().clamp(0.0, (frame_width - width) as f64) as u32;
    let y = (cy - height as f64 / 2.0).round().clamp(0.0, (frame_height - height) as f64) as u32;

    PixelRect {
        x,
        y,
        width,
        height,
    }
}

/// Crop rectangle for a frame
pub fn crop_rect(
    frame_width: u32,
    frame_height: u32,
    region: Option<&NormalizedRegion>,
    aspect: AspectRatio,
) -> (PixelRect, CropSource) {
    match region {
        Some(region) => {
            let rect = region.to_pixels(frame_width, frame_height);
            let fitted = fit_crop(rect, frame_width, frame_height, aspect);
            if fitted != rect {
                debug!(?rect, ?fitted, "Crop fitted to aspect ratio");
            }
            (fitted, CropSource::Region)
        }
        None => (
            center_crop(frame_width, frame_height, aspect, output::CENTER_CROP_FILL),
            CropSource::CenterFallback,
        ),
    }
}

/// Copy a frame into an owned RGBA image, dropping row padding
fn frame_to_rgba(frame: &CameraFrame) -> Result<RgbaImage, PhotoError> {
    if !frame.is_valid() {
        return Err(PhotoError::NoFrameAvailable);
    }

    let row = frame.width as usize * 4;
    let stride = frame.stride as usize;
    let data = if stride == row {
        frame.data[..row * frame.height as usize].to_vec()
    } else {
        frame
            .data
            .chunks(stride)
            .take(frame.height as usize)
            .flat_map(|line| &line[..row])
            .copied()
            .collect()
    };

    RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| PhotoError::CaptureFailed("Frame buffer size mismatch".into()))
}

/// Crop `frame` and resize it to `output_width` at the target aspect ratio
pub fn crop_and_resize(
    frame: &CameraFrame,
    region: Option<&NormalizedRegion>,
    aspect: AspectRatio,
    output_width: u32,
) -> Result<ProcessedImage, PhotoError> {
    let rgba = frame_to_rgba(frame)?;
    let (crop, source) = crop_rect(frame.width, frame.height, region, aspect);
    let (width, height) = output_size(output_width, aspect);

    let cropped = imageops::crop_imm(&rgba, crop.x, crop.y, crop.width, crop.height).to_image();
    let resized = imageops::resize(&cropped, width, height, FilterType::Triangle);
    let image = DynamicImage::ImageRgba8(resized).to_rgb8();

    debug!(
        crop_x = crop.x,
        crop_y = crop.y,
        crop_width = crop.width,
        crop_height = crop.height,
        ?source,
        width,
        height,
        "Frame normalized"
    );

    Ok(ProcessedImage {
        image,
        width,
        height,
        crop,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_height_follows_aspect() {
        assert_eq!(output_size(1000, AspectRatio::new(1.0)), (1000, 1000));
        assert_eq!(output_size(1000, AspectRatio::new(1.5)), (1000, 667));
        assert_eq!(output_size(1000, AspectRatio::new(4.0)), (1000, 250));
    }

    #[test]
    fn center_crop_fills_shorter_dimension() {
        let rect = center_crop(1280, 960, AspectRatio::new(1.0), 0.7);
        assert_eq!((rect.width, rect.height), (672, 672));
        assert_eq!((rect.x, rect.y), (304, 144));
    }

    #[test]
    fn center_crop_wide_label() {
        let rect = center_crop(1280, 960, AspectRatio::new(3.0), 0.7);
        assert_eq!(rect.width, 896);
        assert!((rect.aspect() - 3.0).abs() < 0.02);
    }

    fn assert_matches_aspect(rect: PixelRect, aspect: f64) {
        let error = if aspect >= 1.0 {
            (rect.height as f64 - rect.width as f64 / aspect).abs()
        } else {
            (rect.width as f64 - rect.height as f64 * aspect).abs()
        };
        assert!(error <= 1.0, "{:?} does not match aspect {}", rect, aspect);
    }

    #[test]
    fn tall_output_is_capped() {
        let (width, height) = output_size(1000, AspectRatio::new(0.001));
        assert_eq!(height, output::MAX_OUTPUT_SIDE);
        assert!((width as f64 - height as f64 * 0.001).abs() <= 1.0);
    }

    #[test]
    fn region_crop_is_fitted_to_aspect() {
        let region = NormalizedRegion::new(0.3, 0.2, 0.3, 0.5).unwrap();
        let (rect, source) = crop_rect(1280, 960, Some(&region), AspectRatio::new(1.0));
        assert_eq!(source, CropSource::Region);
        assert_eq!((rect.width, rect.height), (480, 480));
        // Vertical midpoint unchanged
        assert_eq!(rect.y + rect.height / 2, 432);
    }

    #[test]
    fn clipped_region_shrinks_instead_of_stretching() {
        // Wide label spanning the full frame width, target wider than the band
        let region = NormalizedRegion::new(0.0, 0.299, 1.0, 0.402).unwrap();
        let (rect, _) = crop_rect(1280, 960, Some(&region), AspectRatio::new(4.0));
        assert_eq!((rect.x, rect.width, rect.height), (0, 1280, 320));
        assert_matches_aspect(rect, 4.0);
        assert!(rect.y + rect.height <= 960);
    }

    #[test]
    fn crops_match_aspect_near_frame_edges() {
        let regions = [
            NormalizedRegion::new(0.0, 0.0, 0.2, 0.9).unwrap(),
            NormalizedRegion::new(0.85, 0.1, 0.15, 0.2).unwrap(),
            NormalizedRegion::new(0.1, 0.7, 0.8, 0.3).unwrap(),
        ];
        for aspect in [0.25, 0.75, 1.0, 1.37, 3.0, 6.0] {
            for region in &regions {
                let (rect, _) = crop_rect(1280, 960, Some(region), AspectRatio::new(aspect));
                assert_matches_aspect(rect, aspect);
                assert!(rect.x + rect.width <= 1280 && rect.y + rect.height <= 960);
            }
            let (rect, source) = crop_rect(1280, 960, None, AspectRatio::new(aspect));
            assert_eq!(source, CropSource::CenterFallback);
            assert_matches_aspect(rect, aspect);
        }
    }

    #[test]
    fn crop_and_resize_exact_output() {
        let frame = CameraFrame::from_rgba(64, 48, vec![200; 64 * 48 * 4]);
        let region = NormalizedRegion::new(0.25, 0.25, 0.5, 0.5).unwrap();
        let processed =
            crop_and_resize(&frame, Some(&region), AspectRatio::new(2.0), 100).unwrap();
        assert_eq!((processed.width, processed.height), (100, 50));
        assert_eq!(processed.image.dimensions(), (100, 50));
        assert_eq!(processed.source, CropSource::Region);
    }

    #[test]
    fn padded_stride_is_handled() {
        let width = 4u32;
        let height = 2u32;
        let stride = 24u32;
        let mut data = vec![0u8; (stride * height) as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let i = y * stride as usize + x * 4;
                data[i..i + 4].copy_from_slice(&[10, 20, 30, 255]);
            }
        }
        let mut frame = CameraFrame::from_rgba(width, height, data);
        frame.stride = stride;

        let rgba = frame_to_rgba(&frame).unwrap();
        assert_eq!(rgba.get_pixel(3, 1).0, [10, 20, 30, 255]);
    }
}
