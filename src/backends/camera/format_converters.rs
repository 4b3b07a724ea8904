// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion to RGBA
//!
//! Devices deliver packed YUV, RGB24 or MJPEG; the capture pipeline only
//! ever sees RGBA.

use super::types::{BackendError, BackendResult, PixelFormat};

/// Convert a raw device buffer to tightly packed RGBA
pub fn to_rgba(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> BackendResult<Vec<u8>> {
    let expected = (width * height) as usize;
    let rgba = match format {
        PixelFormat::RGBA => data.to_vec(),
        PixelFormat::YUYV => yuyv_to_rgba(data, width, height),
        PixelFormat::UYVY => uyvy_to_rgba(data, width, height),
        PixelFormat::RGB24 => rgb_to_rgba(data),
        PixelFormat::MJPEG => mjpeg_to_rgba(data, width, height)?,
    };

    if rgba.len() < expected * 4 {
        return Err(BackendError::Other(format!(
            "Converted frame too small: expected {} bytes, got {}",
            expected * 4,
            rgba.len()
        )));
    }
    Ok(rgba)
}

/// BT.601 YUV to RGBA pixel
#[inline]
fn yuv_to_rgba(y: f32, u: f32, v: f32) -> [u8; 4] {
    [
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
        255,
    ]
}

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        rgba.extend_from_slice(&yuv_to_rgba(y0, u, v));
        rgba.extend_from_slice(&yuv_to_rgba(y1, u, v));

        if rgba.len() >= pixel_count * 4 {
            break;
        }
    }

    rgba.truncate(pixel_count * 4);
    rgba
}

/// Convert UYVY (YUV 4:2:2) to RGBA
///
/// UYVY format: U0 Y0 V0 Y1 - each 4-byte group encodes 2 pixels.
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let u = chunk[0] as f32 - 128.0;
        let y0 = chunk[1] as f32;
        let v = chunk[2] as f32 - 128.0;
        let y1 = chunk[3] as f32;

        rgba.extend_from_slice(&yuv_to_rgba(y0, u, v));
        rgba.extend_from_slice(&yuv_to_rgba(y1, u, v));

        if rgba.len() >= pixel_count * 4 {
            break;
        }
    }

    rgba.truncate(pixel_count * 4);
    rgba
}

/// Convert RGB to RGBA by adding alpha=255
pub fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for chunk in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
    }
    rgba
}

/// Decode one MJPEG buffer to RGBA
///
/// Some devices report a negotiated size that differs from the encoded
/// JPEG; the decoded size must match or the frame is rejected.
pub fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> BackendResult<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::Other(format!("MJPEG decode failed: {}", e)))?;
    let rgba = decoded.to_rgba8();

    if rgba.width() != width || rgba.height() != height {
        return Err(BackendError::FormatNotSupported(format!(
            "MJPEG frame is {}x{}, expected {}x{}",
            rgba.width(),
            rgba.height(),
            width,
            height
        )));
    }

    Ok(rgba.into_raw())
}
