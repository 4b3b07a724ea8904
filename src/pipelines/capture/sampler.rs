// SPDX-License-Identifier: GPL-3.0-only

//! Downscaled analysis frames
//!
//! Analysis never touches full-resolution frames. Each tick the current frame
//! is bilinearly resampled into a fixed-width RGBA buffer that the sampler owns
//! and reuses, so steady-state ticks do not allocate.

use crate::backends::camera::CameraFrame;
use tracing::trace;

/// Borrowed view of the analysis buffer for one tick
#[derive(Debug, Clone, Copy)]
pub struct AnalysisFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA
    pub rgba: &'a [u8],
}

impl AnalysisFrame<'_> {
    /// Rec. 601 luma of the pixel at (x, y)
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> f32 {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        luminance(&self.rgba[offset..offset + 4])
    }

    /// Luma plane of the whole frame, row-major
    pub fn luma_plane(&self) -> Vec<f32> {
        self.rgba.chunks_exact(4).map(luminance).collect()
    }
}

/// Rec. 601 luma of one RGBA pixel
#[inline]
pub fn luminance(px: &[u8]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

/// Resamples frames into a reused analysis buffer
#[derive(Debug)]
pub struct FrameSampler {
    target_width: u32,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl FrameSampler {
    pub fn new(target_width: u32) -> Self {
        Self {
            target_width: target_width.max(1),
            width: 0,
            height: 0,
            buffer: Vec::new(),
        }
    }

    /// Downscale `frame` into the analysis buffer
    ///
    /// Returns `None` when the frame has no usable pixels yet; callers simply
    /// try again on the next tick. Frames narrower than the target width are
    /// sampled at their own size.
    pub fn sample(&mut self, frame: &CameraFrame) -> Option<AnalysisFrame<'_>> {
        if !frame.is_valid() {
            trace!(
                width = frame.width,
                height = frame.height,
                "Frame not ready for sampling"
            );
            return None;
        }

        let dst_width = self.target_width.min(frame.width);
        let dst_height = ((frame.height as f64 * dst_width as f64 / frame.width as f64).round()
            as u32)
            .max(1);

        let len = (dst_width * dst_height * 4) as usize;
        if self.buffer.len() != len {
            self.buffer.resize(len, 0);
        }
        self.width = dst_width;
        self.height = dst_height;

        downscale_into(frame, dst_width, dst_height, &mut self.buffer);

        Some(AnalysisFrame {
            width: self.width,
            height: self.height,
            rgba: &self.buffer,
        })
    }

    /// Capacity of the reused buffer in bytes
    pub fn buffer_capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

/// Bilinear RGBA downscale honoring the source stride
fn downscale_into(frame: &CameraFrame, dst_width: u32, dst_height: u32, out: &mut [u8]) {
    let src_width = frame.width as usize;
    let src_height = frame.height as usize;
    let stride = frame.stride as usize;

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    let get = |px: usize, py: usize, channel: usize| -> f32 {
        frame
            .data
            .get(py * stride + px * 4 + channel)
            .copied()
            .unwrap_or(0) as f32
    };

    for y in 0..dst_height as usize {
        let src_y = y as f32 * y_ratio;
        let y0 = (src_y as usize).min(src_height - 1);
        let y1 = (y0 + 1).min(src_height - 1);
        let y_frac = src_y - y0 as f32;

        for x in 0..dst_width as usize {
            let src_x = x as f32 * x_ratio;
            let x0 = (src_x as usize).min(src_width - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let x_frac = src_x - x0 as f32;

            let base = (y * dst_width as usize + x) * 4;
            for channel in 0..4 {
                let value = get(x0, y0, channel) * (1.0 - x_frac) * (1.0 - y_frac)
                    + get(x1, y0, channel) * x_frac * (1.0 - y_frac)
                    + get(x0, y1, channel) * (1.0 - x_frac) * y_frac
                    + get(x1, y1, channel) * x_frac * y_frac;
                out[base + channel] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
