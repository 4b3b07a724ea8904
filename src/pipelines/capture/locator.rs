// SPDX-License-Identifier: GPL-3.0-only

//! Subject locator
//!
//! Finds the label in an analysis frame with projection histograms of the
//! gradient magnitude:
//!
//! 1. luma plane, then `|dL/dx| + |dL/dy|` per pixel
//! 2. accumulate into column and row histograms, skipping a border margin
//! 3. the subject band on each axis runs from the first to the last bin at or
//!    above a fraction of that axis' peak
//! 4. the band box is rejected if it is too small or too large, too far from
//!    the frame center, or still off the target aspect after fitting
//! 5. accepted boxes are padded slightly and returned normalized

use super::region::{AspectRatio, NormalizedRegion};
use super::sampler::{AnalysisFrame, luminance};
use crate::config::AnalysisSettings;
use std::fmt;
use tracing::trace;

/// Frames smaller than this (after the margin) carry no usable signal
const MIN_INNER_SIZE: u32 = 8;

/// Why a candidate region was not accepted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// Analysis frame too small to evaluate
    TooSmallFrame,
    /// No edges at all (flat or black frame)
    NoSignal,
    /// Candidate area outside the accepted band
    AreaOutOfRange { area: f32 },
    /// Candidate center too far from the frame center
    OffCenter { dx: f32, dy: f32 },
    /// Residual aspect error after fitting exceeds the tolerance
    AspectMismatch { error: f32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooSmallFrame => write!(f, "frame too small"),
            Rejection::NoSignal => write!(f, "no edge signal"),
            Rejection::AreaOutOfRange { area } => write!(f, "area {:.3} out of range", area),
            Rejection::OffCenter { dx, dy } => write!(f, "off center ({:.3}, {:.3})", dx, dy),
            Rejection::AspectMismatch { error } => write!(f, "aspect error {:.3}", error),
        }
    }
}

/// Projection-histogram subject locator
#[derive(Debug)]
pub struct SubjectLocator {
    settings: AnalysisSettings,
    luma: Vec<f32>,
    columns: Vec<f32>,
    rows: Vec<f32>,
}

impl SubjectLocator {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            luma: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Confident subject region, if any
    pub fn locate(
        &mut self,
        frame: &AnalysisFrame<'_>,
        aspect: AspectRatio,
    ) -> Option<NormalizedRegion> {
        match self.evaluate(frame, aspect) {
            Ok(region) => Some(region),
            Err(reason) => {
                trace!(%reason, "No confident region");
                None
            }
        }
    }

    /// Evaluate the frame, reporting why a candidate was rejected
    pub fn evaluate(
        &mut self,
        frame: &AnalysisFrame<'_>,
        aspect: AspectRatio,
    ) -> Result<NormalizedRegion, Rejection> {
        let (w, h) = (frame.width, frame.height);
        let margin_x = (w as f32 * self.settings.border_margin).round() as u32;
        let margin_y = (h as f32 * self.settings.border_margin).round() as u32;
        if w < 2
            || h < 2
            || w.saturating_sub(2 * margin_x) < MIN_INNER_SIZE
            || h.saturating_sub(2 * margin_y) < MIN_INNER_SIZE
        {
            return Err(Rejection::TooSmallFrame);
        }

        self.project(frame, margin_x, margin_y);

        let columns = band(&self.columns, self.settings.band_threshold).ok_or(Rejection::NoSignal)?;
        let rows = band(&self.rows, self.settings.band_threshold).ok_or(Rejection::NoSignal)?;

        let candidate = NormalizedRegion::from_pixels(
            columns.0 as u32,
            rows.0 as u32,
            (columns.1 - columns.0 + 1) as u32,
            (rows.1 - rows.0 + 1) as u32,
            w,
            h,
        );

        let area = candidate.area();
        if area < self.settings.min_area_fraction || area > self.settings.max_area_fraction {
            return Err(Rejection::AreaOutOfRange { area });
        }

        let (cx, cy) = candidate.center();
        let (dx, dy) = (cx - 0.5, cy - 0.5);
        if dx.abs() > self.settings.center_tolerance || dy.abs() > self.settings.center_tolerance {
            return Err(Rejection::OffCenter { dx, dy });
        }

        let fitted = candidate.fit_aspect(aspect, w, h);
        let error = (fitted.pixel_aspect(w, h) / aspect.value() - 1.0).abs() as f32;
        if error > self.settings.aspect_tolerance {
            return Err(Rejection::AspectMismatch { error });
        }

        let region = fitted.padded(self.settings.padding);
        trace!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "Subject located"
        );
        Ok(region)
    }

    /// Fill the column and row histograms with gradient magnitude
    fn project(&mut self, frame: &AnalysisFrame<'_>, margin_x: u32, margin_y: u32) {
        let w = frame.width as usize;
        let h = frame.height as usize;

        self.luma.clear();
        self.luma.extend(frame.rgba.chunks_exact(4).map(luminance));

        self.columns.clear();
        self.columns.resize(w, 0.0);
        self.rows.clear();
        self.rows.resize(h, 0.0);

        let (mx, my) = (margin_x as usize, margin_y as usize);
        let x_end = (w - mx).min(w - 1);
        let y_end = (h - my).min(h - 1);

        for y in my..y_end {
            let row = y * w;
            for x in mx..x_end {
                let l = self.luma[row + x];
                let gx = (self.luma[row + x + 1] - l).abs();
                let gy = (self.luma[row + w + x] - l).abs();
                let magnitude = gx + gy;
                self.columns[x] += magnitude;
                self.rows[y] += magnitude;
            }
        }
    }
}

/// First and last bins at or above `threshold * peak`
fn band(histogram: &[f32], threshold: f32) -> Option<(usize, usize)> {
    let peak = histogram.iter().copied().fold(0.0f32, f32::max);
    if peak <= f32::EPSILON {
        return None;
    }
    let cutoff = peak * threshold;
    let first = histogram.iter().position(|&v| v >= cutoff)?;
    let last = histogram.iter().rposition(|&v| v >= cutoff)?;
    Some((first, last))
}
