// SPDX-License-Identifier: MPL-2.0

//! Geometry shared by the capture stages
//!
//! Regions are normalized (0.0 to 1.0) relative to the frame dimensions, so
//! a region found on the downscaled analysis buffer applies unchanged to the
//! full-resolution frame.

use tracing::warn;

/// Physical width / height of the label being captured
///
/// Always positive; invalid inputs fall back to a square ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub fn new(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            Self(value)
        } else {
            warn!(value, "Invalid aspect ratio, using 1.0");
            Self(1.0)
        }
    }

    /// Ratio from physical label dimensions (any unit)
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        if height > 0.0 {
            Self::new(width / height)
        } else {
            Self::new(0.0)
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self(1.0)
    }
}

/// A rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

/// A rectangular region within a frame
///
/// Invariant: `x + width <= 1`, `y + height <= 1`, `width > 0`, `height > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl NormalizedRegion {
    /// Create a region, clipping it to the frame
    ///
    /// Returns `None` when nothing of the rectangle lies inside the frame.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Option<Self> {
        Self::from_edges(
            x as f64,
            y as f64,
            x as f64 + width as f64,
            y as f64 + height as f64,
        )
    }

    /// Create a region from its edges, clipping to the frame
    fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Option<Self> {
        if !(left.is_finite() && top.is_finite() && right.is_finite() && bottom.is_finite()) {
            return None;
        }
        let left = left.clamp(0.0, 1.0);
        let top = top.clamp(0.0, 1.0);
        let right = right.clamp(0.0, 1.0);
        let bottom = bottom.clamp(0.0, 1.0);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left as f32,
            y: top as f32,
            width: ((right - left) as f32).min(1.0 - left as f32),
            height: ((bottom - top) as f32).min(1.0 - top as f32),
        })
    }

    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }

    /// Pixel rectangle covering this region, at least 1x1 and inside the frame
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let left = ((self.x as f64 * fw).round() as u32).min(frame_width.saturating_sub(1));
        let top = ((self.y as f64 * fh).round() as u32).min(frame_height.saturating_sub(1));
        let right = (((self.x + self.width) as f64 * fw).round() as u32).min(frame_width);
        let bottom = (((self.y + self.height) as f64 * fh).round() as u32).min(frame_height);
        PixelRect {
            x: left,
            y: top,
            width: right.saturating_sub(left).max(1),
            height: bottom.saturating_sub(top).max(1),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Fraction of the frame covered
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Width / height of the region measured in pixels of a given frame
    pub fn pixel_aspect(&self, frame_width: u32, frame_height: u32) -> f64 {
        (self.width as f64 * frame_width as f64) / (self.height as f64 * frame_height as f64)
    }

    /// Expand the shorter dimension symmetrically until the pixel aspect
    /// matches `aspect`, then clip to the frame
    ///
    /// Clipping can leave a residual aspect error when the expanded box
    /// would leave the frame.
    pub fn fit_aspect(&self, aspect: AspectRatio, frame_width: u32, frame_height: u32) -> Self {
        let target = aspect.value();
        let current = self.pixel_aspect(frame_width, frame_height);
        let (cx, cy) = self.center();
        let (cx, cy) = (cx as f64, cy as f64);
        let mut width = self.width as f64;
        let mut height = self.height as f64;
        let frame_aspect = frame_width as f64 / frame_height as f64;

        if current < target {
            width = height * target / frame_aspect;
        } else if current > target {
            height = width * frame_aspect / target;
        }

        Self::from_edges(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
        .unwrap_or(*self)
    }

    /// Grow each side by `fraction` of the region's size, clipped to the frame
    pub fn padded(&self, fraction: f32) -> Self {
        let dx = (self.width * fraction) as f64;
        let dy = (self.height * fraction) as f64;
        Self::from_edges(
            self.x as f64 - dx,
            self.y as f64 - dy,
            (self.x + self.width) as f64 + dx,
            (self.y + self.height) as f64 + dy,
        )
        .unwrap_or(*self)
    }

    /// Move each coordinate `alpha` of the way towards `target`
    pub fn lerp(&self, target: &Self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let step = |from: f32, to: f32| from + alpha * (to - from);
        let x = step(self.x, target.x);
        let y = step(self.y, target.y);
        Self::new(
            x,
            y,
            step(self.width, target.width),
            step(self.height, target.height),
        )
        .unwrap_or(*target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_aspect_falls_back_to_square() {
        assert_eq!(AspectRatio::new(0.0).value(), 1.0);
        assert_eq!(AspectRatio::new(-2.5).value(), 1.0);
        assert_eq!(AspectRatio::new(f64::NAN).value(), 1.0);
        assert_eq!(AspectRatio::new(1.5).value(), 1.5);
        assert_eq!(AspectRatio::from_dimensions(100.0, 50.0).value(), 2.0);
    }

    #[test]
    fn new_clips_to_frame() {
        let region = NormalizedRegion::new(0.8, 0.9, 0.5, 0.5).unwrap();
        assert!(region.x + region.width <= 1.0);
        assert!(region.y + region.height <= 1.0);
        assert!(NormalizedRegion::new(1.2, 0.0, 0.1, 0.1).is_none());
    }

    #[test]
    fn fit_aspect_widens_about_center() {
        // 1280x960 frame, box 384x480 px, square target
        let region = NormalizedRegion::new(0.3, 0.2, 0.3, 0.5).unwrap();
        let fitted = region.fit_aspect(AspectRatio::new(1.0), 1280, 960);

        assert!((fitted.pixel_aspect(1280, 960) - 1.0).abs() < 1e-3);
        assert!((fitted.center().0 - 0.45).abs() < 1e-4);
        assert!((fitted.center().1 - 0.45).abs() < 1e-4);
        assert!((fitted.width - 0.375).abs() < 1e-4);
        assert!((fitted.height - 0.5).abs() < 1e-4);
    }

    #[test]
    fn fit_aspect_grows_height_for_tall_targets() {
        let region = NormalizedRegion::new(0.25, 0.4, 0.5, 0.2).unwrap();
        let fitted = region.fit_aspect(AspectRatio::new(2.0), 1000, 1000);
        assert!((fitted.pixel_aspect(1000, 1000) - 2.0).abs() < 1e-3);
        assert!((fitted.width - 0.5).abs() < 1e-4);
    }

    #[test]
    fn padded_preserves_center() {
        let region = NormalizedRegion::new(0.4, 0.4, 0.2, 0.2).unwrap();
        let padded = region.padded(0.1);
        assert!((padded.width - 0.24).abs() < 1e-5);
        let (cx, cy) = padded.center();
        assert!((cx - 0.5).abs() < 1e-5 && (cy - 0.5).abs() < 1e-5);
    }

    #[test]
    fn lerp_moves_fraction_of_the_way() {
        let a = NormalizedRegion::new(0.0, 0.0, 0.5, 0.5).unwrap();
        let b = NormalizedRegion::new(0.4, 0.4, 0.5, 0.5).unwrap();
        let c = a.lerp(&b, 0.25);
        assert!((c.x - 0.1).abs() < 1e-6);
        assert!((c.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn to_pixels_stays_inside_frame() {
        let region = NormalizedRegion::new(0.5, 0.5, 0.5, 0.5).unwrap();
        let rect = region.to_pixels(101, 99);
        assert!(rect.x + rect.width <= 101);
        assert!(rect.y + rect.height <= 99);
    }
}
