// SPDX-License-Identifier: GPL-3.0-only

//! Focus scoring and temporal stability
//!
//! Sharpness is approximated by the luminance variance over the subject
//! region: a textured, in-focus label has far more high-frequency detail than
//! a blurred one. Stability is a run of consecutive ticks above a threshold,
//! counted only once a warm-up floor has passed so autofocus and exposure can
//! settle.

use super::region::{NormalizedRegion, PixelRect};
use super::sampler::AnalysisFrame;
use crate::config::StabilitySettings;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Luminance variance over `region` (whole frame when `None`)
///
/// `mean(l^2) - mean(l)^2`, computed in `f64` to keep precision over large
/// regions.
pub fn focus_score(frame: &AnalysisFrame<'_>, region: Option<&NormalizedRegion>) -> f64 {
    if frame.width == 0 || frame.height == 0 {
        return 0.0;
    }
    let rect = match region {
        Some(region) => region.to_pixels(frame.width, frame.height),
        None => PixelRect {
            x: 0,
            y: 0,
            width: frame.width,
            height: frame.height,
        },
    };

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let l = frame.luma(x, y) as f64;
            sum += l;
            sum_sq += l * l;
        }
    }

    let n = (rect.width as f64) * (rect.height as f64);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Result of one stability observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readiness {
    /// Both warm-up floors have passed
    pub warmed_up: bool,
    /// Warmed up, subject detected and the stable run is long enough
    pub ready: bool,
    /// Current consecutive-run length
    pub consecutive: u32,
    /// Smoothed region after this observation
    pub region: Option<NormalizedRegion>,
    /// Focus score of this tick
    pub focus: f64,
}

/// Per-session stability record
///
/// Mutated only from the analysis tick. [`StabilityState::reset`] starts a
/// fresh session: counters, smoothed region and warm-up timer all clear.
#[derive(Debug, Clone, Default)]
pub struct StabilityState {
    started_at: Option<Instant>,
    frames_seen: u32,
    consecutive: u32,
    smoothed: Option<NormalizedRegion>,
    last_detection: Option<Instant>,
    ready: bool,
}

impl StabilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the warm-up timer restarts on the next observation
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold one tick into the state
    pub fn observe(
        &mut self,
        settings: &StabilitySettings,
        detection: Option<NormalizedRegion>,
        focus: f64,
        now: Instant,
    ) -> Readiness {
        let started_at = *self.started_at.get_or_insert(now);
        self.frames_seen = self.frames_seen.saturating_add(1);

        match detection {
            Some(region) => {
                self.smoothed = Some(match self.smoothed {
                    Some(prev) => prev.lerp(&region, settings.smoothing_alpha),
                    None => region,
                });
                self.last_detection = Some(now);

                if focus > settings.focus_threshold {
                    self.consecutive = self.consecutive.saturating_add(1);
                } else {
                    if self.consecutive > 0 {
                        trace!(focus, run = self.consecutive, "Stable run broken");
                    }
                    self.consecutive = 0;
                }
            }
            None => {
                self.consecutive = 0;
                let held_for = self
                    .last_detection
                    .map(|t| now.saturating_duration_since(t))
                    .unwrap_or(Duration::ZERO);
                if self.smoothed.is_some() && held_for > settings.region_hold() {
                    debug!(held_ms = held_for.as_millis(), "Dropping held region");
                    self.smoothed = None;
                }
            }
        }

        let warmed_up = now.saturating_duration_since(started_at) >= settings.warmup()
            && self.frames_seen >= settings.warmup_frames;
        self.ready =
            warmed_up && detection.is_some() && self.consecutive >= settings.min_stable_run.max(1);

        Readiness {
            warmed_up,
            ready: self.ready,
            consecutive: self.consecutive,
            region: self.smoothed,
            focus,
        }
    }

    pub fn smoothed_region(&self) -> Option<NormalizedRegion> {
        self.smoothed
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// When the current session's first tick was observed
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StabilitySettings {
        StabilitySettings {
            focus_threshold: 1500.0,
            min_stable_run: 3,
            warmup_ms: 100,
            warmup_frames: 0,
            smoothing_alpha: 0.5,
            region_hold_ms: 50,
        }
    }

    fn region() -> NormalizedRegion {
        NormalizedRegion::new(0.25, 0.25, 0.5, 0.5).unwrap()
    }

    #[test]
    fn variance_of_flat_frame_is_zero() {
        let data = vec![77u8; 16 * 16 * 4];
        let frame = AnalysisFrame { width: 16, height: 16, rgba: &data };
        assert!(focus_score(&frame, None).abs() < 1e-6);
    }

    #[test]
    fn variance_of_checkerboard() {
        let mut data = vec![0u8; 8 * 8 * 4];
        for (i, px) in data.chunks_exact_mut(4).enumerate() {
            let (x, y) = (i % 8, i / 8);
            let v = if (x + y) % 2 == 0 { 0 } else { 100 };
            px.copy_from_slice(&[v, v, v, 255]);
        }
        let frame = AnalysisFrame { width: 8, height: 8, rgba: &data };
        // Half 0, half 100: variance 50^2
        assert!((focus_score(&frame, None) - 2500.0).abs() < 1.0);
    }

    #[test]
    fn not_ready_before_warmup() {
        let settings = settings();
        let mut state = StabilityState::new();
        let t0 = Instant::now();
        for i in 0..5 {
            let now = t0 + Duration::from_millis(i * 10);
            let r = state.observe(&settings, Some(region()), 5000.0, now);
            assert!(!r.ready);
            assert!(!r.warmed_up);
        }
        let r = state.observe(&settings, Some(region()), 5000.0, t0 + Duration::from_millis(100));
        assert!(r.warmed_up && r.ready);
    }

    #[test]
    fn low_focus_resets_run() {
        let settings = settings();
        let mut state = StabilityState::new();
        let t0 = Instant::now();
        let late = t0 + Duration::from_millis(200);
        state.observe(&settings, Some(region()), 5000.0, t0);
        state.observe(&settings, Some(region()), 5000.0, late);
        let r = state.observe(&settings, Some(region()), 10.0, late);
        assert_eq!(r.consecutive, 0);
        assert!(!r.ready);
    }

    #[test]
    fn region_is_held_then_dropped() {
        let settings = settings();
        let mut state = StabilityState::new();
        let t0 = Instant::now();
        state.observe(&settings, Some(region()), 5000.0, t0);

        let held = state.observe(&settings, None, 0.0, t0 + Duration::from_millis(40));
        assert_eq!(held.region, Some(region()));
        assert!(!held.ready);

        let dropped = state.observe(&settings, None, 0.0, t0 + Duration::from_millis(80));
        assert_eq!(dropped.region, None);
    }

    #[test]
    fn smoothing_moves_towards_detection() {
        let settings = settings();
        let mut state = StabilityState::new();
        let t0 = Instant::now();
        state.observe(&settings, Some(region()), 0.0, t0);
        let moved = NormalizedRegion::new(0.35, 0.25, 0.5, 0.5).unwrap();
        let r = state.observe(&settings, Some(moved), 0.0, t0);
        let smoothed = r.region.unwrap();
        assert!((smoothed.x - 0.30).abs() < 1e-5);
    }

    #[test]
    fn reset_clears_everything() {
        let settings = settings();
        let mut state = StabilityState::new();
        state.observe(&settings, Some(region()), 5000.0, Instant::now());
        state.reset();
        assert_eq!(state.consecutive(), 0);
        assert_eq!(state.frames_seen(), 0);
        assert!(state.smoothed_region().is_none());
        assert!(state.started_at().is_none());
    }
}
