// SPDX-License-Identifier: GPL-3.0-only

//! One capture session, driven tick by tick
//!
//! [`CaptureSession`] owns every piece of per-session state: the analysis
//! buffer, the locator scratch space and the controller with its stability
//! record. It has no threads or clocks of its own; the caller hands it the
//! latest frame and the current instant, which keeps it fully deterministic
//! under test.

use super::controller::{CaptureController, CaptureState, CaptureTicket, ControllerAction};
use super::locator::SubjectLocator;
use super::region::{AspectRatio, NormalizedRegion};
use super::sampler::FrameSampler;
use super::scorer::{Readiness, focus_score};
use crate::backends::camera::CameraFrame;
use crate::config::Config;
use crate::constants::timing;
use crate::errors::PhotoError;
use crate::pipelines::photo::CapturedArtifact;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Why a tick did no analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Session is frozen on a captured artifact
    Frozen,
    /// A capture encode is in flight
    Processing,
    /// The source has not produced a usable frame yet
    NoFrame,
}

/// Per-tick feedback for the user interface
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub state: CaptureState,
    /// Region detected in this tick
    pub detection: Option<NormalizedRegion>,
    /// Smoothed region shown to the user
    pub region: Option<NormalizedRegion>,
    pub focus: f64,
    pub consecutive: u32,
    pub warmed_up: bool,
    pub ready: bool,
}

impl Feedback {
    fn new(
        state: CaptureState,
        detection: Option<NormalizedRegion>,
        readiness: &Readiness,
    ) -> Self {
        Self {
            state,
            detection,
            region: readiness.region,
            focus: readiness.focus,
            consecutive: readiness.consecutive,
            warmed_up: readiness.warmed_up,
            ready: readiness.ready,
        }
    }
}

/// Everything the normalizer needs for one capture
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub ticket: CaptureTicket,
    /// Full-resolution frame the capture was taken from
    pub frame: CameraFrame,
    /// Region to crop to; `None` selects the centered fallback
    pub region: Option<NormalizedRegion>,
    pub aspect: AspectRatio,
    pub feedback: Feedback,
}

/// Result of one tick
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Skipped(SkipReason),
    Analyzed(Feedback),
    /// Start encoding; report back through [`CaptureSession::complete`]
    Fire(CaptureRequest),
}

pub struct CaptureSession {
    sampler: FrameSampler,
    locator: SubjectLocator,
    controller: CaptureController,
    artifact: Option<CapturedArtifact>,
    ticks: u64,
}

impl CaptureSession {
    pub fn new(config: &Config) -> Self {
        let mut controller = CaptureController::new(
            config.stability.clone(),
            AspectRatio::new(config.aspect_ratio),
        );
        controller.begin_session();

        Self {
            sampler: FrameSampler::new(config.analysis.analysis_width),
            locator: SubjectLocator::new(config.analysis.clone()),
            controller,
            artifact: None,
            ticks: 0,
        }
    }

    /// Queue a manual capture for the next tick
    pub fn capture_now(&mut self) {
        self.controller.request_manual_capture();
    }

    /// Queue a retake for the next tick
    pub fn retake(&mut self) {
        self.controller.request_retake();
    }

    /// Queue an aspect ratio change for the next tick
    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) {
        self.controller.set_aspect_ratio(aspect);
    }

    /// Run one analysis tick
    pub fn tick(&mut self, frame: Option<&CameraFrame>, now: Instant) -> TickOutcome {
        self.ticks += 1;

        if self.controller.apply_pending() {
            if self.artifact.take().is_some() {
                debug!("Previous artifact discarded");
            }
        }

        if !self.controller.should_analyze() {
            self.controller.discard_manual_request();
            let reason = if self.controller.is_processing() {
                SkipReason::Processing
            } else {
                SkipReason::Frozen
            };
            return TickOutcome::Skipped(reason);
        }

        let Some(frame) = frame.filter(|f| f.is_valid()) else {
            self.controller.discard_manual_request();
            return TickOutcome::Skipped(SkipReason::NoFrame);
        };
        let aspect = self.controller.aspect_ratio();

        let Some(sampled) = self.sampler.sample(frame) else {
            self.controller.discard_manual_request();
            return TickOutcome::Skipped(SkipReason::NoFrame);
        };

        let detection = self.locator.locate(&sampled, aspect);
        let focus_region = detection.or(self.controller.stability().smoothed_region());
        let focus = focus_score(&sampled, focus_region.as_ref());

        let (readiness, action) = self.controller.observe(detection, focus, now);
        let feedback = Feedback::new(self.controller.state(), detection, &readiness);

        if self.ticks % timing::FRAME_LOG_INTERVAL == 0 {
            trace!(
                state = %feedback.state,
                focus,
                consecutive = feedback.consecutive,
                detected = detection.is_some(),
                "Analysis tick"
            );
        }

        match action {
            ControllerAction::Wait => TickOutcome::Analyzed(feedback),
            ControllerAction::Fire(ticket) => TickOutcome::Fire(CaptureRequest {
                ticket,
                frame: frame.clone(),
                region: readiness.region,
                aspect,
                feedback,
            }),
        }
    }

    /// Apply the result of an encode started by [`TickOutcome::Fire`]
    ///
    /// Returns the artifact when the capture landed in the current session.
    /// Results for an older session, and failures, return `None`.
    pub fn complete(
        &mut self,
        ticket: CaptureTicket,
        result: Result<CapturedArtifact, PhotoError>,
    ) -> Option<CapturedArtifact> {
        let success = result.is_ok();
        if !self.controller.capture_finished(&ticket, success) {
            return None;
        }

        match result {
            Ok(artifact) => {
                self.artifact = Some(artifact.clone());
                Some(artifact)
            }
            Err(e) => {
                warn!(error = %e, "Capture attempt failed");
                None
            }
        }
    }

    pub fn state(&self) -> CaptureState {
        self.controller.state()
    }

    pub fn controller(&self) -> &CaptureController {
        &self.controller
    }

    /// The live artifact of this session, if captured
    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        self.artifact.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> Config {
        let mut config = Config::default();
        config.stability.warmup_ms = 0;
        config.stability.min_stable_run = 1;
        config
    }

    #[test]
    fn missing_frame_is_skipped() {
        let mut session = CaptureSession::new(&config());
        assert!(matches!(
            session.tick(None, Instant::now()),
            TickOutcome::Skipped(SkipReason::NoFrame)
        ));
    }

    #[test]
    fn manual_capture_without_frame_is_a_no_op() {
        let mut session = CaptureSession::new(&config());
        session.capture_now();
        session.tick(None, Instant::now());
        assert_eq!(session.state(), CaptureState::Warmup);
        assert!(!session.controller().is_processing());

        // The request does not linger for a later frame
        let frame = CameraFrame::from_rgba(64, 48, vec![128; 64 * 48 * 4]);
        let outcome = session.tick(Some(&frame), Instant::now() + Duration::from_millis(1));
        assert!(matches!(outcome, TickOutcome::Analyzed(_)));
    }

    #[test]
    fn manual_capture_with_frame_fires() {
        let mut session = CaptureSession::new(&config());
        let frame = CameraFrame::from_rgba(64, 48, vec![128; 64 * 48 * 4]);
        session.capture_now();
        match session.tick(Some(&frame), Instant::now()) {
            TickOutcome::Fire(request) => {
                assert!(request.region.is_none());
                assert_eq!(request.frame.width, 64);
            }
            other => panic!("expected fire, got {other:?}"),
        }
        assert!(matches!(
            session.tick(Some(&frame), Instant::now()),
            TickOutcome::Skipped(SkipReason::Processing)
        ));
    }
}
