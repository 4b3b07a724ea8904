// SPDX-License-Identifier: GPL-3.0-only

//! Capture controller state machine
//!
//! ```text
//!            warm-up elapsed        stable run           capture landed
//!  Warmup ───────────────────▶ Scanning ─────────▶ Ready ──────────────▶ Frozen
//!    ▲  │                         │                                      │
//!    │  └──── manual capture ─────┴──────────────────────────────────────▶│
//!    │                                                                    │
//!    └─────────────────────────────── retake ─────────────────────────────┘
//! ```
//!
//! User actions never touch the stability state directly. They set request
//! flags that the next analysis tick applies, so all session state is mutated
//! from a single place.
//!
//! A processing flag gates both automatic and manual triggers: while an
//! encode is in flight nothing else fires. Each fired capture carries the
//! session generation; results from an older generation are ignored.

use super::region::{AspectRatio, NormalizedRegion};
use super::scorer::{Readiness, StabilityState};
use crate::config::StabilitySettings;
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Warm-up floor not reached; only manual capture fires
    Warmup,
    /// Evaluating readiness every tick
    Scanning,
    /// Stable and in focus; an automatic capture has been fired
    Ready,
    /// Artifact produced; analysis is suspended until a retake
    Frozen,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureState::Warmup => write!(f, "warming up"),
            CaptureState::Scanning => write!(f, "scanning"),
            CaptureState::Ready => write!(f, "ready"),
            CaptureState::Frozen => write!(f, "captured"),
        }
    }
}

/// What caused a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTrigger {
    Auto,
    Manual,
}

/// Handle for one in-flight capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    pub generation: u64,
    pub trigger: CaptureTrigger,
}

/// Decision for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    Wait,
    Fire(CaptureTicket),
}

#[derive(Debug, Default)]
struct PendingRequests {
    manual_capture: bool,
    retake: bool,
    aspect_ratio: Option<AspectRatio>,
}

pub struct CaptureController {
    state: CaptureState,
    settings: StabilitySettings,
    stability: StabilityState,
    aspect_ratio: AspectRatio,
    generation: u64,
    processing: bool,
    pending: PendingRequests,
    captured_at: Option<DateTime<Local>>,
}

impl CaptureController {
    pub fn new(settings: StabilitySettings, aspect_ratio: AspectRatio) -> Self {
        Self {
            state: CaptureState::Warmup,
            settings,
            stability: StabilityState::new(),
            aspect_ratio,
            generation: 0,
            processing: false,
            pending: PendingRequests::default(),
            captured_at: None,
        }
    }

    // User-facing requests, applied on the next tick

    /// Ask for a capture on the next tick, bypassing readiness
    pub fn request_manual_capture(&mut self) {
        self.pending.manual_capture = true;
    }

    /// Ask for the session to restart on the next tick
    pub fn request_retake(&mut self) {
        self.pending.retake = true;
    }

    /// Change the target aspect ratio; restarts the session on the next tick
    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.pending.aspect_ratio = Some(aspect_ratio);
    }

    // Tick-side operations

    /// Start a fresh session: new generation, cleared stability state
    pub fn begin_session(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = CaptureState::Warmup;
        self.processing = false;
        self.captured_at = None;
        self.pending.manual_capture = false;
        self.stability.reset();
        info!(generation = self.generation, "Capture session started");
    }

    /// Apply queued requests; returns whether the session restarted
    pub fn apply_pending(&mut self) -> bool {
        let mut restart = false;

        if let Some(aspect_ratio) = self.pending.aspect_ratio.take() {
            if aspect_ratio != self.aspect_ratio {
                debug!(
                    from = self.aspect_ratio.value(),
                    to = aspect_ratio.value(),
                    "Aspect ratio changed"
                );
                self.aspect_ratio = aspect_ratio;
                restart = true;
            }
        }
        if std::mem::take(&mut self.pending.retake) {
            debug!(state = %self.state, "Retake requested");
            restart = true;
        }

        if restart {
            self.begin_session();
        }
        restart
    }

    /// Whether this tick should sample and analyze a frame
    pub fn should_analyze(&self) -> bool {
        self.state != CaptureState::Frozen && !self.processing
    }

    /// Drop a manual request that cannot be served (no frame, frozen, busy)
    pub fn discard_manual_request(&mut self) {
        if std::mem::take(&mut self.pending.manual_capture) {
            debug!(state = %self.state, "Manual capture ignored");
        }
    }

    /// Fold one analyzed tick into the session and decide whether to fire
    pub fn observe(
        &mut self,
        detection: Option<NormalizedRegion>,
        focus: f64,
        now: Instant,
    ) -> (Readiness, ControllerAction) {
        let readiness = self.stability.observe(&self.settings, detection, focus, now);

        if !self.should_analyze() {
            self.discard_manual_request();
            return (readiness, ControllerAction::Wait);
        }

        let next = if !readiness.warmed_up {
            CaptureState::Warmup
        } else if readiness.ready {
            CaptureState::Ready
        } else {
            CaptureState::Scanning
        };
        if next != self.state {
            debug!(
                from = %self.state,
                to = %next,
                consecutive = readiness.consecutive,
                "State change"
            );
            self.state = next;
        }

        if std::mem::take(&mut self.pending.manual_capture) {
            return (readiness, self.fire(CaptureTrigger::Manual));
        }
        if self.state == CaptureState::Ready {
            return (readiness, self.fire(CaptureTrigger::Auto));
        }
        (readiness, ControllerAction::Wait)
    }

    fn fire(&mut self, trigger: CaptureTrigger) -> ControllerAction {
        self.processing = true;
        info!(generation = self.generation, ?trigger, "Capture triggered");
        ControllerAction::Fire(CaptureTicket {
            generation: self.generation,
            trigger,
        })
    }

    /// Apply the outcome of an encode
    ///
    /// Returns `true` when the result belongs to the current session and was
    /// applied. Success freezes the session; failure clears the processing
    /// flag and leaves the state where it was so the capture can be retried.
    pub fn capture_finished(&mut self, ticket: &CaptureTicket, success: bool) -> bool {
        if ticket.generation != self.generation || !self.processing {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale capture result"
            );
            return false;
        }

        self.processing = false;
        if success {
            self.state = CaptureState::Frozen;
            self.captured_at = Some(Local::now());
            info!(generation = self.generation, trigger = ?ticket.trigger, "Capture frozen");
        } else {
            debug!(state = %self.state, "Capture failed, state unchanged");
        }
        true
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn stability(&self) -> &StabilityState {
        &self.stability
    }

    /// Wall-clock time of the last successful capture in this session
    pub fn captured_at(&self) -> Option<DateTime<Local>> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn controller() -> CaptureController {
        let settings = StabilitySettings {
            focus_threshold: 1500.0,
            min_stable_run: 2,
            warmup_ms: 50,
            warmup_frames: 0,
            smoothing_alpha: 0.3,
            region_hold_ms: 1000,
        };
        let mut controller = CaptureController::new(settings, AspectRatio::new(1.0));
        controller.begin_session();
        controller
    }

    fn region() -> Option<NormalizedRegion> {
        NormalizedRegion::new(0.3, 0.3, 0.4, 0.4)
    }

    #[test]
    fn auto_fires_once_after_warmup() {
        let mut c = controller();
        let t0 = Instant::now();

        let (_, action) = c.observe(region(), 5000.0, t0);
        assert_eq!(action, ControllerAction::Wait);
        assert_eq!(c.state(), CaptureState::Warmup);

        let later = t0 + Duration::from_millis(60);
        let (_, action) = c.observe(region(), 5000.0, later);
        let ticket = match action {
            ControllerAction::Fire(ticket) => ticket,
            other => panic!("expected fire, got {other:?}"),
        };
        assert_eq!(ticket.trigger, CaptureTrigger::Auto);
        assert!(c.is_processing());
        assert!(!c.should_analyze());

        // Still processing: nothing else fires
        let (_, action) = c.observe(region(), 5000.0, later);
        assert_eq!(action, ControllerAction::Wait);

        assert!(c.capture_finished(&ticket, true));
        assert_eq!(c.state(), CaptureState::Frozen);
        assert!(c.captured_at().is_some());
    }

    #[test]
    fn manual_fires_during_warmup() {
        let mut c = controller();
        c.request_manual_capture();
        let (_, action) = c.observe(None, 0.0, Instant::now());
        assert!(matches!(
            action,
            ControllerAction::Fire(CaptureTicket {
                trigger: CaptureTrigger::Manual,
                ..
            })
        ));
    }

    #[test]
    fn failed_capture_keeps_state() {
        let mut c = controller();
        c.request_manual_capture();
        let (_, action) = c.observe(None, 0.0, Instant::now());
        let ControllerAction::Fire(ticket) = action else {
            panic!("expected fire");
        };
        assert!(c.capture_finished(&ticket, false));
        assert_eq!(c.state(), CaptureState::Warmup);
        assert!(!c.is_processing());
        assert!(c.should_analyze());
    }

    #[test]
    fn retake_invalidates_in_flight_capture() {
        let mut c = controller();
        c.request_manual_capture();
        let (_, action) = c.observe(None, 0.0, Instant::now());
        let ControllerAction::Fire(ticket) = action else {
            panic!("expected fire");
        };

        c.request_retake();
        assert!(c.apply_pending());
        assert!(!c.capture_finished(&ticket, true));
        assert_eq!(c.state(), CaptureState::Warmup);
    }

    #[test]
    fn same_aspect_does_not_restart() {
        let mut c = controller();
        let t0 = Instant::now();
        c.observe(region(), 5000.0, t0);
        let generation = c.generation();

        c.set_aspect_ratio(AspectRatio::new(1.0));
        assert!(!c.apply_pending());
        assert_eq!(c.generation(), generation);
        assert_eq!(c.stability().consecutive(), 1);
    }

    #[test]
    fn aspect_change_resets_stability() {
        let mut c = controller();
        let t0 = Instant::now();
        c.observe(region(), 5000.0, t0);
        c.observe(region(), 5000.0, t0 + Duration::from_millis(10));
        assert_eq!(c.stability().consecutive(), 2);
        assert!(c.stability().smoothed_region().is_some());
        let generation = c.generation();

        c.set_aspect_ratio(AspectRatio::new(2.0));
        assert!(c.apply_pending());
        assert_eq!(c.generation(), generation + 1);
        assert_eq!(c.aspect_ratio().value(), 2.0);
        assert_eq!(c.state(), CaptureState::Warmup);
        assert_eq!(c.stability().consecutive(), 0);
        assert_eq!(c.stability().smoothed_region(), None);
        assert_eq!(c.stability().started_at(), None);
        assert_eq!(c.stability().frames_seen(), 0);

        // Warm-up timer restarts from the first tick after the change
        let t1 = t0 + Duration::from_millis(500);
        let (readiness, action) = c.observe(region(), 5000.0, t1);
        assert_eq!(c.stability().started_at(), Some(t1));
        assert!(!readiness.warmed_up);
        assert_eq!(action, ControllerAction::Wait);
    }

    #[test]
    fn manual_request_discarded_while_frozen() {
        let mut c = controller();
        c.request_manual_capture();
        let (_, action) = c.observe(None, 0.0, Instant::now());
        let ControllerAction::Fire(ticket) = action else {
            panic!("expected fire");
        };
        c.capture_finished(&ticket, true);

        c.request_manual_capture();
        let (_, action) = c.observe(region(), 5000.0, Instant::now());
        assert_eq!(action, ControllerAction::Wait);
        assert_eq!(c.state(), CaptureState::Frozen);
    }
}
