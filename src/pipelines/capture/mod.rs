// SPDX-License-Identifier: GPL-3.0-only

//! Auto-framing capture pipeline
//!
//! ```text
//! VideoSource ─▶ FrameSampler ─▶ SubjectLocator ─▶ focus score + StabilityState
//!                                                        │
//!                                                        ▼
//!                         PhotoPipeline ◀── fire ── CaptureController
//! ```
//!
//! [`CaptureSession`] runs one tick of this chain without threads of its own;
//! [`LabelCamera`] drives a session from a live source.

pub mod controller;
pub mod locator;
pub mod region;
pub mod runner;
pub mod sampler;
pub mod scorer;
pub mod session;

pub use controller::{
    CaptureController, CaptureState, CaptureTicket, CaptureTrigger, ControllerAction,
};
pub use locator::{Rejection, SubjectLocator};
pub use region::{AspectRatio, NormalizedRegion, PixelRect};
pub use runner::{CaptureCallback, CaptureEvent, LabelCamera};
pub use sampler::{AnalysisFrame, FrameSampler};
pub use scorer::{Readiness, StabilityState, focus_score};
pub use session::{CaptureRequest, CaptureSession, Feedback, SkipReason, TickOutcome};
