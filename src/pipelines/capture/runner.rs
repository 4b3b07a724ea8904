// SPDX-License-Identifier: GPL-3.0-only

//! Live auto-capture runner
//!
//! [`LabelCamera`] wires one [`VideoSource`] to one [`CaptureSession`] and
//! drives it from a [`FrameLoop`]. Encoding happens on the tokio blocking
//! pool; the result comes back through a oneshot channel that the next tick
//! polls, so session state is only ever touched from the loop thread.
//!
//! User actions are sent over a command channel and become request flags on
//! the session, applied at the top of the next tick.

use super::controller::{CaptureState, CaptureTicket};
use super::region::{AspectRatio, NormalizedRegion};
use super::session::{CaptureSession, Feedback, TickOutcome};
use crate::backends::camera::{FrameLoop, Liveness, LoopAction, VideoSource};
use crate::config::Config;
use crate::constants::{stability, timing};
use crate::errors::{CameraError, PhotoError};
use crate::pipelines::photo::{CapturedArtifact, PhotoPipeline};
use futures::channel::{mpsc, oneshot};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Invoked once per successful capture with the artifact and its preview URI
pub type CaptureCallback = Box<dyn FnMut(&CapturedArtifact, &str) + Send>;

/// Events published by a running [`LabelCamera`]
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Source started; analysis is running
    Started { source: String },
    /// Controller moved to a new state
    StateChanged(CaptureState),
    /// Readiness, detection or the smoothed region changed
    Feedback(Feedback),
    /// Show a brief flash
    Flash(Duration),
    /// An artifact was produced
    Captured(CapturedArtifact),
    /// An encode failed; the session keeps running
    CaptureFailed(String),
    /// Loop stopped and source released
    Stopped,
}

#[derive(Debug)]
enum Command {
    CaptureNow,
    Retake,
    SetAspectRatio(AspectRatio),
}

struct InFlight {
    ticket: CaptureTicket,
    result: oneshot::Receiver<Result<CapturedArtifact, PhotoError>>,
}

/// State owned by the loop thread
struct LoopState {
    source: Box<dyn VideoSource>,
    session: CaptureSession,
    pipeline: PhotoPipeline,
    runtime: Handle,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<CaptureEvent>,
    on_capture: CaptureCallback,
    in_flight: Option<InFlight>,
    liveness: Liveness,
    last_state: CaptureState,
    last_ready: bool,
    last_detected: bool,
    last_region: Option<NormalizedRegion>,
}

impl LoopState {
    fn tick(&mut self) -> LoopAction {
        loop {
            match self.commands.try_next() {
                Ok(Some(command)) => self.apply(command),
                Ok(None) => {
                    debug!("Command channel closed, stopping capture loop");
                    return LoopAction::Stop;
                }
                Err(_) => break,
            }
        }

        self.poll_in_flight();

        let frame = self.source.ready_frame();
        match self.session.tick(frame.as_ref(), Instant::now()) {
            TickOutcome::Skipped(_) => {}
            TickOutcome::Analyzed(feedback) => self.publish_feedback(feedback),
            TickOutcome::Fire(request) => {
                let (tx, rx) = oneshot::channel();
                let pipeline = self.pipeline.clone();
                let liveness = self.liveness.clone();
                let ticket = request.ticket;

                self.runtime.spawn(async move {
                    let result = pipeline
                        .normalize(request.frame, request.region, request.aspect)
                        .await;
                    if liveness.is_alive() {
                        let _ = tx.send(result);
                    } else {
                        debug!("Capture finished after stop, discarding");
                    }
                });

                self.in_flight = Some(InFlight { ticket, result: rx });
                self.publish_feedback(request.feedback);
            }
        }

        self.publish_state();
        LoopAction::Continue
    }

    fn apply(&mut self, command: Command) {
        debug!(?command, "Capture command");
        match command {
            Command::CaptureNow => self.session.capture_now(),
            Command::Retake => self.session.retake(),
            Command::SetAspectRatio(aspect) => self.session.set_aspect_ratio(aspect),
        }
    }

    fn poll_in_flight(&mut self) {
        let Some(flight) = self.in_flight.as_mut() else {
            return;
        };
        let result = match flight.result.try_recv() {
            Ok(Some(result)) => result,
            Ok(None) => return,
            Err(oneshot::Canceled) => {
                Err(PhotoError::EncodingFailed("Encode task dropped".into()))
            }
        };
        let ticket = flight.ticket;
        self.in_flight = None;

        if !self.liveness.is_alive() {
            return;
        }

        let failure = result.as_ref().err().map(|e| e.to_string());
        match self.session.complete(ticket, result) {
            Some(artifact) => {
                self.emit(CaptureEvent::Flash(timing::FLASH_DURATION));
                let preview_uri = artifact.preview_uri();
                (self.on_capture)(&artifact, &preview_uri);
                self.emit(CaptureEvent::Captured(artifact));
            }
            None => {
                if let Some(message) = failure {
                    self.emit(CaptureEvent::CaptureFailed(message));
                }
            }
        }
    }

    fn publish_feedback(&mut self, feedback: Feedback) {
        let detected = feedback.detection.is_some();
        let moved = region_moved(self.last_region.as_ref(), feedback.region.as_ref());
        if feedback.ready != self.last_ready || detected != self.last_detected || moved {
            self.last_ready = feedback.ready;
            self.last_detected = detected;
            self.last_region = feedback.region;
            self.emit(CaptureEvent::Feedback(feedback));
        }
    }

    fn publish_state(&mut self) {
        let state = self.session.state();
        if state != self.last_state {
            self.last_state = state;
            self.emit(CaptureEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: CaptureEvent) {
        let _ = self.events.unbounded_send(event);
    }
}

/// Whether the framing shown to the user would visibly change
fn region_moved(previous: Option<&NormalizedRegion>, next: Option<&NormalizedRegion>) -> bool {
    match (previous, next) {
        (Some(a), Some(b)) => [a.x - b.x, a.y - b.y, a.width - b.width, a.height - b.height]
            .iter()
            .any(|d| d.abs() > stability::FEEDBACK_EPSILON),
        (None, None) => false,
        _ => true,
    }
}

impl Drop for LoopState {
    fn drop(&mut self) {
        self.source.stop();
        self.emit(CaptureEvent::Stopped);
        info!("Capture source released");
    }
}

/// Handle to a running auto-capture pipeline
///
/// Dropping the handle stops the loop and releases the camera.
pub struct LabelCamera {
    commands: mpsc::UnboundedSender<Command>,
    frame_loop: FrameLoop,
}

impl LabelCamera {
    /// Start the source and the analysis loop
    ///
    /// Device errors are returned before any loop is started; the pipeline
    /// stays inert. Encodes are spawned on `runtime`.
    pub fn start<C>(
        mut source: Box<dyn VideoSource>,
        config: &Config,
        runtime: Handle,
        on_capture: C,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CaptureEvent>), CameraError>
    where
        C: FnMut(&CapturedArtifact, &str) + Send + 'static,
    {
        source.start().map_err(CameraError::from)?;
        let description = source.describe();
        info!(source = %description, aspect_ratio = config.aspect_ratio, "Label camera started");

        let (command_tx, command_rx) = mpsc::unbounded();
        let (event_tx, event_rx) = mpsc::unbounded();
        let _ = event_tx.unbounded_send(CaptureEvent::Started {
            source: description,
        });

        let session = CaptureSession::new(config);
        let pipeline = PhotoPipeline::new(config.output.clone());
        let on_capture: CaptureCallback = Box::new(on_capture);
        let last_state = session.state();

        let frame_loop = FrameLoop::start_with_init(
            "label-capture",
            config.camera.tick_interval(),
            move |liveness| {
                Ok(LoopState {
                    source,
                    session,
                    pipeline,
                    runtime,
                    commands: command_rx,
                    events: event_tx,
                    on_capture,
                    in_flight: None,
                    liveness,
                    last_state,
                    last_ready: false,
                    last_detected: false,
                    last_region: None,
                })
            },
            |state: &mut LoopState| state.tick(),
        );

        Ok((
            Self {
                commands: command_tx,
                frame_loop,
            },
            event_rx,
        ))
    }

    /// Capture on the next tick regardless of readiness
    pub fn capture_now(&self) {
        self.send(Command::CaptureNow);
    }

    /// Discard the current artifact and start a fresh session
    pub fn retake(&self) {
        self.send(Command::Retake);
    }

    /// Change the target aspect ratio; restarts the session
    pub fn set_aspect_ratio(&self, aspect: AspectRatio) {
        self.send(Command::SetAspectRatio(aspect));
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Stop analysis and release the source
    ///
    /// No tick runs after this returns, and encodes still in flight are
    /// discarded.
    pub fn stop(&mut self) {
        self.commands.close_channel();
        self.frame_loop.stop();
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.unbounded_send(command) {
            warn!(error = %e, "Capture loop is not running");
        }
    }
}
