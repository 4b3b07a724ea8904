// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The capture pipeline pulls frames from exactly one [`VideoSource`] per
//! capture instance.
//!
//! ```text
//! ┌─────────────────────┐
//! │   Capture session   │
//! └──────────┬──────────┘
//!            │ ready_frame() once per tick
//!            ▼
//! ┌─────────────────────┐
//! │  VideoSource trait  │  ← start / stop / readiness
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌──────────┐
//!   │ V4L2 │  │ Files    │
//!   └──────┘  └──────────┘
//! ```

pub mod format_converters;
pub mod frame_loop;
pub mod types;
pub mod v4l2;

pub use frame_loop::{FrameLoop, Liveness, LoopAction};
pub use types::*;
pub use v4l2::{V4l2Source, enumerate_cameras};

use crate::backends::virtual_camera::FileSource;
use crate::config::CameraSettings;
use std::path::PathBuf;

/// A live stream of camera frames
///
/// Implementations own their device handles and threads. `stop` must halt
/// every underlying track before it returns.
pub trait VideoSource: Send {
    /// Acquire the device and begin streaming
    ///
    /// Errors here are the "device unavailable" family (no device, permission
    /// denied, busy) and are terminal for the capture session.
    fn start(&mut self) -> BackendResult<()>;

    /// Stop streaming and release the device
    fn stop(&mut self);

    /// Pixel dimensions of the stream, `(0, 0)` until negotiated
    fn dimensions(&self) -> (u32, u32);

    /// Whether at least one frame has been decoded
    fn is_ready(&self) -> bool;

    /// Most recent decoded frame, if any
    ///
    /// `None` during startup is normal; callers retry on the next tick.
    fn latest_frame(&mut self) -> Option<CameraFrame>;

    /// Short description for logs
    fn describe(&self) -> String;

    /// Latest frame, only once the stream is ready with nonzero dimensions
    ///
    /// This is what the analysis tick samples; `None` means "try again on
    /// the next tick".
    fn ready_frame(&mut self) -> Option<CameraFrame> {
        let (width, height) = self.dimensions();
        if !self.is_ready() || width == 0 || height == 0 {
            return None;
        }
        self.latest_frame()
    }
}

/// Build the video source selected in the configuration
///
/// `files` are only used by the file backend.
pub fn open_source(settings: &CameraSettings, files: Vec<PathBuf>) -> Box<dyn VideoSource> {
    match settings.backend {
        CameraBackendType::V4l2 => Box::new(V4l2Source::new(&settings.device_path)),
        CameraBackendType::File => Box::new(FileSource::new(files, settings.tick_interval())),
    }
}
