// SPDX-License-Identifier: MPL-2.0

//! Label Capture - camera auto-framing for label inspection
//!
//! This library captures a printed label from a live camera, decides when it
//! is well framed and in focus, and produces a cropped, fixed-aspect,
//! size-bounded JPEG for submission to a comparison backend.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Video sources (V4L2 cameras, image files) and the frame loop
//! - [`pipelines`]: Capture analysis/state machine and image normalization
//! - [`comparison`]: Comparison backend types and HTTP client
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving captured artifacts
//!
//! # Example
//!
//! ```ignore
//! let source = open_source(&config.camera, Vec::new());
//! let (camera, events) = LabelCamera::start(source, &config, handle, |artifact, preview_uri| {
//!     println!("captured {} bytes", artifact.len());
//! })?;
//! ```

pub mod backends;
pub mod comparison;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::{CameraFrame, VideoSource};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use pipelines::capture::{
    AspectRatio, CaptureEvent, CaptureSession, CaptureState, LabelCamera, NormalizedRegion,
};
pub use pipelines::photo::{CapturedArtifact, PhotoPipeline};
