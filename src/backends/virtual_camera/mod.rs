// SPDX-License-Identifier: GPL-3.0-only

//! File-backed video source
//!
//! Replays still images as if they came from a camera, at the analysis
//! cadence. Used by the command line (`--frames`) and by tests to drive the
//! capture pipeline deterministically.

mod file_source;

pub use file_source::{FileSource, load_image_as_frame};
