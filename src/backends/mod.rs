// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame acquisition
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Capture pipeline                │
//! └────────────────────┬────────────────────────┘
//!                      │ VideoSource
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │   Camera    │    │  Virtual camera  │    │
//! │  │   (V4L2)    │    │  (image files)   │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Source trait, frame types, V4L2 capture and the frame loop
//! - [`virtual_camera`]: Image files replayed as a stream

pub mod camera;
pub mod virtual_camera;
