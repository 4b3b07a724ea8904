// SPDX-License-Identifier: MPL-2.0

//! Capture and normalization pipelines
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌────────────────────┐
//! │ Camera Frame │ ──▶ │  Capture Pipeline  │ ──▶ │   Photo Pipeline   │
//! │   (RGBA)     │     │  - sample          │     │  - crop            │
//! │              │     │  - locate subject  │     │  - resize          │
//! │              │     │  - focus/stability │     │  - JPEG in budget  │
//! │              │     │  - state machine   │     │                    │
//! └──────────────┘     └────────────────────┘     └────────────────────┘
//! ```
//!
//! - [`capture`]: per-tick analysis, auto-capture decisions and the live runner
//! - [`photo`]: turns a chosen frame and region into a [`photo::CapturedArtifact`]

pub mod capture;
pub mod photo;
