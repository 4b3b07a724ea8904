// SPDX-License-Identifier: GPL-3.0-only

//! Comparison backend interface
//!
//! The backend receives a master label image, a scan to verify and a few
//! metadata fields, and answers with OCR, barcode and graphical differences.
//! Only the submission and tolerant parsing live here; merging and
//! deduplicating results is left to the consumer.

pub mod client;
pub mod types;

pub use client::{ComparisonBackend, ComparisonRequest, HttpComparisonClient, ImagePart};
pub use types::{
    BarcodeResult, ComparisonReport, GraphicDiff, InspectionMetadata, LineDiff, OcrResult, Side,
};
