// SPDX-License-Identifier: GPL-3.0-only

//! Comparison request and response types
//!
//! Backend versions disagree on key names and leave sections out freely, so
//! every field is optional or defaulted, `null` reads as empty, and the
//! known alternate spellings are accepted as aliases.

use crate::errors::ComparisonError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Free-text fields sent alongside the two images
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionMetadata {
    pub operator: String,
    pub order_number: String,
    pub product_number: String,
}

/// Treat `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// OCR results for both images
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrResult {
    #[serde(alias = "master_text", alias = "reference")]
    pub master: Option<String>,
    #[serde(alias = "scan_text", alias = "sample")]
    pub scan: Option<String>,
    #[serde(alias = "lines", alias = "line_diffs", deserialize_with = "nullable")]
    pub diffs: Vec<LineDiff>,
}

/// One differing OCR line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDiff {
    #[serde(alias = "line_number", alias = "index")]
    pub line: Option<u32>,
    #[serde(alias = "master_text", alias = "reference", alias = "expected")]
    pub master: Option<String>,
    #[serde(alias = "scan_text", alias = "sample", alias = "actual")]
    pub scan: Option<String>,
    #[serde(rename = "type", alias = "kind", alias = "op")]
    pub kind: Option<String>,
}

/// Which image a result refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "reference", alias = "MASTER")]
    Master,
    #[serde(alias = "sample", alias = "SCAN")]
    Scan,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A decoded barcode on one side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeResult {
    #[serde(alias = "source", alias = "image")]
    pub side: Side,
    #[serde(alias = "type", alias = "format")]
    pub symbology: Option<String>,
    #[serde(alias = "data", alias = "text")]
    pub value: Option<String>,
    #[serde(alias = "is_valid", alias = "ok")]
    pub valid: Option<bool>,
    #[serde(alias = "mismatch_reason", alias = "error")]
    pub reason: Option<String>,
}

/// Barcodes arrive either as one list or grouped per side
#[derive(Deserialize)]
#[serde(untagged)]
enum BarcodeSection {
    List(Vec<BarcodeResult>),
    BySide {
        #[serde(default, alias = "reference", deserialize_with = "nullable")]
        master: Vec<BarcodeResult>,
        #[serde(default, alias = "sample", deserialize_with = "nullable")]
        scan: Vec<BarcodeResult>,
    },
}

fn barcode_list<'de, D>(deserializer: D) -> Result<Vec<BarcodeResult>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<BarcodeSection>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(BarcodeSection::List(list)) => list,
        Some(BarcodeSection::BySide { master, scan }) => {
            let tag = |side: Side| {
                move |mut result: BarcodeResult| {
                    result.side = side;
                    result
                }
            };
            master
                .into_iter()
                .map(tag(Side::Master))
                .chain(scan.into_iter().map(tag(Side::Scan)))
                .collect()
        }
    })
}

/// A graphical difference box, in source-image pixels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicDiff {
    #[serde(alias = "left")]
    pub x: f64,
    #[serde(alias = "top")]
    pub y: f64,
    #[serde(alias = "width")]
    pub w: f64,
    #[serde(alias = "height")]
    pub h: f64,
    #[serde(rename = "type", alias = "kind", alias = "subtype", alias = "sub_type")]
    pub kind: Option<String>,
    #[serde(alias = "desc", alias = "label")]
    pub description: Option<String>,
}

impl GraphicDiff {
    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }
}

/// Parsed comparison response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonReport {
    #[serde(alias = "ocr_result", alias = "text")]
    pub ocr: Option<OcrResult>,
    #[serde(alias = "barcode", alias = "symbologies", deserialize_with = "barcode_list")]
    pub barcodes: Vec<BarcodeResult>,
    #[serde(
        alias = "differences",
        alias = "boxes",
        alias = "graphic_diffs",
        deserialize_with = "nullable"
    )]
    pub graphics: Vec<GraphicDiff>,
    /// Combined barcode verdict, when the backend computes one
    #[serde(rename = "match", alias = "matched", alias = "barcode_match")]
    pub barcode_match: Option<bool>,
}

impl ComparisonReport {
    /// Parse a response body
    pub fn from_json(body: &str) -> Result<Self, ComparisonError> {
        serde_json::from_str(body).map_err(|e| ComparisonError::Decode(e.to_string()))
    }

    /// Barcode values found on one side
    pub fn barcode_values(&self, side: Side) -> BTreeSet<&str> {
        self.barcodes
            .iter()
            .filter(|b| b.side == side)
            .filter_map(|b| b.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Whether master and scan barcodes disagree
    ///
    /// Uses the backend's combined flag when present, otherwise compares the
    /// sets of decoded values on each side.
    pub fn barcode_mismatch(&self) -> bool {
        if let Some(matched) = self.barcode_match {
            return !matched;
        }
        self.barcode_values(Side::Master) != self.barcode_values(Side::Scan)
    }

    /// OCR line differences, empty when OCR was not run
    pub fn line_diffs(&self) -> &[LineDiff] {
        self.ocr.as_ref().map(|o| o.diffs.as_slice()).unwrap_or(&[])
    }

    /// Whether anything at all differs
    pub fn has_differences(&self) -> bool {
        !self.line_diffs().is_empty() || !self.graphics.is_empty() || self.barcode_mismatch()
    }
}
