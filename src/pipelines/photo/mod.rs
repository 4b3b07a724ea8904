// SPDX-License-Identifier: MPL-2.0

//! Image normalizer
//!
//! Turns a raw captured frame into the artifact handed to the comparison
//! workflow:
//!
//! ```text
//! CameraFrame ─▶ crop (region or center) ─▶ resize to output size ─▶ JPEG within budget
//! ```
//!
//! The output always has the target aspect ratio, whatever the source frame
//! looks like. Encoding is CPU-bound and runs on the blocking pool so the
//! analysis loop keeps ticking.

pub mod artifact;
pub mod encoding;
pub mod processing;

pub use artifact::CapturedArtifact;
pub use encoding::{EncodeBudget, EncodedImage, encode_within_budget};
pub use processing::{CropSource, ProcessedImage, crop_and_resize, fit_crop, output_size};

use crate::backends::camera::types::CameraFrame;
use crate::config::OutputSettings;
use crate::constants::output;
use crate::errors::PhotoError;
use crate::pipelines::capture::{AspectRatio, NormalizedRegion};
use tracing::info;

/// Crop, resize and encode captured frames
#[derive(Debug, Clone)]
pub struct PhotoPipeline {
    settings: OutputSettings,
}

impl PhotoPipeline {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    /// Normalize a frame on the blocking pool
    pub async fn normalize(
        &self,
        frame: CameraFrame,
        region: Option<NormalizedRegion>,
        aspect: AspectRatio,
    ) -> Result<CapturedArtifact, PhotoError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || {
            pipeline.normalize_blocking(&frame, region.as_ref(), aspect)
        })
        .await
        .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Normalize a frame on the current thread
    pub fn normalize_blocking(
        &self,
        frame: &CameraFrame,
        region: Option<&NormalizedRegion>,
        aspect: AspectRatio,
    ) -> Result<CapturedArtifact, PhotoError> {
        let processed = crop_and_resize(frame, region, aspect, self.settings.width)?;
        let encoded = encode_within_budget(&processed.image, &EncodeBudget::from(&self.settings))?;

        info!(
            width = encoded.width,
            height = encoded.height,
            quality = encoded.quality,
            size = encoded.data.len(),
            source = ?processed.source,
            "Artifact encoded"
        );

        Ok(CapturedArtifact::new(
            encoded.data,
            output::MIME_TYPE,
            encoded.width,
            encoded.height,
            encoded.quality,
            encoded.within_budget,
        ))
    }
}

impl Default for PhotoPipeline {
    fn default() -> Self {
        Self::new(OutputSettings::default())
    }
}
