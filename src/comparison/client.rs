// SPDX-License-Identifier: GPL-3.0-only

//! HTTP client for the comparison backend

use super::types::{ComparisonReport, InspectionMetadata};
use crate::config::ComparisonSettings;
use crate::errors::ComparisonError;
use crate::pipelines::photo::CapturedArtifact;
use reqwest::multipart::{Form, Part};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest error body kept in a [`ComparisonError::Status`]
const MAX_ERROR_BODY: usize = 300;

/// One image of a comparison submission
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub data: Arc<[u8]>,
    pub mime_type: String,
    pub file_name: String,
}

impl ImagePart {
    pub fn from_artifact(artifact: &CapturedArtifact, file_name: &str) -> Self {
        Self {
            data: Arc::clone(&artifact.data),
            mime_type: artifact.mime_type.to_string(),
            file_name: file_name.to_string(),
        }
    }

    /// Read an image file, guessing the MIME type from its extension
    pub async fn from_path(path: &Path) -> Result<Self, ComparisonError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ComparisonError::Request(format!("{}: {}", path.display(), e)))?;

        let mime_type = match image::ImageFormat::from_path(path) {
            Ok(image::ImageFormat::Png) => "image/png",
            Ok(image::ImageFormat::WebP) => "image/webp",
            Ok(image::ImageFormat::Bmp) => "image/bmp",
            _ => "image/jpeg",
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image.jpg".to_string());

        Ok(Self {
            data: Arc::from(data.into_boxed_slice()),
            mime_type: mime_type.to_string(),
            file_name,
        })
    }

    fn into_part(self) -> Result<Part, ComparisonError> {
        Part::bytes(self.data.to_vec())
            .file_name(self.file_name)
            .mime_str(&self.mime_type)
            .map_err(|e| ComparisonError::Request(e.to_string()))
    }
}

/// Master and scan images plus metadata
#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub master: Option<ImagePart>,
    pub scan: Option<ImagePart>,
    pub metadata: InspectionMetadata,
}

impl ComparisonRequest {
    fn into_form(self) -> Result<Form, ComparisonError> {
        let master = self.master.ok_or(ComparisonError::MissingImage("master"))?;
        let scan = self.scan.ok_or(ComparisonError::MissingImage("scan"))?;

        Ok(Form::new()
            .part("master", master.into_part()?)
            .part("scan", scan.into_part()?)
            .text("operator", self.metadata.operator)
            .text("order_number", self.metadata.order_number)
            .text("product_number", self.metadata.product_number))
    }
}

/// Something that compares a master label image against a scan
pub trait ComparisonBackend {
    fn compare(
        &self,
        request: ComparisonRequest,
    ) -> impl Future<Output = Result<ComparisonReport, ComparisonError>> + Send;
}

/// Comparison backend reached over HTTP with a multipart upload
#[derive(Debug, Clone)]
pub struct HttpComparisonClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpComparisonClient {
    pub fn new(settings: &ComparisonSettings) -> Result<Self, ComparisonError> {
        let endpoint = settings
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ComparisonError::NotConfigured)?;

        let mut builder = reqwest::Client::builder();
        if settings.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| ComparisonError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ComparisonBackend for HttpComparisonClient {
    async fn compare(
        &self,
        request: ComparisonRequest,
    ) -> Result<ComparisonReport, ComparisonError> {
        let form = request.into_form()?;
        info!(endpoint = %self.endpoint, "Submitting comparison");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ComparisonError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ComparisonError::Request(e.to_string()))?;

        if !status.is_success() {
            let mut message = body.trim().to_string();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| message.is_char_boundary(i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            warn!(status = status.as_u16(), "Comparison backend rejected submission");
            return Err(ComparisonError::Status(status.as_u16(), message));
        }

        let report = ComparisonReport::from_json(&body)?;
        debug!(
            line_diffs = report.line_diffs().len(),
            barcodes = report.barcodes.len(),
            graphics = report.graphics.len(),
            "Comparison report received"
        );
        Ok(report)
    }
}
