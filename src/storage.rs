// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for captured label images

use crate::constants::app_info;
use crate::errors::PhotoError;
use crate::pipelines::photo::CapturedArtifact;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default directory for saved artifacts (`<pictures>/label-capture`)
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_info::APP_DIR)
}

/// File name for an artifact, from its capture time
pub fn artifact_filename(artifact: &CapturedArtifact) -> String {
    let extension = match artifact.mime_type {
        "image/png" => "png",
        _ => "jpg",
    };
    format!(
        "LABEL_{}.{}",
        artifact.captured_at.format("%Y%m%d_%H%M%S_%3f"),
        extension
    )
}

/// Save an artifact into `output_dir`, creating the directory if needed
pub async fn save_artifact(
    artifact: &CapturedArtifact,
    output_dir: &Path,
) -> Result<PathBuf, PhotoError> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(artifact_filename(artifact));
    save_artifact_to(artifact, &path).await?;
    Ok(path)
}

/// Save an artifact to an exact path
pub async fn save_artifact_to(artifact: &CapturedArtifact, path: &Path) -> Result<(), PhotoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    debug!(path = %path.display(), bytes = artifact.len(), "Writing artifact");
    tokio::fs::write(path, &artifact.data[..]).await?;
    info!(path = %path.display(), "Artifact saved");
    Ok(())
}
