// SPDX-License-Identifier: GPL-3.0-only

//! Image files as a video source
//!
//! Each file is shown for one frame interval, in order; the last file is
//! held for as long as the source keeps running.

use crate::backends::camera::VideoSource;
use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }
    if !path.exists() {
        return Err(BackendError::DeviceNotFound(path.display().to_string()));
    }

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    debug!(path = %path.display(), width, height, "Image loaded");

    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Replays decoded images at a fixed frame interval
pub struct FileSource {
    paths: Vec<PathBuf>,
    frames: Vec<CameraFrame>,
    frame_duration: Duration,
    started_at: Option<Instant>,
}

impl FileSource {
    /// Source that decodes `paths` when started
    pub fn new(paths: Vec<PathBuf>, frame_duration: Duration) -> Self {
        Self {
            paths,
            frames: Vec::new(),
            frame_duration,
            started_at: None,
        }
    }

    /// Source over frames already in memory
    pub fn from_frames(frames: Vec<CameraFrame>, frame_duration: Duration) -> Self {
        Self {
            paths: Vec::new(),
            frames,
            frame_duration,
            started_at: None,
        }
    }

    fn current_index(&self, now: Instant) -> Option<usize> {
        let started_at = self.started_at?;
        if self.frames.is_empty() {
            return None;
        }
        let step = self.frame_duration.as_nanos().max(1);
        let index = (now.saturating_duration_since(started_at).as_nanos() / step) as usize;
        Some(index.min(self.frames.len() - 1))
    }
}

impl VideoSource for FileSource {
    fn start(&mut self) -> BackendResult<()> {
        if self.frames.is_empty() {
            for path in &self.paths {
                self.frames.push(load_image_as_frame(path)?);
            }
        }
        if self.frames.is_empty() {
            return Err(BackendError::NotAvailable("No input images".into()));
        }

        info!(frames = self.frames.len(), "File source started");
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        self.started_at = None;
    }

    fn dimensions(&self) -> (u32, u32) {
        self.current_index(Instant::now())
            .map(|i| (self.frames[i].width, self.frames[i].height))
            .unwrap_or((0, 0))
    }

    fn is_ready(&self) -> bool {
        self.started_at.is_some() && !self.frames.is_empty()
    }

    fn latest_frame(&mut self) -> Option<CameraFrame> {
        let now = Instant::now();
        let index = self.current_index(now)?;
        let mut frame = self.frames[index].clone();
        frame.captured_at = now;
        Some(frame)
    }

    fn describe(&self) -> String {
        format!("{} image frame(s)", self.frames.len().max(self.paths.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_started() {
        let mut source = FileSource::from_frames(
            vec![CameraFrame::from_rgba(2, 2, vec![0; 16])],
            Duration::from_millis(10),
        );
        assert!(!source.is_ready());
        assert!(source.latest_frame().is_none());
        assert_eq!(source.dimensions(), (0, 0));

        source.start().unwrap();
        assert!(source.is_ready());
        assert_eq!(source.dimensions(), (2, 2));

        source.stop();
        assert!(source.latest_frame().is_none());
    }

    #[test]
    fn empty_source_fails_to_start() {
        let mut source = FileSource::new(Vec::new(), Duration::from_millis(10));
        assert!(matches!(source.start(), Err(BackendError::NotAvailable(_))));
    }

    #[test]
    fn missing_file_is_device_not_found() {
        let result = load_image_as_frame(Path::new("/nonexistent/label.png"));
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn holds_last_frame() {
        let frames = vec![
            CameraFrame::from_rgba(1, 1, vec![0, 0, 0, 255]),
            CameraFrame::from_rgba(1, 1, vec![255, 255, 255, 255]),
        ];
        let mut source = FileSource::from_frames(frames, Duration::from_millis(1));
        source.start().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let frame = source.latest_frame().unwrap();
        assert_eq!(frame.pixel(0, 0), [255, 255, 255, 255]);
    }
}
