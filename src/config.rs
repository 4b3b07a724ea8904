// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under `<config_dir>/label-capture/config.json`. Every field
//! has a default so partial files and older versions keep loading.

use crate::backends::camera::CameraBackendType;
use crate::constants::{analysis, app_info, camera, output, stability, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Subject locator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Width of the downscaled analysis buffer
    pub analysis_width: u32,
    /// Ignored border as a fraction of each dimension
    pub border_margin: f32,
    /// Histogram threshold as a fraction of the peak
    pub band_threshold: f32,
    /// Smallest accepted candidate area (fraction of frame)
    pub min_area_fraction: f32,
    /// Largest accepted candidate area (fraction of frame)
    pub max_area_fraction: f32,
    /// Maximum center offset from the frame center
    pub center_tolerance: f32,
    /// Maximum residual aspect-ratio error
    pub aspect_tolerance: f32,
    /// Padding added around accepted regions
    pub padding: f32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            analysis_width: analysis::ANALYSIS_WIDTH,
            border_margin: analysis::BORDER_MARGIN,
            band_threshold: analysis::BAND_THRESHOLD,
            min_area_fraction: analysis::MIN_AREA_FRACTION,
            max_area_fraction: analysis::MAX_AREA_FRACTION,
            center_tolerance: analysis::CENTER_TOLERANCE,
            aspect_tolerance: analysis::ASPECT_TOLERANCE,
            padding: analysis::REGION_PADDING,
        }
    }
}

/// Focus and stability tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    /// Luminance variance threshold
    pub focus_threshold: f64,
    /// Consecutive in-focus ticks required
    pub min_stable_run: u32,
    /// Elapsed-time warm-up floor (milliseconds)
    pub warmup_ms: u64,
    /// Frame-count warm-up floor
    pub warmup_frames: u32,
    /// Region smoothing factor (0 < alpha <= 1)
    pub smoothing_alpha: f32,
    /// Hold time for the smoothed region without detections (milliseconds)
    pub region_hold_ms: u64,
}

impl StabilitySettings {
    /// Warm-up floor as a duration
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    /// Region hold time as a duration
    pub fn region_hold(&self) -> Duration {
        Duration::from_millis(self.region_hold_ms)
    }
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            focus_threshold: stability::FOCUS_THRESHOLD,
            min_stable_run: stability::MIN_STABLE_RUN,
            warmup_ms: stability::WARMUP_MS,
            warmup_frames: stability::WARMUP_FRAMES,
            smoothing_alpha: stability::SMOOTHING_ALPHA,
            region_hold_ms: stability::REGION_HOLD_MS,
        }
    }
}

/// Normalized artifact settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output width in pixels
    pub width: u32,
    /// First JPEG quality tried
    pub start_quality: u8,
    /// Quality floor
    pub min_quality: u8,
    /// Quality decrement per oversized attempt
    pub quality_step: u8,
    /// Byte budget for the encoded artifact
    pub max_bytes: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: output::OUTPUT_WIDTH,
            start_quality: output::START_QUALITY,
            min_quality: output::MIN_QUALITY,
            quality_step: output::QUALITY_STEP,
            max_bytes: output::MAX_BYTES,
        }
    }
}

/// Camera source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Which backend provides frames
    pub backend: CameraBackendType,
    /// V4L2 device node
    pub device_path: String,
    /// Analysis tick interval (milliseconds)
    pub tick_interval_ms: u64,
}

impl CameraSettings {
    /// Tick interval as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            device_path: camera::DEFAULT_DEVICE.to_string(),
            tick_interval_ms: timing::TICK_INTERVAL.as_millis() as u64,
        }
    }
}

/// Comparison backend settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    /// Endpoint accepting the multipart submission
    pub endpoint: Option<String>,
    /// Operator name sent with each submission
    pub operator: String,
    /// Request timeout in seconds (0 = client default)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Physical label width / height
    pub aspect_ratio: f64,
    pub analysis: AnalysisSettings,
    pub stability: StabilitySettings,
    pub output: OutputSettings,
    pub camera: CameraSettings,
    pub comparison: ComparisonSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.0,
            analysis: AnalysisSettings::default(),
            stability: StabilitySettings::default(),
            output: OutputSettings::default(),
            camera: CameraSettings::default(),
            comparison: ComparisonSettings::default(),
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_DIR).join("config.json"))
    }

    /// Load configuration, falling back to defaults
    ///
    /// A missing file is normal on first run. An unreadable or malformed
    /// file is logged and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Write configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
