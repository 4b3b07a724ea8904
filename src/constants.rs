// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Defaults for every tunable live here; [`crate::config::Config`] starts
//! from these values and user configuration overrides them.

use std::time::Duration;

/// Frame analysis (sampler + subject locator)
pub mod analysis {
    /// Width of the downscaled analysis buffer in pixels
    pub const ANALYSIS_WIDTH: u32 = 320;

    /// Fraction of each dimension ignored at the frame border
    pub const BORDER_MARGIN: f32 = 0.06;

    /// Histogram bins above this fraction of the peak belong to the subject band
    pub const BAND_THRESHOLD: f32 = 0.38;

    /// Smallest accepted candidate area as a fraction of the frame
    pub const MIN_AREA_FRACTION: f32 = 0.04;

    /// Largest accepted candidate area as a fraction of the frame
    ///
    /// A band covering most of the inner frame means no subject boundary
    /// was found (background fills the frame).
    pub const MAX_AREA_FRACTION: f32 = 0.65;

    /// Maximum distance of the candidate center from the frame center
    /// (fraction of each dimension)
    pub const CENTER_TOLERANCE: f32 = 0.25;

    /// Maximum residual aspect-ratio error after fitting to the target ratio
    pub const ASPECT_TOLERANCE: f32 = 0.30;

    /// Symmetric padding added around an accepted region (fraction of its size)
    pub const REGION_PADDING: f32 = 0.03;
}

/// Focus scoring and temporal stability
pub mod stability {
    /// Luminance variance above which a frame counts as in focus
    pub const FOCUS_THRESHOLD: f64 = 1500.0;

    /// Consecutive in-focus ticks required before declaring readiness
    pub const MIN_STABLE_RUN: u32 = 12;

    /// Elapsed-time warm-up floor in milliseconds
    pub const WARMUP_MS: u64 = 3000;

    /// Frame-count warm-up floor (0 disables the frame floor)
    pub const WARMUP_FRAMES: u32 = 0;

    /// Exponential smoothing factor for the feedback region
    pub const SMOOTHING_ALPHA: f32 = 0.28;

    /// How long the smoothed region is held without a new detection
    pub const REGION_HOLD_MS: u64 = 1000;

    /// Smallest change of any smoothed-region coordinate worth republishing
    pub const FEEDBACK_EPSILON: f32 = 0.004;
}

/// Normalized output artifact
pub mod output {
    /// Output width in pixels; height follows the target aspect ratio
    pub const OUTPUT_WIDTH: u32 = 1000;

    /// First JPEG quality tried
    pub const START_QUALITY: u8 = 92;

    /// Quality floor; encoding stops stepping down here even when oversized
    pub const MIN_QUALITY: u8 = 50;

    /// Quality decrement per oversized attempt
    pub const QUALITY_STEP: u8 = 7;

    /// Maximum encoded size in bytes
    pub const MAX_BYTES: usize = 800 * 1024;

    /// Fraction of the frame's fitting box used by the center-crop fallback
    pub const CENTER_CROP_FILL: f32 = 0.70;

    /// Largest output dimension; taller ratios narrow the width instead
    pub const MAX_OUTPUT_SIDE: u32 = 8192;

    /// MIME type of the produced artifact
    pub const MIME_TYPE: &str = "image/jpeg";
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Analysis tick interval (one pass per display refresh at ~30fps)
    pub const TICK_INTERVAL: Duration = Duration::from_millis(33);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Sleep between failed device reads before retrying
    pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Duration of the visual flash emitted when a capture lands
    pub const FLASH_DURATION: Duration = Duration::from_millis(150);
}

/// Camera device defaults
pub mod camera {
    /// Default V4L2 device node
    pub const DEFAULT_DEVICE: &str = "/dev/video0";

    /// Number of memory-mapped buffers requested from V4L2
    pub const MMAP_BUFFERS: u32 = 4;

    /// Preferred capture width for label inspection
    pub const PREFERRED_WIDTH: u32 = 1280;

    /// Preferred capture height for label inspection
    pub const PREFERRED_HEIGHT: u32 = 960;
}

/// Supported input file formats
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information
pub mod app_info {
    /// Application identifier used for config and output directories
    pub const APP_DIR: &str = "label-capture";

    /// Version string including git metadata
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
