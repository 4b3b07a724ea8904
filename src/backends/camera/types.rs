// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Live capture through Video4Linux2
    #[default]
    V4l2,
    /// Still images replayed as a stream
    File,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::File => write!(f, "file"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    /// Human readable name (V4L2 card)
    pub name: String,
    /// Device node (e.g., /dev/video0)
    pub path: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
}

/// Negotiated capture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.pixel_format)
    }
}

/// Pixel format of data delivered by a device
///
/// Everything is converted to RGBA before it reaches the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel), canonical pipeline format
    RGBA,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Motion JPEG, one JPEG image per buffer
    MJPEG,
}

impl PixelFormat {
    /// Map a V4L2 FourCC code to a supported format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"YUYV" => Some(PixelFormat::YUYV),
            b"UYVY" => Some(PixelFormat::UYVY),
            b"RGB3" => Some(PixelFormat::RGB24),
            b"MJPG" => Some(PixelFormat::MJPEG),
            b"AB24" => Some(PixelFormat::RGBA),
            _ => None,
        }
    }

    /// FourCC code for this format
    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            PixelFormat::RGBA => b"AB24",
            PixelFormat::YUYV => b"YUYV",
            PixelFormat::UYVY => b"UYVY",
            PixelFormat::RGB24 => b"RGB3",
            PixelFormat::MJPEG => b"MJPG",
        }
    }
}

/// A single decoded video frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data (RGBA once it leaves the backend)
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// True when the frame has nonzero dimensions and enough data for them
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride >= self.width * 4
            && self.data.len() >= (self.stride as usize) * (self.height as usize - 1)
                + self.width as usize * 4
    }

    /// RGBA pixel at (x, y); out-of-range reads return black
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = y as usize * self.stride as usize + x as usize * 4;
        match self.data.get(offset..offset + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0, 0, 0, 255],
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// The process may not open the device
    PermissionDenied(String),
    /// Device is already in use
    Busy,
    /// Failed to initialize the device
    InitializationFailed(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Device went away while streaming
    Disconnected,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::Busy => write!(f, "Device busy"),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Disconnected => write!(f, "Device disconnected"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// EBUSY on Linux
const EBUSY: i32 = 16;

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ if err.raw_os_error() == Some(EBUSY) => BackendError::Busy,
            _ => BackendError::IoError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_frame_is_invalid() {
        let frame = CameraFrame::from_rgba(0, 0, Vec::new());
        assert!(!frame.is_valid());

        let frame = CameraFrame::from_rgba(2, 2, vec![0; 16]);
        assert!(frame.is_valid());
    }

    #[test]
    fn truncated_frame_is_invalid() {
        let frame = CameraFrame::from_rgba(4, 4, vec![0; 20]);
        assert!(!frame.is_valid());
    }

    #[test]
    fn io_errors_classified() {
        let err = std::io::Error::from_raw_os_error(EBUSY);
        assert!(matches!(BackendError::from(err), BackendError::Busy));

        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            BackendError::from(err),
            BackendError::PermissionDenied(_)
        ));
    }

    #[test]
    fn fourcc_round_trip_for_known_formats() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::YUYV));
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), Some(PixelFormat::MJPEG));
        assert_eq!(PixelFormat::from_fourcc(b"H264"), None);
    }
}
