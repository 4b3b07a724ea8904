// SPDX-License-Identifier: MPL-2.0

//! Error types for the label capture pipeline

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors (terminal for a capture session)
    Camera(CameraError),
    /// Capture/normalization errors
    Photo(PhotoError),
    /// Comparison backend errors
    Comparison(ComparisonError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
///
/// These are the "device unavailable" family: once one of them is raised
/// the capture session stays inert and the message is shown to the user.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No camera devices found
    NoCameraFound,
    /// Access to the camera was denied
    PermissionDenied(String),
    /// Camera is busy or in use
    Busy,
    /// Camera initialization failed
    InitializationFailed(String),
    /// Camera disconnected during operation
    Disconnected,
    /// Invalid camera format
    InvalidFormat(String),
    /// Backend error (e.g., V4L2)
    BackendError(String),
}

/// Capture and normalization errors
#[derive(Debug, Clone)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Capture failed
    CaptureFailed(String),
    /// Encoding failed (no data produced)
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

/// Comparison backend errors
#[derive(Debug, Clone)]
pub enum ComparisonError {
    /// No endpoint configured
    NotConfigured,
    /// Transport-level failure
    Request(String),
    /// Backend answered with a non-success status
    Status(u16, String),
    /// Response body could not be decoded
    Decode(String),
    /// One of the two images is missing
    MissingImage(&'static str),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Photo(e) => write!(f, "Capture error: {}", e),
            AppError::Comparison(e) => write!(f, "Comparison error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            CameraError::Busy => write!(f, "Camera is busy"),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
            CameraError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            CameraError::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl fmt::Display for ComparisonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonError::NotConfigured => write!(f, "No comparison endpoint configured"),
            ComparisonError::Request(msg) => write!(f, "Request failed: {}", msg),
            ComparisonError::Status(code, msg) => write!(f, "Backend returned {}: {}", code, msg),
            ComparisonError::Decode(msg) => write!(f, "Invalid response: {}", msg),
            ComparisonError::MissingImage(side) => write!(f, "Missing {} image", side),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for ComparisonError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<ComparisonError> for AppError {
    fn from(err: ComparisonError) -> Self {
        AppError::Comparison(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotAvailable(_) => CameraError::NoCameraFound,
            BackendError::DeviceNotFound(_) => CameraError::NoCameraFound,
            BackendError::PermissionDenied(msg) => CameraError::PermissionDenied(msg),
            BackendError::Busy => CameraError::Busy,
            BackendError::InitializationFailed(msg) => CameraError::InitializationFailed(msg),
            BackendError::FormatNotSupported(msg) => CameraError::InvalidFormat(msg),
            BackendError::Disconnected => CameraError::Disconnected,
            BackendError::IoError(msg) | BackendError::Other(msg) => {
                CameraError::BackendError(msg)
            }
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err.into())
    }
}
