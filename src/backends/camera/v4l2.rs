// SPDX-License-Identifier: GPL-3.0-only

//! Live camera capture through Video4Linux2
//!
//! A capture thread owns the device and a memory-mapped buffer stream. Each
//! dequeued buffer is converted to RGBA and published as the latest frame;
//! the analysis loop only ever reads the newest one.

use super::VideoSource;
use super::format_converters;
use super::types::*;
use crate::constants::{camera, timing};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// List V4L2 devices that can capture video
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut devices = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();
        let dev = match Device::with_path(&path) {
            Ok(dev) => dev,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping unopenable device");
                continue;
            }
        };
        let caps = match dev.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping device without capabilities");
                continue;
            }
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }

        devices.push(CameraDevice {
            name: caps.card,
            path,
            driver: caps.driver,
        });
    }

    devices
}

/// V4L2 video source
pub struct V4l2Source {
    device_path: String,
    format: Option<CameraFormat>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl V4l2Source {
    /// Create a source for a device node; nothing is opened until `start`
    pub fn new(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            format: None,
            latest: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }
}

impl VideoSource for V4l2Source {
    fn start(&mut self) -> BackendResult<()> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        info!(device_path = %self.device_path, "Opening V4L2 device");
        let dev = Device::with_path(&self.device_path).map_err(BackendError::from)?;
        let format = negotiate_format(&dev)?;
        info!(format = %format, "Negotiated capture format");

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let latest = Arc::clone(&self.latest);
        let thread_format = format.clone();

        // Stream setup happens on the capture thread; report its outcome back
        // so busy devices surface as a start error
        let (ready_tx, ready_rx) = mpsc::channel::<BackendResult<()>>();

        let handle = std::thread::spawn(move || {
            capture_loop(dev, thread_format, latest, running, ready_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.format = Some(format);
                self.thread_handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(BackendError::InitializationFailed(
                    "Capture thread exited during startup".into(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(()) => info!(device_path = %self.device_path, "V4L2 capture stopped"),
                Err(_) => warn!(device_path = %self.device_path, "V4L2 capture thread panicked"),
            }
        }
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        self.format
            .as_ref()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0))
    }

    fn is_ready(&self) -> bool {
        self.latest.lock().map(|l| l.is_some()).unwrap_or(false)
    }

    fn latest_frame(&mut self) -> Option<CameraFrame> {
        self.latest.lock().ok().and_then(|l| l.clone())
    }

    fn describe(&self) -> String {
        match &self.format {
            Some(format) => format!("V4L2 {} ({})", self.device_path, format),
            None => format!("V4L2 {}", self.device_path),
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

/// Ask for the preferred size in a format we can convert
fn negotiate_format(dev: &Device) -> BackendResult<CameraFormat> {
    let current = dev.format().map_err(BackendError::from)?;

    let mut requested = current.clone();
    requested.width = camera::PREFERRED_WIDTH;
    requested.height = camera::PREFERRED_HEIGHT;
    if PixelFormat::from_fourcc(&requested.fourcc.repr).is_none() {
        requested.fourcc = v4l::FourCC::new(PixelFormat::YUYV.fourcc());
    }

    let applied = match dev.set_format(&requested) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "Could not set format, using current device format");
            current
        }
    };

    let pixel_format = PixelFormat::from_fourcc(&applied.fourcc.repr).ok_or_else(|| {
        BackendError::FormatNotSupported(format!("Unsupported pixel format {}", applied.fourcc))
    })?;

    if applied.width == 0 || applied.height == 0 {
        return Err(BackendError::FormatNotSupported(
            "Device reported zero frame size".into(),
        ));
    }

    Ok(CameraFormat {
        width: applied.width,
        height: applied.height,
        pixel_format,
    })
}

/// Bytes per row of a packed format without padding
fn packed_row_bytes(format: PixelFormat, width: u32) -> Option<usize> {
    match format {
        PixelFormat::YUYV | PixelFormat::UYVY => Some(width as usize * 2),
        PixelFormat::RGB24 => Some(width as usize * 3),
        PixelFormat::RGBA => Some(width as usize * 4),
        PixelFormat::MJPEG => None,
    }
}

/// Main capture loop running in the capture thread
fn capture_loop(
    dev: Device,
    format: CameraFormat,
    latest: Arc<Mutex<Option<CameraFrame>>>,
    running: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<BackendResult<()>>,
) {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let stride = dev.format().map(|f| f.stride as usize).unwrap_or(0);
    let mut stream =
        match Stream::with_buffers(&dev, Type::VideoCapture, camera::MMAP_BUFFERS) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(BackendError::from(e)));
                return;
            }
        };
    let _ = ready_tx.send(Ok(()));
    info!("V4L2 capture stream started");

    let mut consecutive_errors = 0u32;

    while running.load(Ordering::SeqCst) {
        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors % timing::FRAME_LOG_INTERVAL as u32 == 1 {
                    warn!(error = %e, "Failed to dequeue frame");
                }
                if e.raw_os_error() == Some(19) {
                    // ENODEV: device unplugged
                    error!("V4L2 device disconnected");
                    break;
                }
                std::thread::sleep(timing::CAPTURE_RETRY_DELAY);
                continue;
            }
        };
        consecutive_errors = 0;

        let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
        let captured_at = Instant::now();

        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let payload = &buf[..used];

        // Strip row padding for packed formats
        let packed;
        let data = match packed_row_bytes(format.pixel_format, format.width) {
            Some(row) if stride > row => {
                packed = payload
                    .chunks(stride)
                    .take(format.height as usize)
                    .flat_map(|line| &line[..row.min(line.len())])
                    .copied()
                    .collect::<Vec<u8>>();
                &packed[..]
            }
            _ => payload,
        };

        match format_converters::to_rgba(data, format.pixel_format, format.width, format.height)
        {
            Ok(rgba) => {
                let mut frame = CameraFrame::from_rgba(format.width, format.height, rgba);
                frame.captured_at = captured_at;
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(frame);
                }
                if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        frame = frame_num,
                        sequence = meta.sequence,
                        size = used,
                        "Frame captured"
                    );
                }
            }
            Err(e) => {
                if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                    warn!(frame = frame_num, error = %e, "Dropping undecodable frame");
                }
            }
        }
    }

    info!("V4L2 capture loop ended");
}
