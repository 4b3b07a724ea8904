// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - listing V4L2 cameras
//! - live auto-capture
//! - normalizing a still image
//! - submitting two images to the comparison backend

use label_capture::backends::camera::{CameraBackendType, enumerate_cameras, open_source};
use label_capture::backends::virtual_camera::load_image_as_frame;
use label_capture::comparison::{
    ComparisonBackend, ComparisonRequest, HttpComparisonClient, ImagePart, InspectionMetadata,
};
use label_capture::config::Config;
use label_capture::errors::AppError;
use label_capture::pipelines::capture::{
    AspectRatio, CaptureEvent, FrameSampler, LabelCamera, SubjectLocator,
};
use label_capture::pipelines::photo::{CapturedArtifact, PhotoPipeline};
use label_capture::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

/// Options for the `capture` command
pub struct CaptureOptions {
    pub device: Option<String>,
    pub frames: Vec<PathBuf>,
    pub aspect: Option<f64>,
    pub output: Option<PathBuf>,
    pub timeout: u64,
    pub manual_after: Option<u64>,
}

/// Options for the `compare` command
pub struct CompareOptions {
    pub master: PathBuf,
    pub scan: PathBuf,
    pub endpoint: Option<String>,
    pub operator: Option<String>,
    pub order: String,
    pub product: String,
    pub json: bool,
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {} ({})", camera.name, camera.path);
        println!("      Driver: {}", camera.driver);
    }

    Ok(())
}

/// Run the auto-capture pipeline until one artifact is produced
pub fn capture(
    mut config: Config,
    options: CaptureOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(aspect) = options.aspect {
        config.aspect_ratio = aspect;
    }
    if let Some(device) = options.device {
        config.camera.backend = CameraBackendType::V4l2;
        config.camera.device_path = device;
    }
    if !options.frames.is_empty() {
        config.camera.backend = CameraBackendType::File;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let source = open_source(&config.camera, options.frames);

    let (artifact_tx, artifact_rx) = std_mpsc::channel::<CapturedArtifact>();
    let (mut camera, mut events) =
        LabelCamera::start(source, &config, rt.handle().clone(), move |artifact, _preview| {
            let _ = artifact_tx.send(artifact.clone());
        })
        .map_err(AppError::from)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Hold the label in front of the camera. Press Ctrl+C to cancel.");

    let start = Instant::now();
    let deadline = Duration::from_secs(options.timeout);
    let manual_after = options.manual_after.map(Duration::from_secs);
    let mut manual_sent = false;

    let artifact = loop {
        while let Ok(Some(event)) = events.try_next() {
            match event {
                CaptureEvent::Started { source } => println!("Source: {}", source),
                CaptureEvent::StateChanged(state) => println!("State: {}", state),
                CaptureEvent::Flash(_) => println!("*click*"),
                CaptureEvent::CaptureFailed(message) => eprintln!("Capture failed: {}", message),
                _ => {}
            }
        }

        match artifact_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(artifact) => break Some(artifact),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break None,
        }

        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Cancelled.");
            break None;
        }
        if !camera.is_running() {
            eprintln!("Capture loop stopped unexpectedly.");
            break None;
        }
        if let Some(after) = manual_after {
            if !manual_sent && start.elapsed() >= after {
                println!("Forcing manual capture...");
                camera.capture_now();
                manual_sent = true;
            }
        }
        if start.elapsed() >= deadline {
            println!("Timed out after {}s.", options.timeout);
            break None;
        }
    };

    camera.stop();

    let Some(artifact) = artifact else {
        return Err("No label captured".into());
    };

    let path = rt.block_on(save(&artifact, options.output.as_deref()))?;
    println!(
        "Captured {}x{} (quality {}, {} bytes)",
        artifact.width,
        artifact.height,
        artifact.quality,
        artifact.len()
    );
    println!("Saved to: {}", path.display());
    Ok(())
}

/// Locate and normalize a label in a still image
pub fn normalize(
    mut config: Config,
    image: PathBuf,
    aspect: Option<f64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(aspect) = aspect {
        config.aspect_ratio = aspect;
    }
    let aspect = AspectRatio::new(config.aspect_ratio);

    let frame = load_image_as_frame(&image).map_err(AppError::from)?;
    println!("Input: {}x{}", frame.width, frame.height);

    let mut sampler = FrameSampler::new(config.analysis.analysis_width);
    let mut locator = SubjectLocator::new(config.analysis.clone());
    let region = match sampler.sample(&frame) {
        Some(sampled) => match locator.evaluate(&sampled, aspect) {
            Ok(region) => {
                println!(
                    "Label found at ({:.3}, {:.3}) size {:.3}x{:.3}",
                    region.x, region.y, region.width, region.height
                );
                Some(region)
            }
            Err(reason) => {
                println!("No label found ({}), using center crop", reason);
                None
            }
        },
        None => None,
    };

    let pipeline = PhotoPipeline::new(config.output.clone());
    let artifact = pipeline
        .normalize_blocking(&frame, region.as_ref(), aspect)
        .map_err(AppError::from)?;

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(save(&artifact, output.as_deref()))?;
    println!(
        "Normalized {}x{} (quality {}, {} bytes)",
        artifact.width,
        artifact.height,
        artifact.quality,
        artifact.len()
    );
    println!("Saved to: {}", path.display());
    Ok(())
}

/// Submit two images and print the differences
pub fn compare(
    mut config: Config,
    options: CompareOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(endpoint) = options.endpoint {
        config.comparison.endpoint = Some(endpoint);
    }
    let operator = options
        .operator
        .unwrap_or_else(|| config.comparison.operator.clone());

    let client = HttpComparisonClient::new(&config.comparison).map_err(AppError::from)?;
    let rt = tokio::runtime::Runtime::new()?;

    let report = rt.block_on(async {
        let request = ComparisonRequest {
            master: Some(ImagePart::from_path(&options.master).await?),
            scan: Some(ImagePart::from_path(&options.scan).await?),
            metadata: InspectionMetadata {
                operator,
                order_number: options.order,
                product_number: options.product,
            },
        };
        client.compare(request).await
    });
    let report = report.map_err(AppError::from)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let diffs = report.line_diffs();
    println!("OCR line differences: {}", diffs.len());
    for diff in diffs {
        println!(
            "  {:>4}  master: {:<30}  scan: {}",
            diff.line.map(|l| l.to_string()).unwrap_or_default(),
            diff.master.as_deref().unwrap_or("-"),
            diff.scan.as_deref().unwrap_or("-"),
        );
    }

    println!(
        "Barcodes: {}",
        if report.barcode_mismatch() { "MISMATCH" } else { "match" }
    );
    for barcode in &report.barcodes {
        println!(
            "  {:?} {} {}{}",
            barcode.side,
            barcode.symbology.as_deref().unwrap_or("?"),
            barcode.value.as_deref().unwrap_or("-"),
            barcode
                .reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
    }

    println!("Graphical differences: {}", report.graphics.len());
    for graphic in &report.graphics {
        println!(
            "  {:.0},{:.0} {:.0}x{:.0} {}",
            graphic.x,
            graphic.y,
            graphic.w,
            graphic.h,
            graphic.kind.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

/// Save to an explicit file, into a directory, or into the default directory
async fn save(artifact: &CapturedArtifact, output: Option<&Path>) -> Result<PathBuf, AppError> {
    match output {
        Some(path) if path.extension().is_some() && !path.is_dir() => {
            storage::save_artifact_to(artifact, path).await?;
            Ok(path.to_path_buf())
        }
        Some(dir) => Ok(storage::save_artifact(artifact, dir).await?),
        None => Ok(storage::save_artifact(artifact, &storage::default_output_dir()).await?),
    }
}
