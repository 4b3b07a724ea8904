// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture pipeline, driven with synthetic frames

use label_capture::backends::camera::CameraFrame;
use label_capture::backends::virtual_camera::FileSource;
use label_capture::config::{Config, OutputSettings};
use label_capture::pipelines::capture::{
    AspectRatio, CaptureEvent, CaptureRequest, CaptureSession, CaptureState, FrameSampler,
    LabelCamera, NormalizedRegion, SkipReason, SubjectLocator, TickOutcome,
};
use label_capture::pipelines::photo::{PhotoPipeline, crop_and_resize};
use std::sync::mpsc;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(33);

/// Frame with a bright label on a darker background
fn label_frame(
    width: u32,
    height: u32,
    rect: (u32, u32, u32, u32),
    bg: u8,
    fg: u8,
) -> CameraFrame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let inside = x >= rect.0 && x < rect.0 + rect.2 && y >= rect.1 && y < rect.1 + rect.3;
            let v = if inside { fg } else { bg };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    CameraFrame::from_rgba(width, height, data)
}

/// Centered square label, sharp
fn sharp_label() -> CameraFrame {
    label_frame(1280, 960, (480, 280, 400, 400), 20, 240)
}

/// Same label with little contrast (low focus score, still detectable)
fn soft_label() -> CameraFrame {
    label_frame(1280, 960, (480, 280, 400, 400), 100, 130)
}

fn flat_frame() -> CameraFrame {
    CameraFrame::from_rgba(1280, 960, vec![90; 1280 * 960 * 4])
}

fn config(warmup_ms: u64, min_stable_run: u32) -> Config {
    let mut config = Config::default();
    config.stability.warmup_ms = warmup_ms;
    config.stability.min_stable_run = min_stable_run;
    config.output.width = 200;
    config
}

fn expect_fire(outcome: TickOutcome) -> CaptureRequest {
    match outcome {
        TickOutcome::Fire(request) => request,
        other => panic!("expected capture, got {other:?}"),
    }
}

fn encode(request: &CaptureRequest, config: &Config) -> label_capture::CapturedArtifact {
    PhotoPipeline::new(config.output.clone())
        .normalize_blocking(&request.frame, request.region.as_ref(), request.aspect)
        .unwrap()
}

#[test]
fn output_always_matches_aspect_ratio() {
    let pipeline = PhotoPipeline::new(OutputSettings {
        width: 300,
        ..Default::default()
    });
    let frames = [(1280, 960), (640, 480), (1920, 1080), (300, 800)];
    let aspects = [0.5, 1.0, 1.37, 2.0, 3.3];
    let region = NormalizedRegion::new(0.2, 0.3, 0.5, 0.2);

    for (fw, fh) in frames {
        let frame = label_frame(fw, fh, (fw / 4, fh / 4, fw / 2, fh / 2), 30, 200);
        for aspect in aspects {
            for region in [None, region] {
                let artifact = pipeline
                    .normalize_blocking(&frame, region.as_ref(), AspectRatio::new(aspect))
                    .unwrap();
                let expected_height = artifact.width as f64 / aspect;
                assert!(
                    (artifact.height as f64 - expected_height).abs() <= 1.0,
                    "{}x{} frame, aspect {}: got {}x{}",
                    fw,
                    fh,
                    aspect,
                    artifact.width,
                    artifact.height
                );
            }
        }
    }
}

#[test]
fn no_auto_capture_during_warmup() {
    let config = config(3000, 12);
    let mut session = CaptureSession::new(&config);
    let frame = sharp_label();
    let t0 = Instant::now();

    // 90 frames at 30fps stay under the 3000ms floor
    for i in 0..90 {
        let outcome = session.tick(Some(&frame), t0 + TICK * i);
        match outcome {
            TickOutcome::Analyzed(feedback) => {
                assert!(!feedback.ready, "ready at frame {i}");
                assert!(feedback.detection.is_some(), "label not found at frame {i}");
                assert!(feedback.focus > 1500.0);
                assert_eq!(feedback.state, CaptureState::Warmup);
            }
            other => panic!("unexpected outcome at frame {i}: {other:?}"),
        }
    }

    let request = expect_fire(session.tick(Some(&frame), t0 + Duration::from_millis(3000)));
    assert!(request.region.is_some());
    assert_eq!(session.state(), CaptureState::Ready);
}

#[test]
fn focus_drop_restarts_stable_run() {
    let config = config(0, 5);
    let mut session = CaptureSession::new(&config);
    let (sharp, soft) = (sharp_label(), soft_label());
    let t0 = Instant::now();
    let mut tick = 0u32;
    let mut next = || {
        tick += 1;
        t0 + TICK * tick
    };

    for _ in 0..3 {
        assert!(matches!(session.tick(Some(&sharp), next()), TickOutcome::Analyzed(_)));
    }
    assert_eq!(session.controller().stability().consecutive(), 3);

    match session.tick(Some(&soft), next()) {
        TickOutcome::Analyzed(feedback) => {
            assert!(feedback.detection.is_some());
            assert!(feedback.focus < 1500.0);
            assert_eq!(feedback.consecutive, 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    for _ in 0..4 {
        assert!(matches!(session.tick(Some(&sharp), next()), TickOutcome::Analyzed(_)));
    }
    expect_fire(session.tick(Some(&sharp), next()));
}

#[test]
fn one_auto_capture_per_session() {
    let config = config(0, 2);
    let mut session = CaptureSession::new(&config);
    let frame = sharp_label();
    let t0 = Instant::now();

    session.tick(Some(&frame), t0);
    let request = expect_fire(session.tick(Some(&frame), t0 + TICK));

    for i in 2..10 {
        assert!(matches!(
            session.tick(Some(&frame), t0 + TICK * i),
            TickOutcome::Skipped(SkipReason::Processing)
        ));
    }

    let artifact = encode(&request, &config);
    assert!(session.complete(request.ticket, Ok(artifact)).is_some());
    assert_eq!(session.state(), CaptureState::Frozen);
    assert!(session.artifact().is_some());

    for i in 10..40 {
        assert!(matches!(
            session.tick(Some(&frame), t0 + TICK * i),
            TickOutcome::Skipped(SkipReason::Frozen)
        ));
    }

    session.retake();
    session.tick(Some(&frame), t0 + TICK * 40);
    assert!(session.artifact().is_none());
    expect_fire(session.tick(Some(&frame), t0 + TICK * 41));
}

#[test]
fn locator_failure_holds_region_then_releases() {
    let config = config(0, 3);
    let mut session = CaptureSession::new(&config);
    let (label, flat) = (sharp_label(), flat_frame());
    let t0 = Instant::now();

    session.tick(Some(&label), t0);
    let held = session.controller().stability().smoothed_region();
    assert!(held.is_some());

    for i in 1..=20 {
        match session.tick(Some(&flat), t0 + TICK * i) {
            TickOutcome::Analyzed(feedback) => {
                assert!(!feedback.ready);
                assert!(feedback.detection.is_none());
                assert_eq!(feedback.region, held);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    // Past the hold time the region is dropped
    match session.tick(Some(&flat), t0 + Duration::from_millis(1500)) {
        TickOutcome::Analyzed(feedback) => assert!(feedback.region.is_none()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn oversized_output_is_emitted_at_quality_floor() {
    let config = config(0, 1);
    let pipeline = PhotoPipeline::new(OutputSettings {
        width: 200,
        max_bytes: 1,
        ..config.output.clone()
    });
    let artifact = pipeline
        .normalize_blocking(&sharp_label(), None, AspectRatio::new(1.0))
        .unwrap();
    assert_eq!(artifact.quality, config.output.min_quality);
    assert!(!artifact.within_budget);
    assert!(!artifact.is_empty());
}

#[test]
fn aspect_correction_scenario() {
    let region = NormalizedRegion::new(0.3, 0.2, 0.3, 0.5).unwrap();
    let fitted = region.fit_aspect(AspectRatio::new(1.0), 1280, 960);

    assert!((fitted.pixel_aspect(1280, 960) - 1.0).abs() < 1.0 / 480.0);
    assert!((fitted.x - 0.2625).abs() < 1e-4);
    assert!((fitted.y - 0.2).abs() < 1e-4);
    assert!((fitted.center().1 - region.center().1).abs() < 1e-5);
}

#[test]
fn retake_starts_fresh_session() {
    let config = config(3000, 2);
    let mut session = CaptureSession::new(&config);
    let (label, flat) = (sharp_label(), flat_frame());
    let t0 = Instant::now();

    for i in 0..5 {
        session.tick(Some(&label), t0 + TICK * i);
    }
    let request = expect_fire(session.tick(Some(&label), t0 + Duration::from_millis(3100)));
    let artifact = encode(&request, &config);
    session.complete(request.ticket, Ok(artifact));
    assert_eq!(session.state(), CaptureState::Frozen);

    session.retake();
    let after = t0 + Duration::from_millis(4000);
    session.tick(Some(&flat), after);

    let stability = session.controller().stability();
    assert_eq!(stability.consecutive(), 0);
    assert_eq!(stability.smoothed_region(), None);
    assert_eq!(stability.started_at(), Some(after));
    assert_eq!(stability.frames_seen(), 1);
    assert_eq!(session.state(), CaptureState::Warmup);

    // Warm-up restarted from the retake, not from the original session
    for i in 1..30 {
        assert!(matches!(
            session.tick(Some(&label), after + TICK * i),
            TickOutcome::Analyzed(_)
        ));
    }
}

#[test]
fn wide_label_crop_is_not_stretched() {
    // Label narrower than the 4:1 target; the accepted region spans the frame width
    let frame = label_frame(1280, 960, (160, 300, 960, 360), 20, 240);
    let aspect = AspectRatio::new(4.0);
    let config = Config::default();

    let mut sampler = FrameSampler::new(config.analysis.analysis_width);
    let mut locator = SubjectLocator::new(config.analysis.clone());
    let sampled = sampler.sample(&frame).unwrap();
    let region = locator.evaluate(&sampled, aspect).unwrap();

    let processed = crop_and_resize(&frame, Some(&region), aspect, 1000).unwrap();
    let crop = processed.crop;
    assert!(
        (crop.height as f64 - crop.width as f64 / 4.0).abs() <= 1.0,
        "crop {:?} does not match 4:1",
        crop
    );
    assert_eq!((processed.width, processed.height), (1000, 250));
}

#[test]
fn aspect_change_starts_fresh_session() {
    let config = config(0, 5);
    let mut session = CaptureSession::new(&config);
    let (label, flat) = (sharp_label(), flat_frame());
    let t0 = Instant::now();

    for i in 0..3 {
        session.tick(Some(&label), t0 + TICK * i);
    }
    assert_eq!(session.controller().stability().consecutive(), 3);
    let generation = session.controller().generation();

    session.set_aspect_ratio(AspectRatio::new(1.5));
    let after = t0 + TICK * 3;
    session.tick(Some(&flat), after);

    let stability = session.controller().stability();
    assert_eq!(session.controller().generation(), generation + 1);
    assert_eq!(session.controller().aspect_ratio(), AspectRatio::new(1.5));
    assert_eq!(stability.consecutive(), 0);
    assert_eq!(stability.smoothed_region(), None);
    assert_eq!(stability.started_at(), Some(after));
    assert_eq!(stability.frames_seen(), 1);
}

#[test]
fn stale_capture_result_is_discarded() {
    let config = config(0, 1);
    let mut session = CaptureSession::new(&config);
    let frame = sharp_label();
    let t0 = Instant::now();

    let request = expect_fire(session.tick(Some(&frame), t0));
    session.retake();
    session.tick(Some(&flat_frame()), t0 + TICK);

    let artifact = encode(&request, &config);
    assert!(session.complete(request.ticket, Ok(artifact)).is_none());
    assert_ne!(session.state(), CaptureState::Frozen);
}

#[test]
fn label_camera_auto_captures_from_files() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut config = config(0, 3);
    config.camera.tick_interval_ms = 2;
    let source = Box::new(FileSource::from_frames(
        vec![sharp_label()],
        Duration::from_millis(10),
    ));

    let (tx, rx) = mpsc::channel();
    let (mut camera, mut events) =
        LabelCamera::start(source, &config, runtime.handle().clone(), move |artifact, uri| {
            let _ = tx.send((artifact.width, artifact.height, uri.len()));
        })
        .unwrap();

    let (width, height, uri_len) = rx.recv_timeout(Duration::from_secs(20)).unwrap();
    assert_eq!((width, height), (200, 200));
    assert!(uri_len > "data:image/jpeg;base64,".len());

    // Frozen: the callback does not fire again
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    camera.stop();

    let mut saw_captured = false;
    let mut saw_stopped = false;
    while let Ok(Some(event)) = events.try_next() {
        match event {
            CaptureEvent::Captured(_) => saw_captured = true,
            CaptureEvent::Stopped => saw_stopped = true,
            _ => {}
        }
    }
    assert!(saw_captured);
    assert!(saw_stopped);
}
