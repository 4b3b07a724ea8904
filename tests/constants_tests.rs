// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use label_capture::constants::{analysis, file_formats, output, stability};

#[test]
fn test_area_band_is_ordered() {
    // Lower bound must stay below the upper bound, both inside the frame
    assert!(analysis::MIN_AREA_FRACTION > 0.0);
    assert!(analysis::MIN_AREA_FRACTION < analysis::MAX_AREA_FRACTION);
    assert!(analysis::MAX_AREA_FRACTION < 1.0);
}

#[test]
fn test_quality_schedule_reaches_floor() {
    // Start quality above the floor, with a nonzero step
    assert!(output::START_QUALITY <= 100);
    assert!(output::MIN_QUALITY < output::START_QUALITY);
    assert!(output::QUALITY_STEP > 0);
}

#[test]
fn test_smoothing_alpha_range() {
    assert!(stability::SMOOTHING_ALPHA > 0.0 && stability::SMOOTHING_ALPHA <= 1.0);
}

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("jpg"));
    assert!(file_formats::is_image_extension("PNG"));
    assert!(!file_formats::is_image_extension("mp4"));
}
