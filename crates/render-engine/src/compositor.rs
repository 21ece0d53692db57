//! Frame compositor: turns a zoom profile into per-frame crop instructions
//! and applies them to decoded frames.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::RgbImage;
use rhythmcam_beat_model::CropRect;
use rhythmcam_processing_core::ZoomProfile;

/// Zoom factors within this ratio of `zoom_min` pass the frame through untouched.
pub const PASSTHROUGH_RATIO: f64 = 1.01;

/// A single frame's composition instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameComposition {
    /// Frame number.
    pub frame_index: u64,

    /// Time in seconds.
    pub time_secs: f64,

    /// Scale factor from the zoom profile.
    pub zoom_factor: f64,

    /// Region of the source frame to scale back up to full size.
    pub crop: CropRect,

    /// The source frame is emitted as-is.
    pub passthrough: bool,
}

/// Compute the composition for every output frame.
///
/// Produces `ceil(duration * fps)` frames with `t = i / fps`.
pub fn compute_compositions(
    profile: &ZoomProfile,
    fps: u32,
    duration_secs: f64,
    width: u32,
    height: u32,
) -> Vec<FrameComposition> {
    let zoom_min = profile.params().zoom_min;
    let factors = profile.sample(fps, duration_secs);
    let mut compositions = Vec::with_capacity(factors.len());

    for (frame, zoom_factor) in (0u64..).zip(factors) {
        let time_secs = frame as f64 / fps as f64;
        let passthrough = zoom_factor <= zoom_min * PASSTHROUGH_RATIO;
        let crop = if passthrough {
            CropRect::full(width, height)
        } else {
            CropRect::centered(width, height, zoom_factor)
        };

        compositions.push(FrameComposition {
            frame_index: frame,
            time_secs,
            zoom_factor,
            crop,
            passthrough,
        });
    }

    compositions
}

/// Apply one frame's composition to a decoded frame.
pub fn apply_composition<'a>(frame: &'a RgbImage, composition: &FrameComposition) -> Cow<'a, RgbImage> {
    let (width, height) = frame.dimensions();
    if composition.passthrough || composition.crop.is_full(width, height) {
        return Cow::Borrowed(frame);
    }
    Cow::Owned(crop_and_scale(frame, &composition.crop))
}

/// Zoom a frame by `zoom` about its center.
///
/// Frames whose zoom is within 1% of `zoom_min` come back unchanged; this
/// is an approximation and not bit-identical to an explicit crop at `zoom_min`.
pub fn apply_zoom(frame: &RgbImage, zoom: f64, zoom_min: f64) -> Cow<'_, RgbImage> {
    if zoom <= zoom_min * PASSTHROUGH_RATIO {
        return Cow::Borrowed(frame);
    }
    let (width, height) = frame.dimensions();
    let crop = CropRect::centered(width, height, zoom);
    if crop.is_full(width, height) {
        return Cow::Borrowed(frame);
    }
    Cow::Owned(crop_and_scale(frame, &crop))
}

fn crop_and_scale(frame: &RgbImage, crop: &CropRect) -> RgbImage {
    let (width, height) = frame.dimensions();
    let region = imageops::crop_imm(frame, crop.x, crop.y, crop.width, crop.height).to_image();
    imageops::resize(&region, width, height, FilterType::Lanczos3)
}
