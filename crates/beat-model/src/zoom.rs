//! Zoom parameters and pixel crop rectangles.

use serde::{Deserialize, Serialize};

use crate::beat::BeatModelError;

/// Bounds of the beat-driven zoom effect.
///
/// Invariant: `1.0 <= zoom_min <= zoom_max` and `window_half_width > 0`.
/// Use [`ZoomParameters::new`] to construct validated values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomParameters {
    /// Resting scale factor (no beat nearby).
    pub zoom_min: f64,

    /// Peak scale factor at a strong beat.
    pub zoom_max: f64,

    /// Half-width of each beat's influence window (seconds).
    pub window_half_width: f64,
}

impl ZoomParameters {
    pub fn new(
        zoom_min: f64,
        zoom_max: f64,
        window_half_width: f64,
    ) -> Result<Self, BeatModelError> {
        if !(zoom_min >= 1.0) || !zoom_min.is_finite() {
            return Err(BeatModelError::ValidationError {
                message: format!("zoom_min must be finite and >= 1.0, got {zoom_min}"),
            });
        }
        if !zoom_max.is_finite() {
            return Err(BeatModelError::ValidationError {
                message: format!("zoom_max must be finite, got {zoom_max}"),
            });
        }
        if !(zoom_max >= zoom_min) {
            return Err(BeatModelError::ValidationError {
                message: format!("zoom_max ({zoom_max}) must be >= zoom_min ({zoom_min})"),
            });
        }
        if !(window_half_width > 0.0) || !window_half_width.is_finite() {
            return Err(BeatModelError::ValidationError {
                message: format!("window_half_width must be > 0, got {window_half_width}"),
            });
        }
        Ok(Self {
            zoom_min,
            zoom_max,
            window_half_width,
        })
    }

    /// Zoom amplitude available above the resting scale.
    pub fn span(&self) -> f64 {
        self.zoom_max - self.zoom_min
    }
}

impl Default for ZoomParameters {
    fn default() -> Self {
        Self {
            zoom_min: 1.0,
            zoom_max: 1.3,
            window_half_width: 0.2,
        }
    }
}

/// A pixel-space crop rectangle inside a `width x height` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// The whole frame (no zoom).
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Centered crop for zoom factor `zoom`: `(round(w/z), round(h/z))`.
    ///
    /// The crop never grows past the frame and never shrinks below one pixel.
    pub fn centered(frame_width: u32, frame_height: u32, zoom: f64) -> Self {
        let zoom = if zoom.is_finite() && zoom >= 1.0 {
            zoom
        } else {
            1.0
        };
        let width = ((frame_width as f64 / zoom).round() as u32).clamp(1, frame_width.max(1));
        let height = ((frame_height as f64 / zoom).round() as u32).clamp(1, frame_height.max(1));
        Self {
            x: frame_width.saturating_sub(width) / 2,
            y: frame_height.saturating_sub(height) / 2,
            width,
            height,
        }
    }

    pub fn is_full(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == frame_width && self.height == frame_height
    }

    /// Center point in pixels.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_parameters() {
        let params = ZoomParameters::new(1.0, 1.3, 0.2).unwrap();
        assert!((params.span() - 0.3).abs() < 1e-12);
        assert_eq!(params, ZoomParameters::default());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(ZoomParameters::new(0.9, 1.3, 0.2).is_err());
        assert!(ZoomParameters::new(1.4, 1.3, 0.2).is_err());
        assert!(ZoomParameters::new(1.0, 1.3, 0.0).is_err());
        assert!(ZoomParameters::new(1.0, 1.3, f64::NAN).is_err());
        assert!(ZoomParameters::new(f64::NAN, 1.3, 0.2).is_err());
    }

    #[test]
    fn test_rejects_non_finite_bounds() {
        assert!(ZoomParameters::new(1.0, f64::INFINITY, 0.2).is_err());
        assert!(ZoomParameters::new(1.0, f64::NAN, 0.2).is_err());
        assert!(ZoomParameters::new(f64::INFINITY, f64::INFINITY, 0.2).is_err());
        assert!(ZoomParameters::new(1.0, 1.3, f64::INFINITY).is_err());
    }

    #[test]
    fn test_equal_bounds_are_allowed() {
        assert!(ZoomParameters::new(1.2, 1.2, 0.1).is_ok());
    }

    #[test]
    fn test_centered_crop_rounds_and_centers() {
        let crop = CropRect::centered(1920, 1080, 1.3);
        assert_eq!(crop.width, 1477);
        assert_eq!(crop.height, 831);
        assert_eq!(crop.x, (1920 - 1477) / 2);
        assert_eq!(crop.y, (1080 - 831) / 2);

        let (cx, cy) = crop.center();
        assert!((cx - 960.0).abs() <= 1.0);
        assert!((cy - 540.0).abs() <= 1.0);
    }

    #[test]
    fn test_unit_zoom_is_full_frame() {
        let crop = CropRect::centered(640, 480, 1.0);
        assert!(crop.is_full(640, 480));
        assert_eq!(CropRect::centered(640, 480, 0.5), CropRect::full(640, 480));
    }
}
