//! Mapping detections from source image space to a rendering surface.
//!
//! The front camera preview is shown mirrored, so by default the mapper flips
//! the horizontal axis: a region's right edge becomes the mapped left edge.
//! The vertical axis is scaled directly.

use crate::constants::{CORNER_ACCENT_RATIO, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH};
use crate::geometry::{BoundingRegion, Landmark};

/// Rectangle in target surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MappedRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl MappedRect {
    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Landmark in target surface coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MappedPoint {
    pub x: f32,
    pub y: f32,
    /// Relative depth, passed through unchanged
    pub z: f32,
}

/// Geometry ready to be drawn over the preview
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayGeometry {
    pub region: MappedRect,
    pub landmarks: Vec<MappedPoint>,
    corner_accent_ratio: f32,
}

impl OverlayGeometry {
    /// Length of the L-shaped corner accents drawn on the face box
    #[must_use]
    pub fn corner_accent_length(&self) -> f32 {
        self.region.width().min(self.region.height()) * self.corner_accent_ratio
    }
}

/// Source-to-surface coordinate mapper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    target_width: f32,
    target_height: f32,
    mirror: bool,
    corner_accent_ratio: f32,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_WIDTH, DEFAULT_TARGET_HEIGHT)
    }
}

impl CoordinateMapper {
    /// Mirroring mapper for a `target_width` x `target_height` surface
    #[must_use]
    pub const fn new(target_width: f32, target_height: f32) -> Self {
        Self {
            target_width,
            target_height,
            mirror: true,
            corner_accent_ratio: CORNER_ACCENT_RATIO,
        }
    }

    /// Enable or disable horizontal mirroring (front camera convention)
    #[must_use]
    pub fn with_mirroring(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    #[must_use]
    pub fn with_corner_accent_ratio(mut self, ratio: f32) -> Self {
        self.corner_accent_ratio = ratio;
        self
    }

    /// Update the surface size, e.g. after a layout change
    pub fn set_target_size(&mut self, target_width: f32, target_height: f32) {
        self.target_width = target_width;
        self.target_height = target_height;
    }

    #[must_use]
    pub const fn target_size(&self) -> (f32, f32) {
        (self.target_width, self.target_height)
    }

    #[must_use]
    pub const fn is_mirrored(&self) -> bool {
        self.mirror
    }

    /// Map a detection into surface coordinates
    ///
    /// Returns `None` when there is nothing to render: no region, or a zero or
    /// non-finite source or target dimension.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Image sizes fit comfortably in f32
    pub fn map(
        &self,
        region: Option<&BoundingRegion>,
        landmarks: &[Landmark],
        source_width: u32,
        source_height: u32,
    ) -> Option<OverlayGeometry> {
        let region = region?;
        if source_width == 0 || source_height == 0 || !self.has_drawable_surface() {
            return None;
        }

        let sx = self.target_width / source_width as f32;
        let sy = self.target_height / source_height as f32;

        let (left, right) = if self.mirror {
            (
                self.target_width - region.right * sx,
                self.target_width - region.left * sx,
            )
        } else {
            (region.left * sx, region.right * sx)
        };

        let mapped_landmarks = landmarks
            .iter()
            .map(|lm| MappedPoint {
                x: if self.mirror {
                    self.target_width - lm.x * self.target_width
                } else {
                    lm.x * self.target_width
                },
                y: lm.y * self.target_height,
                z: lm.z,
            })
            .collect();

        Some(OverlayGeometry {
            region: MappedRect {
                left,
                top: region.top * sy,
                right,
                bottom: region.bottom * sy,
            },
            landmarks: mapped_landmarks,
            corner_accent_ratio: self.corner_accent_ratio,
        })
    }

    fn has_drawable_surface(&self) -> bool {
        self.target_width.is_finite()
            && self.target_height.is_finite()
            && self.target_width > 0.0
            && self.target_height > 0.0
    }
}
