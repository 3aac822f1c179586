//! Landmark points and face bounding regions.

use crate::constants::BOUNDING_BOX_PADDING;
use serde::{Deserialize, Serialize};

/// Normalized 3-D landmark point
///
/// `x` and `y` are relative to the image width and height, `z` is relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned face region in source image pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingRegion {
    #[must_use]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Bounding region of a landmark mesh in pixel space
    ///
    /// The raw landmark extent is padded by [`BOUNDING_BOX_PADDING`] of its size on
    /// each side and clamped to the image. Returns `None` for an empty mesh.
    #[must_use]
    pub fn from_landmarks(landmarks: &[Landmark], image_width: u32, image_height: u32) -> Option<Self> {
        Self::from_landmarks_with_padding(landmarks, image_width, image_height, BOUNDING_BOX_PADDING)
    }

    /// Same as [`BoundingRegion::from_landmarks`] with an explicit padding ratio
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Image sizes fit comfortably in f32
    pub fn from_landmarks_with_padding(
        landmarks: &[Landmark],
        image_width: u32,
        image_height: u32,
        padding: f32,
    ) -> Option<Self> {
        if landmarks.is_empty() {
            return None;
        }

        let width = image_width as f32;
        let height = image_height as f32;

        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for lm in landmarks {
            let x = lm.x * width;
            let y = lm.y * height;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let pad_x = (max_x - min_x) * padding;
        let pad_y = (max_y - min_y) * padding;

        // A mesh outside the image collapses onto the border
        Some(Self {
            left: (min_x - pad_x).clamp(0.0, width),
            top: (min_y - pad_y).clamp(0.0, height),
            right: (max_x + pad_x).clamp(0.0, width),
            bottom: (max_y + pad_y).clamp(0.0, height),
        })
    }

    /// Square region centered in the image, used when no model is available
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centered(image_width: u32, image_height: u32, half_extent_ratio: f32) -> Self {
        let cx = image_width as f32 / 2.0;
        let cy = image_height as f32 / 2.0;
        let half = image_width.min(image_height) as f32 * half_extent_ratio;
        Self::new(cx - half, cy - half, cx + half, cy + half)
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}
