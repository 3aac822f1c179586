//! Face landmark provider capability.
//!
//! The landmark model itself is an external collaborator: anything that can
//! turn an image into zero or one [`DetectionResult`] implements
//! [`LandmarkProvider`]. [`ResilientProvider`] wraps a concrete model and
//! guarantees that nothing fails across the pipeline boundary: a model that
//! never loaded is replaced by a centered placeholder detection, and per-frame
//! failures become empty detection lists.

use crate::blendshapes::BlendshapeScores;
use crate::constants::{MAX_FACES, PLACEHOLDER_HALF_EXTENT};
use crate::geometry::{BoundingRegion, Landmark};
use crate::Result;
use image::RgbImage;
use log::{debug, info, warn};

/// One detected face
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResult {
    pub region: BoundingRegion,
    pub landmarks: Vec<Landmark>,
    pub blendshapes: BlendshapeScores,
    pub image_width: u32,
    pub image_height: u32,
}

impl DetectionResult {
    /// Build a detection from a landmark mesh, deriving the padded region
    ///
    /// Returns `None` when the mesh is empty.
    #[must_use]
    pub fn from_mesh(
        landmarks: Vec<Landmark>,
        blendshapes: BlendshapeScores,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        let region = BoundingRegion::from_landmarks(&landmarks, image_width, image_height)?;
        Some(Self {
            region,
            landmarks,
            blendshapes,
            image_width,
            image_height,
        })
    }
}

/// Capability: detect faces in an upright image
pub trait LandmarkProvider: Send {
    /// Detect faces; single-face providers return zero or one entry
    ///
    /// # Errors
    ///
    /// Implementations may fail per frame; callers treat failures as "no face".
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionResult>>;

    /// Release model resources; called once at session end
    fn close(&mut self) {}

    /// Provider name for logging
    fn name(&self) -> &str;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionResult>> {
        (**self).detect(image)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Degraded-mode provider: one centered face with no landmarks or blendshapes
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderProvider {
    half_extent_ratio: f32,
}

impl Default for PlaceholderProvider {
    fn default() -> Self {
        Self {
            half_extent_ratio: PLACEHOLDER_HALF_EXTENT,
        }
    }
}

impl PlaceholderProvider {
    /// Placeholder detection for an image of the given size
    #[must_use]
    pub fn detection(&self, image_width: u32, image_height: u32) -> DetectionResult {
        DetectionResult {
            region: BoundingRegion::centered(image_width, image_height, self.half_extent_ratio),
            landmarks: Vec::new(),
            blendshapes: BlendshapeScores::new(),
            image_width,
            image_height,
        }
    }
}

impl LandmarkProvider for PlaceholderProvider {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionResult>> {
        let (width, height) = image.dimensions();
        Ok(vec![self.detection(width, height)])
    }

    fn name(&self) -> &str {
        "PlaceholderProvider"
    }
}

/// Provider wrapper that never fails
pub struct ResilientProvider<P> {
    inner: Option<P>,
    placeholder: PlaceholderProvider,
    max_faces: usize,
}

impl<P: LandmarkProvider> ResilientProvider<P> {
    /// Wrap the outcome of loading a model
    ///
    /// A load failure switches the provider permanently into placeholder mode.
    pub fn new(loaded: Result<P>) -> Self {
        let inner = match loaded {
            Ok(provider) => {
                info!("Landmark provider ready: {}", provider.name());
                Some(provider)
            }
            Err(e) => {
                warn!("Landmark model unavailable, using placeholder detections: {e}");
                None
            }
        };

        Self {
            inner,
            placeholder: PlaceholderProvider::default(),
            max_faces: MAX_FACES,
        }
    }

    /// Provider that runs in placeholder mode from the start
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            inner: None,
            placeholder: PlaceholderProvider::default(),
            max_faces: MAX_FACES,
        }
    }

    /// Limit the number of faces passed on (at least one)
    #[must_use]
    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = max_faces.max(1);
        self
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.inner.is_none()
    }
}

impl<P: LandmarkProvider> LandmarkProvider for ResilientProvider<P> {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionResult>> {
        let Some(inner) = self.inner.as_mut() else {
            return self.placeholder.detect(image);
        };

        match inner.detect(image) {
            Ok(mut detections) => {
                detections.truncate(self.max_faces);
                Ok(detections)
            }
            Err(e) => {
                debug!("Detection failed, treating frame as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            info!("Closing landmark provider: {}", inner.name());
            inner.close();
        }
    }

    fn name(&self) -> &str {
        match &self.inner {
            Some(inner) => inner.name(),
            None => self.placeholder.name(),
        }
    }
}
