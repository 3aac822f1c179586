//! Recorded landmark sessions for offline replay.
//!
//! A recording lists, for each captured frame, what the landmark model saw:
//! zero or more faces (normalized landmarks plus blendshape scores) or a
//! scripted model failure. [`RecordingProvider`] plays those results back
//! through the [`LandmarkProvider`] capability, so the whole pipeline can run
//! without a model.
//!
//! ```yaml
//! source_width: 640
//! source_height: 480
//! frames:
//!   - faces:
//!       - landmarks: [{x: 0.4, y: 0.4}, {x: 0.6, y: 0.6}]
//!         blendshapes: {mouthSmileLeft: 0.9, mouthSmileRight: 0.9}
//!   - {}
//!   - error: "inference crashed"
//! ```

use crate::blendshapes::BlendshapeScores;
use crate::constants::{BOUNDING_BOX_PADDING, MIN_FACE_PRESENCE_CONFIDENCE};
use crate::frame::Frame;
use crate::geometry::{BoundingRegion, Landmark};
use crate::provider::{DetectionResult, LandmarkProvider};
use crate::{Error, Result};
use image::RgbImage;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn full_presence() -> f32 {
    1.0
}

/// One face as reported by the landmark model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFace {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub blendshapes: BlendshapeScores,
    /// Face presence confidence in `[0, 1]`
    #[serde(default = "full_presence")]
    pub presence: f32,
}

/// Model output for one captured frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedFrame {
    pub faces: Vec<RecordedFace>,
    /// Scripted model failure for this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A recorded capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub source_width: u32,
    pub source_height: u32,
    /// Clockwise rotation bringing captured frames upright
    #[serde(default)]
    pub rotation_degrees: u16,
    /// Still image used as the content of every captured frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Load a recording from a YAML file
    ///
    /// A relative `image` path is resolved against the recording's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut recording = Self::from_yaml_str(&content)?;

        if let (Some(image), Some(dir)) = (recording.image.as_mut(), path.parent()) {
            if image.is_relative() {
                *image = dir.join(&*image);
            }
        }

        info!(
            "Loaded recording {} ({} frames, {}x{})",
            path.display(),
            recording.len(),
            recording.source_width,
            recording.source_height
        );
        Ok(recording)
    }

    /// Parse and validate a recording from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid recording
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let recording: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::RecordingError(format!("Failed to parse recording: {e}")))?;
        recording.validate()?;
        Ok(recording)
    }

    /// Serialize to YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::RecordingError(format!("Failed to serialize recording: {e}")))
    }

    /// Check sizes, rotation, landmark values and face presence
    ///
    /// # Errors
    ///
    /// Returns an error describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.source_width == 0 || self.source_height == 0 {
            return Err(Error::RecordingError("Source dimensions must be non-zero".to_string()));
        }
        if !matches!(self.rotation_degrees, 0 | 90 | 180 | 270) {
            return Err(Error::RecordingError(format!(
                "Unsupported rotation: {} degrees",
                self.rotation_degrees
            )));
        }

        for (index, frame) in self.frames.iter().enumerate() {
            for face in &frame.faces {
                if face.landmarks.is_empty() {
                    return Err(Error::RecordingError(format!("Frame {index}: face without landmarks")));
                }
                let finite = face
                    .landmarks
                    .iter()
                    .all(|lm| lm.x.is_finite() && lm.y.is_finite() && lm.z.is_finite());
                if !finite {
                    return Err(Error::RecordingError(format!("Frame {index}: non-finite landmark")));
                }
                if !(0.0..=1.0).contains(&face.presence) {
                    return Err(Error::RecordingError(format!(
                        "Frame {index}: presence {} outside [0, 1]",
                        face.presence
                    )));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load the capture content shared by all frames
    ///
    /// Without an `image`, frames are blank at the source size.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be opened or decoded
    pub fn load_capture_image(&self) -> Result<RgbImage> {
        match &self.image {
            Some(path) => Ok(image::open(path)?.to_rgb8()),
            None => Ok(RgbImage::new(self.source_width, self.source_height)),
        }
    }

    /// Captured frame built from `capture`, with the recorded rotation
    ///
    /// # Errors
    ///
    /// Returns an error if the recorded rotation is unsupported
    pub fn capture_frame(&self, capture: &RgbImage) -> Result<Frame> {
        Frame::new(capture.clone()).with_rotation(self.rotation_degrees)
    }
}

/// Shared position of the replay within a recording
///
/// The replay driver moves the playhead to each captured frame before handing
/// it to the pipeline; the provider reads the recorded result at the playhead.
/// Sampled-out frames are never detected, so their entries are never read.
#[derive(Debug, Clone, Default)]
pub struct Playhead {
    position: Arc<AtomicUsize>,
}

impl Playhead {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seek(&self, frame_index: usize) {
        self.position.store(frame_index, Ordering::SeqCst);
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position.load(Ordering::SeqCst)
    }
}

/// Landmark provider answering from a [`Recording`]
#[derive(Debug)]
pub struct RecordingProvider {
    frames: Vec<RecordedFrame>,
    playhead: Playhead,
    padding: f32,
    min_presence: f32,
    closed: bool,
}

impl RecordingProvider {
    #[must_use]
    pub fn new(recording: &Recording) -> Self {
        Self {
            frames: recording.frames.clone(),
            playhead: Playhead::new(),
            padding: BOUNDING_BOX_PADDING,
            min_presence: MIN_FACE_PRESENCE_CONFIDENCE,
            closed: false,
        }
    }

    /// Load the recording at `path` and build a provider for it
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderUnavailable`] if the recording cannot be loaded
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let recording = Recording::from_file(path.as_ref())
            .map_err(|e| Error::ProviderUnavailable(format!("{}: {e}", path.as_ref().display())))?;
        Ok(Self::new(&recording))
    }

    /// Padding ratio used when deriving face regions
    #[must_use]
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// Faces below this presence confidence are not reported
    #[must_use]
    pub fn with_min_presence(mut self, min_presence: f32) -> Self {
        self.min_presence = min_presence;
        self
    }

    /// Handle for positioning the replay
    #[must_use]
    pub fn playhead(&self) -> Playhead {
        self.playhead.clone()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl LandmarkProvider for RecordingProvider {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectionResult>> {
        if self.closed {
            return Err(Error::ProviderFailure("Recording provider is closed".to_string()));
        }

        let index = self.playhead.position();
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| Error::RecordingError(format!("No recorded frame at index {index}")))?;

        if let Some(message) = &frame.error {
            return Err(Error::ProviderFailure(message.clone()));
        }

        let (width, height) = image.dimensions();
        let detections: Vec<DetectionResult> = frame
            .faces
            .iter()
            .filter(|face| face.presence >= self.min_presence)
            .filter_map(|face| {
                let region =
                    BoundingRegion::from_landmarks_with_padding(&face.landmarks, width, height, self.padding)?;
                Some(DetectionResult {
                    region,
                    landmarks: face.landmarks.clone(),
                    blendshapes: face.blendshapes.clone(),
                    image_width: width,
                    image_height: height,
                })
            })
            .collect();

        debug!("Recorded frame {index}: {} face(s)", detections.len());
        Ok(detections)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn name(&self) -> &str {
        "RecordingProvider"
    }
}
