//! Configuration management for the emotion pipeline

use crate::constants::{
    BOUNDING_BOX_PADDING, CORNER_ACCENT_RATIO, DEFAULT_FRAME_INTERVAL, DEFAULT_MODEL_FILE, DEFAULT_TARGET_HEIGHT,
    DEFAULT_TARGET_WIDTH, EMOTION_ACTIVATION_THRESHOLD, EYE_CLOSED_THRESHOLD, MAX_FACES, MIN_FACE_DETECTION_CONFIDENCE,
    MIN_FACE_PRESENCE_CONFIDENCE, MIN_TRACKING_CONFIDENCE,
};
use crate::emotion::EmotionScorer;
use crate::eye_state::EyeStateScorer;
use crate::overlay::CoordinateMapper;
use crate::sampler::FrameSampler;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Landmark model configuration
    pub provider: ProviderConfig,

    /// Frame sampling configuration
    pub sampling: SamplingConfig,

    /// Emotion scoring configuration
    pub emotion: EmotionConfig,

    /// Eye state scoring configuration
    pub eye_state: EyeStateConfig,

    /// Overlay surface configuration
    pub overlay: OverlayConfig,

    /// Face region configuration
    pub detection: DetectionConfig,
}

/// Landmark model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Path to the landmark model asset
    pub model_path: PathBuf,

    /// Maximum number of faces passed to scoring
    pub max_faces: usize,

    /// Minimum face detection confidence (0.0-1.0)
    pub min_face_detection_confidence: f32,

    /// Minimum face presence confidence (0.0-1.0)
    pub min_face_presence_confidence: f32,

    /// Minimum tracking confidence (0.0-1.0)
    pub min_tracking_confidence: f32,
}

/// Frame sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Process one out of every N captured frames
    pub process_every_nth_frame: u64,
}

/// Emotion scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Composite score a non-neutral emotion must exceed
    pub activation_threshold: f32,
}

/// Eye state scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeStateConfig {
    /// Mean blink score above which eyes count as closed
    pub closed_threshold: f32,
}

/// Overlay surface parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Surface width in pixels
    pub target_width: f32,

    /// Surface height in pixels
    pub target_height: f32,

    /// Mirror horizontally (front camera)
    pub mirror: bool,

    /// Corner accent length as a fraction of the shorter box side
    pub corner_accent_ratio: f32,
}

/// Face region parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Padding around the landmark extent, as a fraction of the extent
    pub bbox_padding: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            max_faces: MAX_FACES,
            min_face_detection_confidence: MIN_FACE_DETECTION_CONFIDENCE,
            min_face_presence_confidence: MIN_FACE_PRESENCE_CONFIDENCE,
            min_tracking_confidence: MIN_TRACKING_CONFIDENCE,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            process_every_nth_frame: DEFAULT_FRAME_INTERVAL,
        }
    }
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            activation_threshold: EMOTION_ACTIVATION_THRESHOLD,
        }
    }
}

impl Default for EyeStateConfig {
    fn default() -> Self {
        Self {
            closed_threshold: EYE_CLOSED_THRESHOLD,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            mirror: true,
            corner_accent_ratio: CORNER_ACCENT_RATIO,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            bbox_padding: BOUNDING_BOX_PADDING,
        }
    }
}

fn check_unit_range(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_yaml_string()?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Serialize to YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Create the frame sampler
    ///
    /// # Errors
    ///
    /// Returns an error if the sampling interval is zero
    pub fn create_sampler(&self) -> Result<FrameSampler> {
        FrameSampler::new(self.sampling.process_every_nth_frame)
            .map_err(|e| Error::ConfigError(format!("Invalid sampling configuration: {e}")))
    }

    #[must_use]
    pub fn create_emotion_scorer(&self) -> EmotionScorer {
        EmotionScorer::with_threshold(self.emotion.activation_threshold)
    }

    #[must_use]
    pub fn create_eye_state_scorer(&self) -> EyeStateScorer {
        EyeStateScorer::with_threshold(self.eye_state.closed_threshold)
    }

    #[must_use]
    pub fn create_mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.overlay.target_width, self.overlay.target_height)
            .with_mirroring(self.overlay.mirror)
            .with_corner_accent_ratio(self.overlay.corner_accent_ratio)
    }

    /// Validate configuration
    ///
    /// The model path is not checked for existence; a missing model puts the
    /// provider into placeholder mode instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        // Provider
        if self.provider.max_faces == 0 {
            return Err(Error::ConfigError("Max faces must be greater than 0".to_string()));
        }
        check_unit_range("Minimum face detection confidence", self.provider.min_face_detection_confidence)?;
        check_unit_range("Minimum face presence confidence", self.provider.min_face_presence_confidence)?;
        check_unit_range("Minimum tracking confidence", self.provider.min_tracking_confidence)?;

        if self.sampling.process_every_nth_frame == 0 {
            return Err(Error::ConfigError(
                "Frame sampling interval must be greater than 0".to_string(),
            ));
        }

        // Scoring thresholds
        check_unit_range("Emotion activation threshold", self.emotion.activation_threshold)?;
        check_unit_range("Eye closed threshold", self.eye_state.closed_threshold)?;

        // Overlay surface
        let surface_ok = |v: f32| v.is_finite() && v > 0.0;
        if !surface_ok(self.overlay.target_width) || !surface_ok(self.overlay.target_height) {
            return Err(Error::ConfigError(
                "Overlay target size must be positive and finite".to_string(),
            ));
        }
        check_unit_range("Corner accent ratio", self.overlay.corner_accent_ratio)?;

        if !self.detection.bbox_padding.is_finite() || self.detection.bbox_padding < 0.0 {
            return Err(Error::ConfigError(
                "Bounding box padding must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Emotion Pipeline Configuration

# Landmark model
provider:
  model_path: "face_landmarker.task"
  max_faces: 1
  min_face_detection_confidence: 0.5
  min_face_presence_confidence: 0.5
  min_tracking_confidence: 0.5

# Frame sampling
sampling:
  process_every_nth_frame: 3

# Emotion scoring
emotion:
  activation_threshold: 0.25

# Eye state scoring
eye_state:
  closed_threshold: 0.4

# Overlay surface
overlay:
  target_width: 1080.0
  target_height: 1920.0
  mirror: true
  corner_accent_ratio: 0.15

# Face region
detection:
  bbox_padding: 0.1
"#;
