//! Constants used throughout the pipeline

/// Process one frame out of every N captured frames
pub const DEFAULT_FRAME_INTERVAL: u64 = 3;

/// Minimum composite score for a non-neutral emotion (exclusive)
pub const EMOTION_ACTIVATION_THRESHOLD: f32 = 0.25;

/// Mean blink score above which eyes count as closed (exclusive)
pub const EYE_CLOSED_THRESHOLD: f32 = 0.4;

/// Padding added around the raw landmark extent, as a fraction of the extent
pub const BOUNDING_BOX_PADDING: f32 = 0.1;

/// Half-extent of the placeholder face box, as a fraction of the shorter image side
pub const PLACEHOLDER_HALF_EXTENT: f32 = 0.3;

/// Length of overlay corner accents, as a fraction of the shorter box side
pub const CORNER_ACCENT_RATIO: f32 = 0.15;

/// Single-face mode
pub const MAX_FACES: usize = 1;

/// Landmark model confidence minimums
pub const MIN_FACE_DETECTION_CONFIDENCE: f32 = 0.5;
pub const MIN_FACE_PRESENCE_CONFIDENCE: f32 = 0.5;
pub const MIN_TRACKING_CONFIDENCE: f32 = 0.5;

/// Landmark model asset file name
pub const DEFAULT_MODEL_FILE: &str = "face_landmarker.task";

/// Default overlay surface size
pub const DEFAULT_TARGET_WIDTH: f32 = 1080.0;
pub const DEFAULT_TARGET_HEIGHT: f32 = 1920.0;
