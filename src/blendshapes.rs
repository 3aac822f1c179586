//! Named blendshape scores reported by the landmark model.
//!
//! A blendshape set maps ARKit-style names (for example `mouthSmileLeft`) to
//! activation scores. Scores are contractually in `[0, 1]`, but lookups are
//! defensive: a missing name reads as `0.0`, a NaN reads as `0.0` and anything
//! outside the unit range is clamped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Blendshape names consumed by the scorers
pub mod names {
    pub const MOUTH_SMILE_LEFT: &str = "mouthSmileLeft";
    pub const MOUTH_SMILE_RIGHT: &str = "mouthSmileRight";
    pub const CHEEK_SQUINT_LEFT: &str = "cheekSquintLeft";
    pub const CHEEK_SQUINT_RIGHT: &str = "cheekSquintRight";
    pub const MOUTH_FROWN_LEFT: &str = "mouthFrownLeft";
    pub const MOUTH_FROWN_RIGHT: &str = "mouthFrownRight";
    pub const BROW_DOWN_LEFT: &str = "browDownLeft";
    pub const BROW_DOWN_RIGHT: &str = "browDownRight";
    pub const NOSE_SNEER_LEFT: &str = "noseSneerLeft";
    pub const NOSE_SNEER_RIGHT: &str = "noseSneerRight";
    pub const MOUTH_PRESS_LEFT: &str = "mouthPressLeft";
    pub const MOUTH_PRESS_RIGHT: &str = "mouthPressRight";
    pub const BROW_INNER_UP: &str = "browInnerUp";
    pub const EYE_WIDE_LEFT: &str = "eyeWideLeft";
    pub const EYE_WIDE_RIGHT: &str = "eyeWideRight";
    pub const JAW_OPEN: &str = "jawOpen";
    pub const EYE_BLINK_LEFT: &str = "eyeBlinkLeft";
    pub const EYE_BLINK_RIGHT: &str = "eyeBlinkRight";
}

/// Blendshape name to score mapping for one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlendshapeScores {
    scores: HashMap<String, f32>,
}

impl BlendshapeScores {
    /// Create an empty score set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw score for a blendshape
    pub fn insert(&mut self, name: impl Into<String>, score: f32) {
        self.scores.insert(name.into(), score);
    }

    /// Score for `name`, or `0.0` when absent or not a number
    #[must_use]
    pub fn score(&self, name: &str) -> f32 {
        self.scores.get(name).copied().map_or(0.0, sanitize)
    }

    /// Unweighted mean of the named scores
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // A handful of names
    pub fn mean_of(&self, names: &[&str]) -> f32 {
        if names.is_empty() {
            return 0.0;
        }
        names.iter().map(|name| self.score(name)).sum::<f32>() / names.len() as f32
    }

    /// Number of named scores present
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no scores are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f32)> for BlendshapeScores {
    fn from_iter<I: IntoIterator<Item = (K, f32)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().map(|(name, score)| (name.into(), score)).collect(),
        }
    }
}

fn sanitize(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
