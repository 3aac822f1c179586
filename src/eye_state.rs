//! Eye open/closed classification from blink blendshapes.

use crate::blendshapes::{names, BlendshapeScores};
use crate::constants::EYE_CLOSED_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Eye state of the tracked face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EyeState {
    Open,
    Closed,
    /// No face has been scored yet
    #[default]
    Unknown,
}

impl EyeState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "EYES OPEN",
            Self::Closed => "EYES CLOSED",
            Self::Unknown => "DETECTING...",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Open => "👁",
            Self::Closed => "😑",
            Self::Unknown => "🔍",
        }
    }
}

impl fmt::Display for EyeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Blink threshold scorer
#[derive(Debug, Clone, Copy)]
pub struct EyeStateScorer {
    closed_threshold: f32,
}

impl Default for EyeStateScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeStateScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(EYE_CLOSED_THRESHOLD)
    }

    #[must_use]
    pub const fn with_threshold(closed_threshold: f32) -> Self {
        Self { closed_threshold }
    }

    #[must_use]
    pub const fn closed_threshold(&self) -> f32 {
        self.closed_threshold
    }

    /// Classify a blendshape set; never returns [`EyeState::Unknown`]
    #[must_use]
    pub fn score(&self, blendshapes: &BlendshapeScores) -> EyeState {
        let blink = blendshapes.mean_of(&[names::EYE_BLINK_LEFT, names::EYE_BLINK_RIGHT]);
        if blink > self.closed_threshold {
            EyeState::Closed
        } else {
            EyeState::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blink(left: f32, right: f32) -> BlendshapeScores {
        [(names::EYE_BLINK_LEFT, left), (names::EYE_BLINK_RIGHT, right)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_closed_above_threshold() {
        assert_eq!(EyeStateScorer::new().score(&blink(0.5, 0.5)), EyeState::Closed);
    }

    #[test]
    fn test_open_below_threshold() {
        assert_eq!(EyeStateScorer::new().score(&blink(0.3, 0.3)), EyeState::Open);
    }

    #[test]
    fn test_one_eye_closed_is_open_on_average() {
        // Wink: mean 0.35
        assert_eq!(EyeStateScorer::new().score(&blink(0.7, 0.0)), EyeState::Open);
    }

    #[test]
    fn test_empty_blendshapes_are_open() {
        assert_eq!(EyeStateScorer::new().score(&BlendshapeScores::new()), EyeState::Open);
    }

    #[test]
    fn test_labels() {
        assert_eq!(EyeState::Open.label(), "EYES OPEN");
        assert_eq!(EyeState::Closed.label(), "EYES CLOSED");
        assert_eq!(EyeState::Unknown.to_string(), "DETECTING...");
        assert_eq!(EyeState::default(), EyeState::Unknown);
    }
}
