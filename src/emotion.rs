//! Emotion classification from blendshape scores.
//!
//! Four composite scores are computed as unweighted means of fixed blendshape
//! groups. The strongest composite wins if it clears the activation threshold;
//! otherwise the face is reported as neutral, with a confidence equal to the
//! complement of the strongest composite.
//!
//! Ties between composites resolve by the fixed priority
//! `Happy > Sad > Angry > Nervous`.

use crate::blendshapes::{names, BlendshapeScores};
use crate::constants::EMOTION_ACTIVATION_THRESHOLD;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

const HAPPY_GROUP: [&str; 4] = [
    names::MOUTH_SMILE_LEFT,
    names::MOUTH_SMILE_RIGHT,
    names::CHEEK_SQUINT_LEFT,
    names::CHEEK_SQUINT_RIGHT,
];

const SAD_GROUP: [&str; 4] = [
    names::MOUTH_FROWN_LEFT,
    names::MOUTH_FROWN_RIGHT,
    names::BROW_DOWN_LEFT,
    names::BROW_DOWN_RIGHT,
];

const ANGRY_GROUP: [&str; 6] = [
    names::BROW_DOWN_LEFT,
    names::BROW_DOWN_RIGHT,
    names::NOSE_SNEER_LEFT,
    names::NOSE_SNEER_RIGHT,
    names::MOUTH_PRESS_LEFT,
    names::MOUTH_PRESS_RIGHT,
];

const NERVOUS_GROUP: [&str; 4] = [
    names::BROW_INNER_UP,
    names::EYE_WIDE_LEFT,
    names::EYE_WIDE_RIGHT,
    names::JAW_OPEN,
];

/// Closed set of reported emotions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Nervous,
    #[default]
    Neutral,
}

impl Emotion {
    /// Non-neutral emotions in tie-break priority order
    pub const SCORED: [Self; 4] = [Self::Happy, Self::Sad, Self::Angry, Self::Nervous];

    /// Upper-case display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Happy => "HAPPY",
            Self::Sad => "SAD",
            Self::Angry => "ANGRY",
            Self::Nervous => "NERVOUS",
            Self::Neutral => "NEUTRAL",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Sad => "😢",
            Self::Angry => "😠",
            Self::Nervous => "😰",
            Self::Neutral => "😐",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HAPPY" => Ok(Self::Happy),
            "SAD" => Ok(Self::Sad),
            "ANGRY" => Ok(Self::Angry),
            "NERVOUS" => Ok(Self::Nervous),
            "NEUTRAL" => Ok(Self::Neutral),
            _ => Err(Error::InvalidInput(format!("Unknown emotion label: {s}"))),
        }
    }
}

/// Classification of one face in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionResult {
    pub emotion: Emotion,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    pub timestamp: SystemTime,
}

impl EmotionResult {
    #[must_use]
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self {
            emotion,
            confidence,
            timestamp: SystemTime::now(),
        }
    }

    /// Confidence as a truncated whole percentage
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Confidence is in [0, 1]
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0) as u8
    }

    /// Compare label and confidence, ignoring the timestamp
    #[must_use]
    pub fn same_classification(&self, other: &Self) -> bool {
        self.emotion == other.emotion && self.confidence == other.confidence
    }
}

impl Default for EmotionResult {
    fn default() -> Self {
        Self::new(Emotion::Neutral, 0.0)
    }
}

/// Composite score per non-neutral emotion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompositeScores {
    pub happy: f32,
    pub sad: f32,
    pub angry: f32,
    pub nervous: f32,
}

impl CompositeScores {
    #[must_use]
    pub fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Nervous => self.nervous,
            Emotion::Neutral => 0.0,
        }
    }

    /// Strongest composite, first in priority order on ties
    #[must_use]
    pub fn dominant(&self) -> (Emotion, f32) {
        let mut best = (Emotion::Happy, self.happy);
        for emotion in &Emotion::SCORED[1..] {
            let score = self.get(*emotion);
            if score > best.1 {
                best = (*emotion, score);
            }
        }
        best
    }
}

/// Stateless emotion scorer
#[derive(Debug, Clone, Copy)]
pub struct EmotionScorer {
    activation_threshold: f32,
}

impl Default for EmotionScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionScorer {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(EMOTION_ACTIVATION_THRESHOLD)
    }

    /// Scorer with a custom activation threshold (exclusive)
    #[must_use]
    pub const fn with_threshold(activation_threshold: f32) -> Self {
        Self { activation_threshold }
    }

    #[must_use]
    pub const fn activation_threshold(&self) -> f32 {
        self.activation_threshold
    }

    #[must_use]
    pub fn composite_scores(&self, blendshapes: &BlendshapeScores) -> CompositeScores {
        CompositeScores {
            happy: blendshapes.mean_of(&HAPPY_GROUP),
            sad: blendshapes.mean_of(&SAD_GROUP),
            angry: blendshapes.mean_of(&ANGRY_GROUP),
            nervous: blendshapes.mean_of(&NERVOUS_GROUP),
        }
    }

    /// Classify one blendshape set
    #[must_use]
    pub fn score(&self, blendshapes: &BlendshapeScores) -> EmotionResult {
        let (emotion, strongest) = self.composite_scores(blendshapes).dominant();

        if strongest > self.activation_threshold {
            EmotionResult::new(emotion, strongest)
        } else {
            EmotionResult::new(Emotion::Neutral, 1.0 - strongest)
        }
    }
}
