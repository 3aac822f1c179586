//! Per-frame facial emotion and eye-state inference.
//!
//! A landmark model turns each camera frame into a face mesh plus a set of
//! named blendshape scores. This library sits on top of that model:
//! 1. A frame sampler drops all but every Nth frame
//! 2. A [`provider::LandmarkProvider`] detects at most one face
//! 3. Blendshapes are scored into one of five emotions and an eye state
//! 4. The face region and landmarks are mapped onto a (mirrored) overlay surface
//! 5. The result is handed to an [`sink::OutputSink`]
//!
//! The landmark model is external; [`recording::RecordingProvider`] replays
//! recorded model output so the pipeline can run without one.
//!
//! # Examples
//!
//! ## Scoring blendshapes
//!
//! ```
//! use face_emotion_pipeline::blendshapes::{names, BlendshapeScores};
//! use face_emotion_pipeline::emotion::{Emotion, EmotionScorer};
//! use face_emotion_pipeline::eye_state::{EyeState, EyeStateScorer};
//!
//! let scores: BlendshapeScores = [
//!     (names::MOUTH_SMILE_LEFT, 0.9),
//!     (names::MOUTH_SMILE_RIGHT, 0.9),
//!     (names::CHEEK_SQUINT_LEFT, 0.9),
//!     (names::CHEEK_SQUINT_RIGHT, 0.9),
//! ]
//! .into_iter()
//! .collect();
//!
//! let result = EmotionScorer::default().score(&scores);
//! assert_eq!(result.emotion, Emotion::Happy);
//! assert_eq!(EyeStateScorer::default().score(&scores), EyeState::Open);
//! ```
//!
//! ## Running frames through the pipeline
//!
//! ```
//! use face_emotion_pipeline::frame::Frame;
//! use face_emotion_pipeline::pipeline::{EmotionPipeline, FrameOutcome};
//! use face_emotion_pipeline::provider::PlaceholderProvider;
//! use face_emotion_pipeline::sink::LatestOutput;
//!
//! let outputs = LatestOutput::new();
//! let mut pipeline = EmotionPipeline::new(PlaceholderProvider::default()).with_sink(outputs.clone());
//!
//! // Default sampling processes frames 3, 6, 9, ...
//! assert_eq!(pipeline.process_frame(Frame::blank(640, 480)), FrameOutcome::Skipped);
//! assert_eq!(pipeline.process_frame(Frame::blank(640, 480)), FrameOutcome::Skipped);
//! assert_eq!(pipeline.process_frame(Frame::blank(640, 480)), FrameOutcome::Published);
//! assert!(outputs.latest().is_some_and(|output| output.is_face()));
//! ```

/// Named blendshape scores
pub mod blendshapes;

/// Landmark points and face bounding regions
pub mod geometry;

/// Emotion classification
pub mod emotion;

/// Eye open/closed classification
pub mod eye_state;

/// Frame sampling
pub mod sampler;

/// Source-to-surface coordinate mapping for the overlay
pub mod overlay;

/// Captured frames
pub mod frame;

/// Landmark provider capability and its degraded mode
pub mod provider;

/// Output hand-off
pub mod sink;

/// Per-frame pipeline orchestration
pub mod pipeline;

/// Background processing with a latest-frame slot
pub mod worker;

/// Recorded sessions and replay provider
pub mod recording;

/// Error types and result handling
pub mod error;

/// Replay application
pub mod app;

/// Constants used throughout the pipeline
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
