//! Per-frame inference pipeline.
//!
//! Wires sampler, landmark provider, scorers and coordinate mapper into one
//! call per captured frame:
//!
//! 1. The [`FrameSampler`] decides whether the frame is processed at all
//! 2. The [`LandmarkProvider`] detects at most one face
//! 3. Emotion and eye state are scored from the face's blendshapes
//! 4. The region and landmarks are mapped onto the overlay surface
//! 5. The resulting [`PipelineOutput`] is moved into the [`OutputSink`]
//!
//! Each frame is classified independently; nothing but the sampler counter,
//! the status and the last eye state carries over between frames.

use crate::emotion::{EmotionResult, EmotionScorer};
use crate::eye_state::{EyeState, EyeStateScorer};
use crate::frame::Frame;
use crate::geometry::{BoundingRegion, Landmark};
use crate::overlay::{CoordinateMapper, OverlayGeometry};
use crate::provider::{DetectionResult, LandmarkProvider};
use crate::sampler::FrameSampler;
use crate::sink::{DiscardSink, OutputSink};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything the presentation layer needs for one detected face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceData {
    pub emotion: EmotionResult,
    pub eye_state: EyeState,
    pub landmarks: Vec<Landmark>,
    pub region: BoundingRegion,
    pub source_width: u32,
    pub source_height: u32,
    /// Geometry mapped onto the overlay surface; `None` when nothing can be drawn
    pub overlay: Option<OverlayGeometry>,
}

/// Result of one processed frame
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    NoFace,
    Face(FaceData),
}

impl PipelineOutput {
    #[must_use]
    pub fn face(&self) -> Option<&FaceData> {
        match self {
            Self::Face(face) => Some(face),
            Self::NoFace => None,
        }
    }

    #[must_use]
    pub fn is_face(&self) -> bool {
        matches!(self, Self::Face(_))
    }
}

/// Pipeline state machine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineStatus {
    /// Nothing processed yet
    #[default]
    Idle,
    NoFace,
    FaceDetected,
    /// Set by the caller; blocks processing until [`EmotionPipeline::reset`]
    Error(String),
}

/// What happened to a frame handed to [`EmotionPipeline::process_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Dropped by the sampler
    Skipped,
    /// Processed and delivered to the sink
    Published,
    /// Processed, but the session was cancelled before delivery
    Discarded,
    /// Not processed because the pipeline is in the error state
    Blocked,
}

/// Cancellation token shared between a pipeline and its owner
///
/// Cancelling and publishing serialize on the same lock, so nothing is
/// published once [`SessionHandle::cancel`] has returned.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    cancelled: Arc<AtomicBool>,
    publish_gate: Arc<Mutex<()>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear down the session; in-flight results are discarded
    pub fn cancel(&self) {
        let _gate = self.lock_gate();
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run `publish` unless the session is cancelled; returns whether it ran
    fn publish_if_active(&self, publish: impl FnOnce()) -> bool {
        let _gate = self.lock_gate();
        if self.is_cancelled() {
            return false;
        }
        publish();
        true
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.publish_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Emotion and eye-state pipeline over one landmark provider
pub struct EmotionPipeline<P: LandmarkProvider> {
    provider: P,
    sampler: FrameSampler,
    emotion_scorer: EmotionScorer,
    eye_state_scorer: EyeStateScorer,
    mapper: CoordinateMapper,
    sink: Box<dyn OutputSink>,
    session: SessionHandle,
    status: PipelineStatus,
    eye_state: EyeState,
    detection_count: u64,
    closed: bool,
}

impl<P: LandmarkProvider> EmotionPipeline<P> {
    /// Pipeline with default sampling, thresholds and overlay surface
    pub fn new(provider: P) -> Self {
        info!("Initializing emotion pipeline with provider: {}", provider.name());
        Self {
            provider,
            sampler: FrameSampler::default(),
            emotion_scorer: EmotionScorer::default(),
            eye_state_scorer: EyeStateScorer::default(),
            mapper: CoordinateMapper::default(),
            sink: Box::new(DiscardSink),
            session: SessionHandle::new(),
            status: PipelineStatus::Idle,
            eye_state: EyeState::Unknown,
            detection_count: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn with_sampler(mut self, sampler: FrameSampler) -> Self {
        self.sampler = sampler;
        self
    }

    #[must_use]
    pub fn with_emotion_scorer(mut self, scorer: EmotionScorer) -> Self {
        self.emotion_scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_eye_state_scorer(mut self, scorer: EyeStateScorer) -> Self {
        self.eye_state_scorer = scorer;
        self
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: CoordinateMapper) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub fn with_sink<S: OutputSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = session;
        self
    }

    /// Handle for cancelling this pipeline's session from another thread
    #[must_use]
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    #[must_use]
    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Last scored eye state; [`EyeState::Unknown`] until the first face
    #[must_use]
    pub fn eye_state(&self) -> EyeState {
        self.eye_state
    }

    /// Number of frames that produced a face
    #[must_use]
    pub fn detection_count(&self) -> u64 {
        self.detection_count
    }

    /// Mutable access to the overlay mapper, e.g. after a surface resize
    pub fn mapper_mut(&mut self) -> &mut CoordinateMapper {
        &mut self.mapper
    }

    /// Process one captured frame
    ///
    /// The frame is consumed on every path, so its buffer is released whether
    /// or not the sampler lets it through.
    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        if let PipelineStatus::Error(message) = &self.status {
            debug!("Pipeline in error state ({message}), dropping frame");
            return FrameOutcome::Blocked;
        }

        if !self.sampler.next_frame() {
            return FrameOutcome::Skipped;
        }

        if self.session.is_cancelled() {
            debug!("Session cancelled, dropping frame {}", self.sampler.frames_seen());
            return FrameOutcome::Discarded;
        }

        let detections = {
            let image = frame.upright();
            match self.provider.detect(&image) {
                Ok(detections) => detections,
                Err(e) => {
                    warn!("Landmark detection failed: {e}");
                    Vec::new()
                }
            }
        };
        drop(frame);

        let output = self.evaluate(detections.into_iter().next());

        let session = self.session.clone();
        let published = session.publish_if_active(|| {
            self.record(&output);
            self.sink.publish(output);
        });
        if !published {
            debug!("Session cancelled during detection, discarding result");
            return FrameOutcome::Discarded;
        }
        FrameOutcome::Published
    }

    /// Score and map a single detection without touching pipeline state
    #[must_use]
    pub fn evaluate(&self, detection: Option<DetectionResult>) -> PipelineOutput {
        let Some(detection) = detection else {
            return PipelineOutput::NoFace;
        };

        let emotion = self.emotion_scorer.score(&detection.blendshapes);
        let eye_state = self.eye_state_scorer.score(&detection.blendshapes);
        let overlay = self.mapper.map(
            Some(&detection.region),
            &detection.landmarks,
            detection.image_width,
            detection.image_height,
        );

        PipelineOutput::Face(FaceData {
            emotion,
            eye_state,
            landmarks: detection.landmarks,
            region: detection.region,
            source_width: detection.image_width,
            source_height: detection.image_height,
            overlay,
        })
    }

    fn record(&mut self, output: &PipelineOutput) {
        match output {
            PipelineOutput::NoFace => {
                debug!("No face detected");
                self.status = PipelineStatus::NoFace;
            }
            PipelineOutput::Face(face) => {
                debug!(
                    "Face: {} ({}%), {}",
                    face.emotion.emotion,
                    face.emotion.confidence_percent(),
                    face.eye_state
                );
                self.status = PipelineStatus::FaceDetected;
                self.eye_state = face.eye_state;
                self.detection_count = self.detection_count.saturating_add(1);
            }
        }
    }

    /// Enter the blocking error state
    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("Pipeline error: {message}");
        self.status = PipelineStatus::Error(message);
    }

    /// Back to idle: clears the error, eye state and sampler counter
    pub fn reset(&mut self) {
        info!("Resetting emotion pipeline");
        self.status = PipelineStatus::Idle;
        self.eye_state = EyeState::Unknown;
        self.sampler.reset();
    }

    /// End the session and release the provider
    pub fn shutdown(mut self) {
        self.session.cancel();
        self.close_provider();
    }

    fn close_provider(&mut self) {
        if !self.closed {
            self.closed = true;
            self.provider.close();
        }
    }
}

impl<P: LandmarkProvider> Drop for EmotionPipeline<P> {
    fn drop(&mut self) {
        self.close_provider();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blendshapes::{names, BlendshapeScores};
    use crate::emotion::Emotion;
    use crate::sink::LatestOutput;
    use crate::{Error, Result};
    use image::RgbImage;
    use std::sync::atomic::AtomicUsize;

    /// Provider that replays one detection for every call
    struct FixedProvider {
        detection: Option<DetectionResult>,
        calls: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl FixedProvider {
        fn new(detection: Option<DetectionResult>) -> Self {
            Self {
                detection,
                calls: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl LandmarkProvider for FixedProvider {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectionResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.detection.iter().cloned().collect())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "FixedProvider"
        }
    }

    struct BrokenProvider;

    impl LandmarkProvider for BrokenProvider {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectionResult>> {
            Err(Error::ProviderFailure("boom".to_string()))
        }

        fn name(&self) -> &str {
            "BrokenProvider"
        }
    }

    fn smiling_face() -> DetectionResult {
        DetectionResult {
            region: BoundingRegion::new(100.0, 50.0, 300.0, 250.0),
            landmarks: vec![Landmark::new(0.5, 0.5, 0.0)],
            blendshapes: [
                (names::MOUTH_SMILE_LEFT, 0.9),
                (names::MOUTH_SMILE_RIGHT, 0.9),
                (names::CHEEK_SQUINT_LEFT, 0.9),
                (names::CHEEK_SQUINT_RIGHT, 0.9),
                (names::EYE_BLINK_LEFT, 0.6),
                (names::EYE_BLINK_RIGHT, 0.6),
            ]
            .into_iter()
            .collect(),
            image_width: 640,
            image_height: 480,
        }
    }

    fn every_frame<P: LandmarkProvider>(provider: P) -> EmotionPipeline<P> {
        EmotionPipeline::new(provider)
            .with_sampler(FrameSampler::new(1).unwrap())
            .with_mapper(CoordinateMapper::new(320.0, 240.0))
    }

    #[test]
    fn test_initial_state() {
        let pipeline = EmotionPipeline::new(FixedProvider::new(None));
        assert_eq!(pipeline.status(), &PipelineStatus::Idle);
        assert_eq!(pipeline.eye_state(), EyeState::Unknown);
        assert_eq!(pipeline.detection_count(), 0);
    }

    #[test]
    fn test_sampled_out_frames_skip_provider() {
        let provider = FixedProvider::new(Some(smiling_face()));
        let calls = Arc::clone(&provider.calls);
        let mut pipeline = EmotionPipeline::new(provider);

        let outcomes: Vec<FrameOutcome> = (0..6).map(|_| pipeline.process_frame(Frame::blank(64, 48))).collect();

        assert_eq!(
            outcomes,
            vec![
                FrameOutcome::Skipped,
                FrameOutcome::Skipped,
                FrameOutcome::Published,
                FrameOutcome::Skipped,
                FrameOutcome::Skipped,
                FrameOutcome::Published,
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_status_frozen_on_skipped_frames() {
        let mut pipeline = EmotionPipeline::new(FixedProvider::new(None));
        for _ in 0..3 {
            pipeline.process_frame(Frame::blank(8, 8));
        }
        assert_eq!(pipeline.status(), &PipelineStatus::NoFace);

        pipeline.process_frame(Frame::blank(8, 8));
        assert_eq!(pipeline.status(), &PipelineStatus::NoFace);
    }

    #[test]
    fn test_face_frame_publishes_scored_output() {
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face()))).with_sink(sink.clone());

        assert_eq!(pipeline.process_frame(Frame::blank(640, 480)), FrameOutcome::Published);

        let output = sink.latest().unwrap();
        let face = output.face().unwrap();
        assert_eq!(face.emotion.emotion, Emotion::Happy);
        assert_eq!(face.eye_state, EyeState::Closed);
        let overlay = face.overlay.as_ref().unwrap();
        assert_eq!(overlay.region.left, 170.0);
        assert_eq!(overlay.landmarks.len(), 1);

        assert_eq!(pipeline.status(), &PipelineStatus::FaceDetected);
        assert_eq!(pipeline.eye_state(), EyeState::Closed);
        assert_eq!(pipeline.detection_count(), 1);
    }

    #[test]
    fn test_provider_failure_is_no_face() {
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(BrokenProvider).with_sink(sink.clone());

        assert_eq!(pipeline.process_frame(Frame::blank(64, 48)), FrameOutcome::Published);
        assert_eq!(sink.latest(), Some(PipelineOutput::NoFace));
        assert_eq!(pipeline.status(), &PipelineStatus::NoFace);
    }

    #[test]
    fn test_eye_state_survives_no_face_until_reset() {
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face())));
        pipeline.process_frame(Frame::blank(64, 48));
        assert_eq!(pipeline.eye_state(), EyeState::Closed);

        pipeline.provider.detection = None;
        pipeline.process_frame(Frame::blank(64, 48));
        assert_eq!(pipeline.status(), &PipelineStatus::NoFace);
        assert_eq!(pipeline.eye_state(), EyeState::Closed);

        pipeline.reset();
        assert_eq!(pipeline.status(), &PipelineStatus::Idle);
        assert_eq!(pipeline.eye_state(), EyeState::Unknown);
    }

    #[test]
    fn test_error_state_blocks_until_reset() {
        let provider = FixedProvider::new(Some(smiling_face()));
        let calls = Arc::clone(&provider.calls);
        let mut pipeline = every_frame(provider);

        pipeline.set_error("camera permission revoked");
        assert_eq!(
            pipeline.status(),
            &PipelineStatus::Error("camera permission revoked".to_string())
        );
        assert_eq!(pipeline.process_frame(Frame::blank(8, 8)), FrameOutcome::Blocked);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        pipeline.reset();
        assert_eq!(pipeline.process_frame(Frame::blank(8, 8)), FrameOutcome::Published);
    }

    #[test]
    fn test_cancelled_session_discards() {
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face()))).with_sink(sink.clone());

        pipeline.session().cancel();
        assert_eq!(pipeline.process_frame(Frame::blank(8, 8)), FrameOutcome::Discarded);
        assert!(sink.latest().is_none());
        assert_eq!(pipeline.status(), &PipelineStatus::Idle);
    }

    /// Frame whose release bumps `released`
    fn tracked_frame(released: &Arc<AtomicUsize>) -> Frame {
        let counter = Arc::clone(released);
        Frame::blank(64, 48).with_release_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_skipped_frame_is_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut pipeline = EmotionPipeline::new(FixedProvider::new(Some(smiling_face())));

        assert_eq!(pipeline.process_frame(tracked_frame(&released)), FrameOutcome::Skipped);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocked_frame_is_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face())));
        pipeline.set_error("camera disconnected");

        assert_eq!(pipeline.process_frame(tracked_frame(&released)), FrameOutcome::Blocked);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_discarded_frame_is_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face())));
        pipeline.session().cancel();

        assert_eq!(pipeline.process_frame(tracked_frame(&released)), FrameOutcome::Discarded);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_published_frame_is_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face()))).with_sink(sink.clone());

        assert_eq!(pipeline.process_frame(tracked_frame(&released)), FrameOutcome::Published);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(sink.latest().is_some());
    }

    /// Provider that cancels its own session mid-detection
    struct CancellingProvider {
        session: SessionHandle,
    }

    impl LandmarkProvider for CancellingProvider {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<DetectionResult>> {
            self.session.cancel();
            Ok(vec![smiling_face()])
        }

        fn name(&self) -> &str {
            "CancellingProvider"
        }
    }

    #[test]
    fn test_cancel_during_detection_discards_result() {
        let released = Arc::new(AtomicUsize::new(0));
        let session = SessionHandle::new();
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(CancellingProvider {
            session: session.clone(),
        })
        .with_session(session)
        .with_sink(sink.clone());

        assert_eq!(pipeline.process_frame(tracked_frame(&released)), FrameOutcome::Discarded);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(sink.version(), 0);
        assert_eq!(pipeline.status(), &PipelineStatus::Idle);
        assert_eq!(pipeline.detection_count(), 0);
    }

    #[test]
    fn test_nothing_published_after_cancel_returns() {
        let sink = LatestOutput::new();
        let mut pipeline = every_frame(FixedProvider::new(Some(smiling_face()))).with_sink(sink.clone());
        let session = pipeline.session();

        let worker = std::thread::spawn(move || {
            while pipeline.process_frame(Frame::blank(16, 16)) == FrameOutcome::Published {}
        });

        while sink.version() == 0 {
            std::thread::yield_now();
        }
        session.cancel();
        let published_at_cancel = sink.version();

        worker.join().unwrap();
        assert_eq!(sink.version(), published_at_cancel);
    }

    #[test]
    fn test_shutdown_closes_provider_once() {
        let provider = FixedProvider::new(None);
        let closes = Arc::clone(&provider.closes);
        let pipeline = EmotionPipeline::new(provider);

        pipeline.shutdown();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_provider() {
        let provider = FixedProvider::new(None);
        let closes = Arc::clone(&provider.closes);

        drop(EmotionPipeline::new(provider));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evaluate_empty_landmarks() {
        let pipeline = every_frame(FixedProvider::new(None));
        let detection = DetectionResult {
            region: BoundingRegion::new(100.0, 50.0, 300.0, 250.0),
            landmarks: Vec::new(),
            blendshapes: BlendshapeScores::new(),
            image_width: 640,
            image_height: 480,
        };

        let output = pipeline.evaluate(Some(detection));
        let face = output.face().unwrap();
        assert_eq!(face.emotion.emotion, Emotion::Neutral);
        assert_eq!(face.emotion.confidence, 1.0);
        assert_eq!(face.eye_state, EyeState::Open);
        let overlay = face.overlay.as_ref().unwrap();
        assert!(overlay.landmarks.is_empty());
        assert_eq!(overlay.region.right, 270.0);

        assert_eq!(pipeline.evaluate(None), PipelineOutput::NoFace);
    }
}
