//! Integration tests for the emotion pipeline


use face_emotion_pipeline::{
    blendshapes::{names, BlendshapeScores},
    emotion::{Emotion, EmotionScorer},
    eye_state::{EyeState, EyeStateScorer},
    frame::Frame,
    geometry::BoundingRegion,
    overlay::CoordinateMapper,
    pipeline::{EmotionPipeline, FrameOutcome, PipelineOutput, PipelineStatus},
    provider::{PlaceholderProvider, ResilientProvider},
    sampler::FrameSampler,
    sink::LatestOutput,
    worker::{LatestFrameSlot, PipelineWorker},
};
use std::sync::mpsc;
use test_helpers::{blendshapes, face, ScriptedProvider, Step};

#[test]
fn test_all_zero_blendshapes_are_neutral_and_open() {
    let scores = blendshapes(&[
        (names::MOUTH_SMILE_LEFT, 0.0),
        (names::BROW_DOWN_LEFT, 0.0),
        (names::JAW_OPEN, 0.0),
        (names::EYE_BLINK_LEFT, 0.0),
        (names::EYE_BLINK_RIGHT, 0.0),
    ]);

    let emotion = EmotionScorer::default().score(&scores);
    assert_eq!(emotion.emotion, Emotion::Neutral);
    assert_eq!(emotion.confidence, 1.0);
    assert_eq!(EyeStateScorer::default().score(&scores), EyeState::Open);
}

#[test]
fn test_happy_face() {
    let scores = blendshapes(&[
        (names::MOUTH_SMILE_LEFT, 0.9),
        (names::MOUTH_SMILE_RIGHT, 0.9),
        (names::CHEEK_SQUINT_LEFT, 0.9),
        (names::CHEEK_SQUINT_RIGHT, 0.9),
    ]);

    let emotion = EmotionScorer::default().score(&scores);
    assert_eq!(emotion.emotion, Emotion::Happy);
    assert!((emotion.confidence - 0.9).abs() < 1e-6);
}

#[test]
fn test_blink_threshold() {
    let scorer = EyeStateScorer::default();
    let closed = blendshapes(&[(names::EYE_BLINK_LEFT, 0.5), (names::EYE_BLINK_RIGHT, 0.5)]);
    let open = blendshapes(&[(names::EYE_BLINK_LEFT, 0.3), (names::EYE_BLINK_RIGHT, 0.3)]);

    assert_eq!(scorer.score(&closed), EyeState::Closed);
    assert_eq!(scorer.score(&open), EyeState::Open);
}

#[test]
fn test_sampler_selects_every_third_frame() {
    let mut sampler = FrameSampler::default();
    let processed: Vec<u64> = (1..=9).filter(|_| sampler.next_frame()).collect();
    assert_eq!(processed, vec![3, 6, 9]);
}

#[test]
fn test_mapper_worked_example() {
    let mapper = CoordinateMapper::new(320.0, 240.0);
    let region = BoundingRegion::new(100.0, 50.0, 300.0, 250.0);

    let overlay = mapper.map(Some(&region), &[], 640, 480).unwrap();
    assert_eq!(overlay.region.left, 170.0);
    assert_eq!(overlay.region.top, 25.0);
    assert_eq!(overlay.region.right, 270.0);
    assert_eq!(overlay.region.bottom, 125.0);
}

#[test]
fn test_scoring_is_idempotent() {
    let scores = blendshapes(&[
        (names::BROW_DOWN_LEFT, 0.7),
        (names::BROW_DOWN_RIGHT, 0.6),
        (names::NOSE_SNEER_LEFT, 0.5),
        (names::EYE_BLINK_LEFT, 0.45),
        (names::EYE_BLINK_RIGHT, 0.4),
    ]);
    let emotion_scorer = EmotionScorer::default();
    let eye_scorer = EyeStateScorer::default();

    let first = emotion_scorer.score(&scores);
    let second = emotion_scorer.score(&scores);
    assert!(first.same_classification(&second));
    assert_eq!(eye_scorer.score(&scores), eye_scorer.score(&scores));
}

#[test]
fn test_missing_keys_read_as_zero() {
    let only_blink = blendshapes(&[(names::EYE_BLINK_LEFT, 0.9)]);

    // Mean of 0.9 and a missing 0.0 stays above the blink threshold
    assert_eq!(EyeStateScorer::default().score(&only_blink), EyeState::Closed);
    assert_eq!(EmotionScorer::default().score(&only_blink).emotion, Emotion::Neutral);
    assert_eq!(EmotionScorer::default().score(&BlendshapeScores::new()).confidence, 1.0);
}

#[test]
fn test_placeholder_face_end_to_end() {
    let outputs = LatestOutput::new();
    let provider: ResilientProvider<PlaceholderProvider> = ResilientProvider::degraded();
    let mut pipeline = EmotionPipeline::new(provider)
        .with_sampler(FrameSampler::new(1).unwrap())
        .with_mapper(CoordinateMapper::new(320.0, 240.0))
        .with_sink(outputs.clone());

    assert_eq!(pipeline.process_frame(Frame::blank(640, 480)), FrameOutcome::Published);

    let output = outputs.latest().unwrap();
    let face = output.face().unwrap();
    assert_eq!(face.emotion.emotion, Emotion::Neutral);
    assert_eq!(face.emotion.confidence, 1.0);
    assert_eq!(face.eye_state, EyeState::Open);
    assert!(face.landmarks.is_empty());
    assert_eq!((face.source_width, face.source_height), (640, 480));

    // Half extent = 0.3 * 480 = 144 around (320, 240)
    assert_eq!(face.region, BoundingRegion::new(176.0, 96.0, 464.0, 384.0));
    let overlay = face.overlay.as_ref().unwrap();
    assert!(overlay.landmarks.is_empty());
    assert_eq!(overlay.region.left, 88.0);
    assert_eq!(overlay.region.right, 232.0);
}

#[test]
fn test_no_face_end_to_end() {
    let outputs = LatestOutput::new();
    let mut pipeline = EmotionPipeline::new(ScriptedProvider::new(vec![Step::NoFace]))
        .with_sampler(FrameSampler::new(1).unwrap())
        .with_sink(outputs.clone());

    assert_eq!(pipeline.process_frame(Frame::blank(64, 48)), FrameOutcome::Published);
    assert_eq!(outputs.latest(), Some(PipelineOutput::NoFace));
    assert_eq!(pipeline.status(), &PipelineStatus::NoFace);
    assert_eq!(pipeline.eye_state(), EyeState::Unknown);
}

#[test]
fn test_mixed_session_with_default_sampling() {
    let happy = blendshapes(&[
        (names::MOUTH_SMILE_LEFT, 0.8),
        (names::MOUTH_SMILE_RIGHT, 0.8),
        (names::CHEEK_SQUINT_LEFT, 0.6),
        (names::CHEEK_SQUINT_RIGHT, 0.6),
    ]);
    let sad = blendshapes(&[
        (names::MOUTH_FROWN_LEFT, 0.7),
        (names::MOUTH_FROWN_RIGHT, 0.7),
        (names::BROW_DOWN_LEFT, 0.2),
        (names::BROW_DOWN_RIGHT, 0.2),
    ]);
    let provider = ScriptedProvider::new(vec![
        Step::Face(face(happy, 640, 480)),
        Step::NoFace,
        Step::Face(face(sad, 640, 480)),
    ]);
    let calls = provider.calls.clone();

    let (tx, rx) = mpsc::channel();
    let mut pipeline = EmotionPipeline::new(provider).with_sink(move |output: PipelineOutput| {
        let _ = tx.send(output);
    });

    let outcomes: Vec<FrameOutcome> = (0..9).map(|_| pipeline.process_frame(Frame::blank(640, 480))).collect();
    drop(pipeline);

    let published = outcomes.iter().filter(|o| **o == FrameOutcome::Published).count();
    assert_eq!(published, 3);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);

    let emotions: Vec<Option<Emotion>> = rx
        .iter()
        .map(|output| output.face().map(|face| face.emotion.emotion))
        .collect();
    assert_eq!(emotions, vec![Some(Emotion::Happy), None, Some(Emotion::Sad)]);
}

#[test]
fn test_surface_resize_applies_to_next_frame() {
    let outputs = LatestOutput::new();
    let detection = face(BlendshapeScores::new(), 640, 480);
    let mut pipeline = EmotionPipeline::new(ScriptedProvider::new(vec![
        Step::Face(detection.clone()),
        Step::Face(detection),
    ]))
    .with_sampler(FrameSampler::new(1).unwrap())
    .with_mapper(CoordinateMapper::new(320.0, 240.0))
    .with_sink(outputs.clone());

    pipeline.process_frame(Frame::blank(640, 480));
    pipeline.mapper_mut().set_target_size(640.0, 480.0);
    pipeline.process_frame(Frame::blank(640, 480));

    let output = outputs.latest().unwrap();
    let overlay = output.face().unwrap().overlay.as_ref().unwrap();
    // Mirrored at 1:1 scale
    assert_eq!(overlay.region.left, 340.0);
    assert_eq!(overlay.region.right, 540.0);
    assert_eq!(overlay.landmarks[0].x, 320.0);
}

#[test]
fn test_worker_end_to_end() {
    let outputs = LatestOutput::new();
    let pipeline = EmotionPipeline::new(PlaceholderProvider::default())
        .with_sampler(FrameSampler::new(1).unwrap())
        .with_sink(outputs.clone());
    let worker = PipelineWorker::spawn(pipeline, LatestFrameSlot::new()).unwrap();

    for _ in 0..10 {
        worker.slot().offer(Frame::blank(32, 24));
    }
    let stats = worker.finish().unwrap();

    // Replaced frames never reach the pipeline
    assert!(stats.published >= 1);
    assert!(stats.published <= 10);
    assert_eq!(outputs.version(), stats.published);
    assert!(outputs.latest().unwrap().is_face());
}
