//! Replay application: runs a recorded session through the emotion pipeline.

use crate::{
    config::Config,
    emotion::Emotion,
    error::Result,
    pipeline::{EmotionPipeline, FrameOutcome, PipelineOutput},
    provider::ResilientProvider,
    recording::{Playhead, Recording, RecordingProvider},
    sink::LatestOutput,
};
use image::RgbImage;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Recorded session to replay
    pub recording_path: PathBuf,
    /// Pipeline settings
    pub settings: Config,
    /// Ignore recorded faces and report placeholder detections
    pub demo_mode: bool,
    /// Print one line per published frame
    pub print_frames: bool,
}

impl AppConfig {
    #[must_use]
    pub fn new(recording_path: impl Into<PathBuf>) -> Self {
        Self {
            recording_path: recording_path.into(),
            settings: Config::default(),
            demo_mode: false,
            print_frames: true,
        }
    }
}

/// Counts collected over one replay
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub frames: u64,
    pub skipped: u64,
    pub published: u64,
    pub discarded: u64,
    pub blocked: u64,
    pub no_face: u64,
    pub detections: u64,
    emotions: HashMap<Emotion, u64>,
    pub elapsed: Duration,
}

impl ReplaySummary {
    /// Published frames classified as `emotion`
    #[must_use]
    pub fn emotion_count(&self, emotion: Emotion) -> u64 {
        self.emotions.get(&emotion).copied().unwrap_or(0)
    }

    fn count_outcome(&mut self, outcome: FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Published => self.published += 1,
            FrameOutcome::Discarded => self.discarded += 1,
            FrameOutcome::Blocked => self.blocked += 1,
        }
    }

    fn count_output(&mut self, output: &PipelineOutput) {
        match output {
            PipelineOutput::NoFace => self.no_face += 1,
            PipelineOutput::Face(face) => {
                *self.emotions.entry(face.emotion.emotion).or_insert(0) += 1;
            }
        }
    }
}

/// One-line description of a published frame
#[must_use]
pub fn describe_output(frame_number: u64, output: &PipelineOutput) -> String {
    let mut line = format!("frame {frame_number:>5}: ");
    match output {
        PipelineOutput::NoFace => line.push_str("no face"),
        PipelineOutput::Face(face) => {
            let _ = write!(
                line,
                "{} {} {}% | {} {}",
                face.emotion.emotion.emoji(),
                face.emotion.emotion,
                face.emotion.confidence_percent(),
                face.eye_state.emoji(),
                face.eye_state
            );
            if let Some(overlay) = &face.overlay {
                let r = overlay.region;
                let _ = write!(
                    line,
                    " | box [{:.0}, {:.0}, {:.0}, {:.0}] {} landmarks",
                    r.left,
                    r.top,
                    r.right,
                    r.bottom,
                    overlay.landmarks.len()
                );
            }
        }
    }
    line
}

pub struct ReplayApp {
    config: AppConfig,
    recording: Recording,
    capture: RgbImage,
    pipeline: EmotionPipeline<ResilientProvider<RecordingProvider>>,
    playhead: Playhead,
    outputs: LatestOutput,
}

impl ReplayApp {
    /// Load the recording and build the pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the recording or
    /// its capture image cannot be loaded
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing emotion replay");
        config.settings.validate()?;

        let settings = &config.settings;
        let recording = Recording::from_file(&config.recording_path)?;
        let capture = recording.load_capture_image()?;

        info!(
            "Landmarker options: model={}, max_faces={}, detection={}, presence={}, tracking={}",
            settings.provider.model_path.display(),
            settings.provider.max_faces,
            settings.provider.min_face_detection_confidence,
            settings.provider.min_face_presence_confidence,
            settings.provider.min_tracking_confidence
        );

        let recorded = RecordingProvider::new(&recording)
            .with_padding(settings.detection.bbox_padding)
            .with_min_presence(settings.provider.min_face_presence_confidence);
        let playhead = recorded.playhead();

        let provider = if config.demo_mode {
            info!("Demo mode: recorded faces are ignored");
            ResilientProvider::degraded()
        } else {
            ResilientProvider::new(Ok(recorded))
        };
        let provider = provider.with_max_faces(settings.provider.max_faces);

        let outputs = LatestOutput::new();
        let pipeline = EmotionPipeline::new(provider)
            .with_sampler(settings.create_sampler()?)
            .with_emotion_scorer(settings.create_emotion_scorer())
            .with_eye_state_scorer(settings.create_eye_state_scorer())
            .with_mapper(settings.create_mapper())
            .with_sink(outputs.clone());

        Ok(Self {
            config,
            recording,
            capture,
            pipeline,
            playhead,
            outputs,
        })
    }

    /// Replay every recorded frame once
    ///
    /// # Errors
    ///
    /// Returns an error if a captured frame cannot be built
    pub fn run(&mut self) -> Result<ReplaySummary> {
        info!("Replaying {} frames", self.recording.len());

        let start_time = Instant::now();
        let mut summary = ReplaySummary::default();
        let mut seen_version = self.outputs.version();

        for index in 0..self.recording.len() {
            self.playhead.seek(index);
            let frame = self.recording.capture_frame(&self.capture)?;
            let outcome = self.pipeline.process_frame(frame);
            summary.count_outcome(outcome);

            if outcome != FrameOutcome::Published {
                continue;
            }
            if let Some((version, output)) = self.outputs.latest_since(seen_version) {
                seen_version = version;
                summary.count_output(&output);
                let line = describe_output(summary.frames, &output);
                debug!("{line}");
                if self.config.print_frames {
                    println!("{line}");
                }
            }
        }

        summary.detections = self.pipeline.detection_count();
        summary.elapsed = start_time.elapsed();

        #[allow(clippy::cast_precision_loss)] // Frame counts stay far below 2^52
        let fps = summary.frames as f64 / summary.elapsed.as_secs_f64().max(f64::EPSILON);
        info!(
            "Replay finished: {} frames ({} processed, {} faces) in {:.1?} ({fps:.0} fps)",
            summary.frames, summary.published, summary.detections, summary.elapsed
        );
        for emotion in Emotion::SCORED.into_iter().chain([Emotion::Neutral]) {
            info!("  {emotion}: {}", summary.emotion_count(emotion));
        }

        Ok(summary)
    }

    /// Status and eye state of the pipeline
    #[must_use]
    pub fn pipeline(&self) -> &EmotionPipeline<ResilientProvider<RecordingProvider>> {
        &self.pipeline
    }

    /// End the session and release the provider
    pub fn shutdown(self) {
        info!("Application shutting down");
        self.pipeline.shutdown();
    }
}
