//! Background processing with a keep-only-latest frame slot.
//!
//! Capture produces frames faster than detection consumes them. Instead of a
//! queue, capture writes into a single [`LatestFrameSlot`]; an unconsumed frame
//! is replaced (and released) by the next one. A [`PipelineWorker`] thread
//! takes frames out of the slot one at a time, so at most one frame is ever
//! in flight on a pipeline.

use crate::frame::Frame;
use crate::pipeline::{EmotionPipeline, FrameOutcome, SessionHandle};
use crate::provider::LandmarkProvider;
use crate::{Error, Result};
use log::{debug, info};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<Frame>,
    closed: bool,
    replaced: u64,
}

/// Single-frame hand-off between capture and processing
#[derive(Debug, Clone, Default)]
pub struct LatestFrameSlot {
    inner: Arc<(Mutex<SlotState>, Condvar)>,
}

impl LatestFrameSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a frame, replacing any frame not yet taken
    ///
    /// Returns `false` (and drops the frame) once the slot is closed.
    pub fn offer(&self, frame: Frame) -> bool {
        let (lock, ready) = &*self.inner;
        let stale = {
            let mut state = lock_state(lock);
            if state.closed {
                return false;
            }
            let stale = state.frame.replace(frame);
            if stale.is_some() {
                state.replaced += 1;
            }
            stale
        };
        // Release the stale frame outside the lock
        drop(stale);
        ready.notify_one();
        true
    }

    /// Block until a frame is available; `None` once closed and empty
    pub fn take(&self) -> Option<Frame> {
        let (lock, ready) = &*self.inner;
        let mut state = lock_state(lock);
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = ready.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stop accepting frames and wake the consumer; a pending frame is released
    pub fn close(&self) {
        let (lock, ready) = &*self.inner;
        let pending = {
            let mut state = lock_state(lock);
            state.closed = true;
            state.frame.take()
        };
        drop(pending);
        ready.notify_all();
    }

    /// Stop accepting frames but keep the pending one for the consumer
    fn close_after_pending(&self) {
        let (lock, ready) = &*self.inner;
        lock_state(lock).closed = true;
        ready.notify_all();
    }

    /// Frames replaced before the consumer took them
    #[must_use]
    pub fn replaced_count(&self) -> u64 {
        lock_state(&self.inner.0).replaced
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock_state(&self.inner.0).closed
    }
}

fn lock_state(lock: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-outcome frame counts for a worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub skipped: u64,
    pub published: u64,
    pub discarded: u64,
    pub blocked: u64,
}

impl WorkerStats {
    fn count(&mut self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Skipped => self.skipped += 1,
            FrameOutcome::Published => self.published += 1,
            FrameOutcome::Discarded => self.discarded += 1,
            FrameOutcome::Blocked => self.blocked += 1,
        }
    }
}

/// Pipeline running on its own thread
pub struct PipelineWorker {
    slot: LatestFrameSlot,
    session: SessionHandle,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl PipelineWorker {
    /// Start processing frames offered to `slot`
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned
    pub fn spawn<P>(pipeline: EmotionPipeline<P>, slot: LatestFrameSlot) -> Result<Self>
    where
        P: LandmarkProvider + 'static,
    {
        let session = pipeline.session();
        let frames = slot.clone();

        let handle = thread::Builder::new()
            .name("emotion-pipeline".to_string())
            .spawn(move || run(pipeline, &frames))
            .map_err(|e| Error::PipelineError(format!("Failed to spawn worker thread: {e}")))?;

        info!("Pipeline worker started");
        Ok(Self {
            slot,
            session,
            handle: Some(handle),
        })
    }

    /// Slot the capture side writes into
    #[must_use]
    pub fn slot(&self) -> &LatestFrameSlot {
        &self.slot
    }

    /// Let the worker drain the pending frame, then stop
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked
    pub fn finish(mut self) -> Result<WorkerStats> {
        self.slot.close_after_pending();
        self.join()
    }

    /// Cancel the session and stop; an in-flight result is discarded
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked
    pub fn stop(mut self) -> Result<WorkerStats> {
        self.session.cancel();
        self.slot.close();
        self.join()
    }

    fn join(&mut self) -> Result<WorkerStats> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::PipelineError("Worker already joined".to_string()))?;
        let stats = handle
            .join()
            .map_err(|_| Error::PipelineError("Worker thread panicked".to_string()))?;
        info!("Pipeline worker stopped: {stats:?}");
        Ok(stats)
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.session.cancel();
            self.slot.close();
            let _ = self.join();
        }
    }
}

fn run<P: LandmarkProvider>(mut pipeline: EmotionPipeline<P>, slot: &LatestFrameSlot) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(frame) = slot.take() {
        stats.count(pipeline.process_frame(frame));
    }
    debug!("Frame slot closed, shutting pipeline down");
    pipeline.shutdown();
    stats
}
