//! Hand-off of pipeline results to the presentation layer.
//!
//! Consumers only ever care about the newest result, so there is no queue:
//! [`LatestOutput`] keeps the last published value plus a version counter that
//! readers can poll to notice updates.

use crate::pipeline::PipelineOutput;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receiver of per-frame pipeline output
pub trait OutputSink: Send {
    /// Take ownership of one output
    fn publish(&self, output: PipelineOutput);
}

impl<F> OutputSink for F
where
    F: Fn(PipelineOutput) + Send,
{
    fn publish(&self, output: PipelineOutput) {
        self(output);
    }
}

/// Sink that drops every output
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl OutputSink for DiscardSink {
    fn publish(&self, _output: PipelineOutput) {}
}

#[derive(Debug, Default)]
struct Latest {
    output: Option<PipelineOutput>,
    version: u64,
}

/// Shared "latest value" cell; clones observe the same value
#[derive(Debug, Clone, Default)]
pub struct LatestOutput {
    inner: Arc<Mutex<Latest>>,
}

impl LatestOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the newest output, if any
    #[must_use]
    pub fn latest(&self) -> Option<PipelineOutput> {
        self.lock().output.clone()
    }

    /// Number of outputs published so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Newest output if it is newer than `seen_version`, with its version
    #[must_use]
    pub fn latest_since(&self, seen_version: u64) -> Option<(u64, PipelineOutput)> {
        let latest = self.lock();
        if latest.version > seen_version {
            latest.output.clone().map(|output| (latest.version, output))
        } else {
            None
        }
    }

    /// Remove the current value without touching the version
    pub fn clear(&self) {
        self.lock().output = None;
    }

    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSink for LatestOutput {
    fn publish(&self, output: PipelineOutput) {
        let mut latest = self.lock();
        latest.output = Some(output);
        latest.version = latest.version.wrapping_add(1);
    }
}
