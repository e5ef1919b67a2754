use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use weft_core::{BoxError, CapturedBatch, RenderBatch, RenderSurface};

#[derive(Default)]
struct RecorderState {
    batches: Vec<CapturedBatch>,
    fail_next: Option<String>,
}

/// Render surface that keeps an owned copy of every batch it is handed.
///
/// Clones share the same history, so a test can keep one clone while the
/// renderer owns another.
#[derive(Clone, Default)]
pub struct BatchRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl BatchRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every batch recorded so far, oldest first.
    pub fn batches(&self) -> Vec<CapturedBatch> {
        self.state.lock().batches.clone()
    }

    pub fn last(&self) -> Option<CapturedBatch> {
        self.state.lock().batches.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().batches.is_empty()
    }

    /// Drains the recorded history.
    pub fn take(&self) -> Vec<CapturedBatch> {
        std::mem::take(&mut self.state.lock().batches)
    }

    /// Rejects the next batch with `message` instead of recording it.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }
}

impl RenderSurface for BatchRecorder {
    fn update_display(&mut self, batch: &RenderBatch<'_>) -> Result<(), BoxError> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(message.into());
        }
        state.batches.push(batch.capture());
        Ok(())
    }
}

impl fmt::Debug for BatchRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRecorder")
            .field("recorded", &self.len())
            .finish()
    }
}
