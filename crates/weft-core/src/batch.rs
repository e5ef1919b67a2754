//! Render batches and their owned snapshots.
//!
//! A [`RenderBatch`] borrows the renderer's [`RenderBatchBuilder`] buffers,
//! which are cleared and refilled by the next render pass. Anything that has
//! to outlive the `update_display` call takes a [`CapturedBatch`] through
//! [`RenderBatch::capture`].

use std::ops::Range;

use crate::frame::RenderFrame;
use crate::ComponentId;

/// One instruction for bringing a component's display in line with its new output.
///
/// Sibling indices address the component's flat frame list. Edits that
/// introduce content point at an entry of the batch's reference frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTreeEdit {
    PrependFrame {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    ReplaceFrame {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    UpdateText {
        sibling_index: usize,
        reference_frame_index: usize,
    },
    RemoveFrame {
        sibling_index: usize,
    },
}

impl RenderTreeEdit {
    pub fn sibling_index(&self) -> usize {
        match *self {
            RenderTreeEdit::PrependFrame { sibling_index, .. }
            | RenderTreeEdit::ReplaceFrame { sibling_index, .. }
            | RenderTreeEdit::UpdateText { sibling_index, .. }
            | RenderTreeEdit::RemoveFrame { sibling_index } => sibling_index,
        }
    }

    pub fn reference_frame_index(&self) -> Option<usize> {
        match *self {
            RenderTreeEdit::PrependFrame {
                reference_frame_index,
                ..
            }
            | RenderTreeEdit::ReplaceFrame {
                reference_frame_index,
                ..
            }
            | RenderTreeEdit::UpdateText {
                reference_frame_index,
                ..
            } => Some(reference_frame_index),
            RenderTreeEdit::RemoveFrame { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
struct DiffEntry {
    component_id: ComponentId,
    edits: Range<usize>,
}

/// Reusable storage a render pass writes its batch into.
#[derive(Debug, Default)]
pub struct RenderBatchBuilder {
    sequence: u64,
    diffs: Vec<DiffEntry>,
    edits: Vec<RenderTreeEdit>,
    reference_frames: Vec<RenderFrame>,
    disposed_component_ids: Vec<ComponentId>,
    open_diff: Option<(ComponentId, usize)>,
}

impl RenderBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the previous pass's content while keeping the allocations.
    pub(crate) fn reset(&mut self, sequence: u64) {
        self.sequence = sequence;
        self.diffs.clear();
        self.edits.clear();
        self.reference_frames.clear();
        self.disposed_component_ids.clear();
        self.open_diff = None;
    }

    pub(crate) fn begin_diff(&mut self, component_id: ComponentId) {
        debug_assert!(self.open_diff.is_none(), "diff already open");
        self.open_diff = Some((component_id, self.edits.len()));
    }

    pub(crate) fn end_diff(&mut self) {
        if let Some((component_id, start)) = self.open_diff.take() {
            self.diffs.push(DiffEntry {
                component_id,
                edits: start..self.edits.len(),
            });
        }
    }

    pub(crate) fn add_disposed_component(&mut self, component_id: ComponentId) {
        self.disposed_component_ids.push(component_id);
    }

    /// Appends a frame to the reference-frame array and returns its index.
    pub fn push_reference_frame(&mut self, frame: RenderFrame) -> usize {
        self.reference_frames.push(frame);
        self.reference_frames.len() - 1
    }

    /// Appends an edit to the diff currently being recorded.
    pub fn push_edit(&mut self, edit: RenderTreeEdit) {
        debug_assert!(self.open_diff.is_some(), "edit recorded outside a diff");
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty() && self.disposed_component_ids.is_empty()
    }

    pub fn batch(&self) -> RenderBatch<'_> {
        RenderBatch {
            sequence: self.sequence,
            diffs: &self.diffs,
            edits: &self.edits,
            reference_frames: &self.reference_frames,
            disposed_component_ids: &self.disposed_component_ids,
        }
    }
}

/// The edits recorded for one component within a batch.
#[derive(Clone, Copy, Debug)]
pub struct RenderTreeDiff<'a> {
    pub component_id: ComponentId,
    pub edits: &'a [RenderTreeEdit],
}

/// Output of one render pass, valid for the duration of `update_display`.
#[derive(Clone, Copy, Debug)]
pub struct RenderBatch<'a> {
    sequence: u64,
    diffs: &'a [DiffEntry],
    edits: &'a [RenderTreeEdit],
    reference_frames: &'a [RenderFrame],
    disposed_component_ids: &'a [ComponentId],
}

impl<'a> RenderBatch<'a> {
    /// Position of this batch in the renderer's pass sequence, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Per-component diffs in the order the components were rendered.
    pub fn diffs(&self) -> impl ExactSizeIterator<Item = RenderTreeDiff<'a>> + 'a {
        let edits = self.edits;
        self.diffs.iter().map(move |entry| RenderTreeDiff {
            component_id: entry.component_id,
            edits: &edits[entry.edits.clone()],
        })
    }

    pub fn reference_frames(&self) -> &'a [RenderFrame] {
        self.reference_frames
    }

    pub fn disposed_component_ids(&self) -> &'a [ComponentId] {
        self.disposed_component_ids
    }

    /// Copies everything the batch exposes into storage it does not share
    /// with the renderer.
    pub fn capture(&self) -> CapturedBatch {
        CapturedBatch {
            sequence: self.sequence,
            diffs: self
                .diffs()
                .map(|diff| CapturedDiff {
                    component_id: diff.component_id,
                    edits: diff.edits.to_vec(),
                })
                .collect(),
            reference_frames: self.reference_frames.to_vec(),
            disposed_component_ids: self.disposed_component_ids.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedDiff {
    pub component_id: ComponentId,
    pub edits: Vec<RenderTreeEdit>,
}

/// Independently owned copy of a [`RenderBatch`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedBatch {
    sequence: u64,
    diffs: Vec<CapturedDiff>,
    reference_frames: Vec<RenderFrame>,
    disposed_component_ids: Vec<ComponentId>,
}

impl CapturedBatch {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn diffs(&self) -> &[CapturedDiff] {
        &self.diffs
    }

    pub fn diff_for(&self, component_id: ComponentId) -> Option<&CapturedDiff> {
        self.diffs
            .iter()
            .find(|diff| diff.component_id == component_id)
    }

    pub fn reference_frames(&self) -> &[RenderFrame] {
        &self.reference_frames
    }

    pub fn disposed_component_ids(&self) -> &[ComponentId] {
        &self.disposed_component_ids
    }

    /// The frame an edit introduces, if it introduces one.
    pub fn reference_frame(&self, edit: &RenderTreeEdit) -> Option<&RenderFrame> {
        edit.reference_frame_index()
            .and_then(|index| self.reference_frames.get(index))
    }
}
