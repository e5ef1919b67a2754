use crate::batch::{RenderBatchBuilder, RenderTreeEdit};
use crate::frame::RenderFrame;
use crate::ComponentId;

/// Turns a component's previous and next output into edits.
///
/// The renderer opens a diff for `component_id` before calling and closes it
/// afterwards; implementations only push edits and reference frames.
pub trait DiffEngine: Send + 'static {
    fn diff(
        &mut self,
        component_id: ComponentId,
        old: &[RenderFrame],
        new: &[RenderFrame],
        out: &mut RenderBatchBuilder,
    );
}

/// Index-by-index comparison of two frame lists.
///
/// Does not detect moves or insertions in the middle; a shifted list shows
/// up as a run of replacements.
#[derive(Clone, Copy, Debug, Default)]
pub struct PositionalDiffEngine;

impl DiffEngine for PositionalDiffEngine {
    fn diff(
        &mut self,
        _component_id: ComponentId,
        old: &[RenderFrame],
        new: &[RenderFrame],
        out: &mut RenderBatchBuilder,
    ) {
        let shared = old.len().min(new.len());
        for (sibling_index, (before, after)) in old.iter().zip(new).enumerate() {
            if before == after {
                continue;
            }
            let reference_frame_index = out.push_reference_frame(after.clone());
            let edit = match (before, after) {
                (RenderFrame::Text(_), RenderFrame::Text(_)) => RenderTreeEdit::UpdateText {
                    sibling_index,
                    reference_frame_index,
                },
                _ => RenderTreeEdit::ReplaceFrame {
                    sibling_index,
                    reference_frame_index,
                },
            };
            out.push_edit(edit);
        }
        for (sibling_index, frame) in new.iter().enumerate().skip(shared) {
            let reference_frame_index = out.push_reference_frame(frame.clone());
            out.push_edit(RenderTreeEdit::PrependFrame {
                sibling_index,
                reference_frame_index,
            });
        }
        // Highest index first so earlier removals do not shift later ones.
        for sibling_index in (shared..old.len()).rev() {
            out.push_edit(RenderTreeEdit::RemoveFrame { sibling_index });
        }
    }
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
