use weft_core::{BoxError, RenderBatch, RenderFrame, RenderSurface, RenderTreeEdit};

/// Surface that prints every batch it receives to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSurface;

fn describe(frame: &RenderFrame) -> String {
    match frame {
        RenderFrame::Element { name, .. } => format!("<{name}>"),
        RenderFrame::Text(text) => format!("{text:?}"),
        RenderFrame::Attribute { name, value } => format!("{name}={value:?}"),
        RenderFrame::EventHandler { name, handler_id } => format!("{name}=#{handler_id}"),
        RenderFrame::Markup(markup) => markup.clone(),
    }
}

impl RenderSurface for ConsoleSurface {
    fn update_display(&mut self, batch: &RenderBatch<'_>) -> Result<(), BoxError> {
        println!("-- batch {} --", batch.sequence());
        let frames = batch.reference_frames();
        for diff in batch.diffs() {
            for edit in diff.edits {
                let frame = edit
                    .reference_frame_index()
                    .and_then(|index| frames.get(index))
                    .map(describe)
                    .unwrap_or_default();
                let op = match edit {
                    RenderTreeEdit::PrependFrame { .. } => "insert",
                    RenderTreeEdit::ReplaceFrame { .. } => "replace",
                    RenderTreeEdit::UpdateText { .. } => "text",
                    RenderTreeEdit::RemoveFrame { .. } => "remove",
                };
                println!(
                    "  component {} [{}] {op} {frame}",
                    diff.component_id,
                    edit.sibling_index()
                );
            }
        }
        for id in batch.disposed_component_ids() {
            println!("  component {id} disposed");
        }
        Ok(())
    }
}
