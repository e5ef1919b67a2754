use weft_core::RenderHandle;

use crate::channel::ListenerId;
use crate::edit_context::EditContext;

/// Re-renders the component behind `handle` whenever a field of `context`
/// changes.
///
/// The request is queued on the renderer's dispatcher, so a change raised
/// from inside an event handler lands in that handler's render batch.
/// Unsubscribe with the returned id when the component goes away.
pub fn render_on_change(context: &EditContext, handle: RenderHandle) -> ListenerId {
    context.subscribe_field_changed(move |_, field| {
        if !handle.request_render() {
            log::debug!(
                "field `{field}` changed after component {} was dropped",
                handle.component_id()
            );
        }
        Ok(())
    })
}
