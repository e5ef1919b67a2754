use weft_core::{
    CapturedBatch, Component, ComponentId, DispatcherHandle, EventArgs, EventHandlerId,
    RenderError, Renderer,
};

use crate::recorder::BatchRecorder;

/// A [`Renderer`] wired to a [`BatchRecorder`], for tests that inspect the
/// batches a scenario produced.
///
/// Uses an inline dispatcher unless another one is supplied, so every call
/// completes on the test thread.
#[derive(Clone, Debug)]
pub struct TestRenderer {
    renderer: Renderer,
    recorder: BatchRecorder,
}

impl TestRenderer {
    pub fn new() -> Self {
        Self::with_dispatcher(DispatcherHandle::inline())
    }

    pub fn with_dispatcher(dispatcher: DispatcherHandle) -> Self {
        let recorder = BatchRecorder::new();
        Self {
            renderer: Renderer::new(dispatcher, recorder.clone()),
            recorder,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn recorder(&self) -> &BatchRecorder {
        &self.recorder
    }

    /// Registers `component` as a root and renders it once.
    pub fn mount(&self, component: impl Component) -> Result<ComponentId, RenderError> {
        let id = self.renderer.assign_root_component_id(component)?;
        self.renderer.render_root_component(id)?;
        Ok(id)
    }

    pub fn dispatch_event(
        &self,
        component_id: ComponentId,
        handler_id: EventHandlerId,
        args: EventArgs,
    ) -> Result<(), RenderError> {
        self.renderer.dispatch_event(component_id, handler_id, args)
    }

    pub fn batches(&self) -> Vec<CapturedBatch> {
        self.recorder.batches()
    }

    pub fn last_batch(&self) -> Option<CapturedBatch> {
        self.recorder.last()
    }
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new()
    }
}
