use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use weft_core::{
    BoxError, Component, EventArgs, EventHandlerId, HandlerOutcome, ParameterView, RenderHandle,
    RenderTreeBuilder,
};

type RenderFn = Box<dyn FnMut(&mut RenderTreeBuilder) + Send>;
type EventFn = Box<dyn FnMut(&EventArgs) -> Result<HandlerOutcome, BoxError> + Send>;
type ParametersFn = Box<dyn FnMut(&ParameterView) -> Result<(), BoxError> + Send>;

/// Component assembled from closures.
///
/// The render closure decides which event handler ids appear in the output;
/// events are only routed to handlers the last render emitted.
pub struct TestComponent {
    render: RenderFn,
    handlers: IndexMap<EventHandlerId, EventFn>,
    on_parameters: Option<ParametersFn>,
    probe: ComponentProbe,
}

impl TestComponent {
    pub fn new(render: impl FnMut(&mut RenderTreeBuilder) + Send + 'static) -> Self {
        Self {
            render: Box::new(render),
            handlers: IndexMap::new(),
            on_parameters: None,
            probe: ComponentProbe::default(),
        }
    }

    pub fn on_event(
        mut self,
        handler_id: EventHandlerId,
        handler: impl FnMut(&EventArgs) -> Result<HandlerOutcome, BoxError> + Send + 'static,
    ) -> Self {
        self.handlers.insert(handler_id, Box::new(handler));
        self
    }

    pub fn on_parameters(
        mut self,
        apply: impl FnMut(&ParameterView) -> Result<(), BoxError> + Send + 'static,
    ) -> Self {
        self.on_parameters = Some(Box::new(apply));
        self
    }

    /// Observer that stays usable after the component moved into a renderer.
    pub fn probe(&self) -> ComponentProbe {
        self.probe.clone()
    }
}

impl Component for TestComponent {
    fn attach(&mut self, handle: RenderHandle) {
        *self.probe.handle.lock() = Some(handle);
    }

    fn set_parameters(&mut self, parameters: &ParameterView) -> Result<(), BoxError> {
        match self.on_parameters.as_mut() {
            Some(apply) => apply(parameters),
            None => Ok(()),
        }
    }

    fn render(&mut self, builder: &mut RenderTreeBuilder) {
        (self.render)(builder);
    }

    fn handle_event(
        &mut self,
        handler_id: EventHandlerId,
        args: &EventArgs,
    ) -> Result<HandlerOutcome, BoxError> {
        match self.handlers.get_mut(&handler_id) {
            Some(handler) => handler(args),
            None => Ok(HandlerOutcome::Completed),
        }
    }

    fn dispose(&mut self) {
        self.probe.disposed.store(true, Ordering::SeqCst);
    }
}

impl fmt::Debug for TestComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestComponent")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

/// Shared view of a [`TestComponent`]'s lifecycle.
#[derive(Clone, Default)]
pub struct ComponentProbe {
    handle: Arc<Mutex<Option<RenderHandle>>>,
    disposed: Arc<AtomicBool>,
}

impl ComponentProbe {
    /// The handle the renderer attached, once the component is registered.
    pub fn render_handle(&self) -> Option<RenderHandle> {
        self.handle.lock().clone()
    }

    pub fn component_id(&self) -> Option<weft_core::ComponentId> {
        self.handle.lock().as_ref().map(RenderHandle::component_id)
    }

    /// Requests a re-render; false when unregistered or the renderer is gone.
    pub fn request_render(&self) -> bool {
        self.render_handle()
            .is_some_and(|handle| handle.request_render())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ComponentProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentProbe")
            .field("component_id", &self.component_id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
