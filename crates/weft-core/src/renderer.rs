//! Component registry and render-pass orchestration.
//!
//! Every entry point funnels through the renderer's [`DispatcherHandle`], so
//! the registry is only touched while holding the dispatcher turn. The mutex
//! around it is therefore never contended; failing to acquire it means a
//! component called back into the renderer from inside a pass.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::batch::{RenderBatch, RenderBatchBuilder};
use crate::collections::map::{HashMap, HashSet};
use crate::component::{Component, EventArgs, HandlerOutcome, ParameterView};
use crate::diff::{DiffEngine, PositionalDiffEngine};
use crate::dispatcher::{block_on, DispatcherHandle};
use crate::error::{BoxError, RenderError};
use crate::frame::{RenderFrame, RenderTreeBuilder};
use crate::{ComponentId, EventHandlerId};

/// Display backend fed with one batch per completed render pass.
///
/// The batch borrows storage the renderer reuses for the next pass; use
/// [`RenderBatch::capture`] to keep its contents.
pub trait RenderSurface: Send + 'static {
    fn update_display(&mut self, batch: &RenderBatch<'_>) -> Result<(), BoxError>;
}

impl<F> RenderSurface for F
where
    F: FnMut(&RenderBatch<'_>) -> Result<(), BoxError> + Send + 'static,
{
    fn update_display(&mut self, batch: &RenderBatch<'_>) -> Result<(), BoxError> {
        self(batch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentStatus {
    Unregistered,
    Registered,
    Rendered,
    Disposed,
}

struct ComponentEntry {
    component: Box<dyn Component>,
    frames: Vec<RenderFrame>,
    rendered: bool,
}

impl ComponentEntry {
    fn handles(&self, handler_id: EventHandlerId) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.event_handler_id() == Some(handler_id))
    }
}

struct RendererState {
    components: HashMap<ComponentId, ComponentEntry>,
    disposed: HashSet<ComponentId>,
    next_component_id: ComponentId,
    pending_disposals: Vec<ComponentId>,
    batch: RenderBatchBuilder,
    last_sequence: u64,
    diff_engine: Box<dyn DiffEngine>,
    surface: Box<dyn RenderSurface>,
}

impl RendererState {
    fn live_entry_mut(&mut self, id: ComponentId) -> Result<&mut ComponentEntry, RenderError> {
        if self.disposed.contains(&id) {
            return Err(RenderError::DisposedComponent(id));
        }
        self.components
            .get_mut(&id)
            .ok_or(RenderError::UnknownComponent(id))
    }

    fn status(&self, id: ComponentId) -> ComponentStatus {
        if self.disposed.contains(&id) {
            return ComponentStatus::Disposed;
        }
        match self.components.get(&id) {
            Some(entry) if entry.rendered => ComponentStatus::Rendered,
            Some(_) => ComponentStatus::Registered,
            None => ComponentStatus::Unregistered,
        }
    }

    /// Renders every queued component into one batch and hands it to the
    /// surface. Frames and disposals are committed only once the surface
    /// accepted the batch.
    ///
    /// A component renders at most once per pass. Requests it raises after
    /// its render are collected in `deferred` for a follow-up pass.
    fn process_render_queue(
        &mut self,
        queue: &RenderQueue,
        deferred: &mut Vec<ComponentId>,
    ) -> Result<(), RenderError> {
        let sequence = self.last_sequence + 1;
        self.batch.reset(sequence);
        let mut staged: HashMap<ComponentId, Vec<RenderFrame>> = HashMap::default();

        while let Some(id) = queue.pop() {
            if staged.contains_key(&id) {
                if !deferred.contains(&id) {
                    deferred.push(id);
                }
                continue;
            }
            let Some(entry) = self.components.get_mut(&id) else {
                log::debug!("dropping render request for component {id}: not registered");
                continue;
            };
            let mut builder = RenderTreeBuilder::new();
            entry.component.render(&mut builder);
            let frames = builder.finish();
            self.batch.begin_diff(id);
            self.diff_engine
                .diff(id, &entry.frames, &frames, &mut self.batch);
            self.batch.end_diff();
            staged.insert(id, frames);
        }
        for &id in &self.pending_disposals {
            self.batch.add_disposed_component(id);
        }
        if self.batch.is_empty() {
            return Ok(());
        }

        let batch = self.batch.batch();
        log::debug!(
            "render batch {sequence}: {} diff(s), {} reference frame(s), {} disposed",
            batch.diffs().len(),
            batch.reference_frames().len(),
            batch.disposed_component_ids().len()
        );
        if let Err(err) = self.surface.update_display(&batch) {
            log::warn!("surface rejected render batch {sequence}: {err}");
            return Err(RenderError::Handler(err));
        }
        self.last_sequence = sequence;
        self.pending_disposals.clear();
        for (id, frames) in staged {
            if let Some(entry) = self.components.get_mut(&id) {
                entry.frames = frames;
                entry.rendered = true;
            }
        }
        Ok(())
    }
}

/// FIFO of components waiting for a render pass. A component appears at most
/// once while it waits.
#[derive(Default)]
struct RenderQueue {
    pending: Mutex<VecDeque<ComponentId>>,
}

impl RenderQueue {
    /// Returns true when the queue was empty before this push.
    fn push(&self, id: ComponentId) -> bool {
        let mut pending = self.pending.lock();
        if pending.contains(&id) {
            return false;
        }
        let was_empty = pending.is_empty();
        pending.push_back(id);
        was_empty
    }

    fn pop(&self) -> Option<ComponentId> {
        self.pending.lock().pop_front()
    }

    fn clear(&self) {
        self.pending.lock().clear();
    }
}

struct Shared {
    dispatcher: DispatcherHandle,
    state: Mutex<RendererState>,
    queue: RenderQueue,
}

impl Shared {
    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut RendererState) -> Result<R, RenderError>,
    ) -> Result<R, RenderError> {
        let mut state = self.state.try_lock().ok_or(RenderError::Reentrant)?;
        f(&mut state)
    }

    /// Queues `id` and posts a pass when the queue was idle.
    fn schedule_render(self: &Arc<Self>, id: ComponentId) {
        if self.queue.push(id) {
            let weak = Arc::downgrade(self);
            self.dispatcher.post(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = shared.render_pending() {
                    log::error!("requested render pass failed: {err}");
                }
            });
        }
    }

    fn render_pass(self: &Arc<Self>, state: &mut RendererState) -> Result<(), RenderError> {
        let mut deferred = Vec::new();
        state.process_render_queue(&self.queue, &mut deferred)?;
        for id in deferred {
            log::trace!("component {id} asked to render again; deferring to the next pass");
            self.schedule_render(id);
        }
        Ok(())
    }

    fn render_pending(self: &Arc<Self>) -> Result<(), RenderError> {
        self.with_state(|state| self.render_pass(state))
    }
}

/// A component's capability to ask for its own re-render.
#[derive(Clone)]
pub struct RenderHandle {
    component_id: ComponentId,
    shared: Weak<Shared>,
}

impl RenderHandle {
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Queue a re-render of the owning component on the dispatcher.
    ///
    /// Requests raised during an event dispatch, or by components not yet
    /// rendered in the current pass, join that pass's batch. A component that
    /// asks again after rendering is picked up by a follow-up pass. Returns
    /// false once the renderer is gone.
    pub fn request_render(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        shared.schedule_render(self.component_id);
        true
    }
}

impl fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHandle")
            .field("component_id", &self.component_id)
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Orchestrates component registration, render passes and event dispatch.
///
/// Cloning yields another handle to the same renderer.
#[derive(Clone)]
pub struct Renderer {
    shared: Arc<Shared>,
}

impl Renderer {
    pub fn new(dispatcher: DispatcherHandle, surface: impl RenderSurface) -> Self {
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                state: Mutex::new(RendererState {
                    components: HashMap::default(),
                    disposed: HashSet::default(),
                    next_component_id: 1,
                    pending_disposals: Vec::new(),
                    batch: RenderBatchBuilder::new(),
                    last_sequence: 0,
                    diff_engine: Box::new(PositionalDiffEngine),
                    surface: Box::new(surface),
                }),
                queue: RenderQueue::default(),
            }),
        }
    }

    /// Replaces the diff engine. Intended for use right after construction.
    pub fn with_diff_engine(self, engine: impl DiffEngine) -> Self {
        self.shared.state.lock().diff_engine = Box::new(engine);
        self
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.shared.dispatcher
    }

    fn run<R, F>(&self, f: F) -> Result<R, RenderError>
    where
        F: FnOnce(&Arc<Shared>, &mut RendererState) -> Result<R, RenderError> + Send + 'static,
        R: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.shared
            .dispatcher
            .invoke(move || shared.with_state(|state| f(&shared, state)))?
    }

    /// Registers `component` as a root and returns its id. Nothing is rendered.
    ///
    /// Every call yields a fresh id, even for the same component value.
    pub fn assign_root_component_id(
        &self,
        component: impl Component,
    ) -> Result<ComponentId, RenderError> {
        self.run(move |shared, state| {
            let id = state.next_component_id;
            state.next_component_id += 1;
            let mut component: Box<dyn Component> = Box::new(component);
            component.attach(RenderHandle {
                component_id: id,
                shared: Arc::downgrade(shared),
            });
            state.components.insert(
                id,
                ComponentEntry {
                    component,
                    frames: Vec::new(),
                    rendered: false,
                },
            );
            log::debug!("registered root component {id}");
            Ok(id)
        })
    }

    /// Renders the root component and blocks until the batch was delivered.
    pub fn render_root_component(&self, component_id: ComponentId) -> Result<(), RenderError> {
        self.run(move |shared, state| {
            state.live_entry_mut(component_id)?;
            shared.queue.push(component_id);
            shared.render_pass(state)
        })
    }

    /// Schedules a render of the root component, applying `parameters`
    /// first when given.
    pub fn render_root_component_async(
        &self,
        component_id: ComponentId,
        parameters: Option<ParameterView>,
    ) -> impl Future<Output = Result<(), RenderError>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let work = self.shared.dispatcher.invoke_async(move || async move {
            shared.with_state(|state| {
                let entry = state.live_entry_mut(component_id)?;
                if let Some(parameters) = &parameters {
                    entry
                        .component
                        .set_parameters(parameters)
                        .map_err(RenderError::Handler)?;
                }
                shared.queue.push(component_id);
                shared.render_pass(state)
            })
        });
        async move { work.await? }
    }

    /// Delivers a UI event to one of the component's event handlers and
    /// re-renders the component.
    ///
    /// Completes synchronously: an asynchronous handler is driven to
    /// completion on the dispatcher turn before this returns, so it must not
    /// wait on other work queued on the same dispatcher. A failing handler
    /// surfaces as [`RenderError::Handler`] carrying the handler's own error.
    pub fn dispatch_event(
        &self,
        component_id: ComponentId,
        handler_id: EventHandlerId,
        args: EventArgs,
    ) -> Result<(), RenderError> {
        let shared = Arc::clone(&self.shared);
        self.shared.dispatcher.invoke(move || {
            log::trace!("dispatching event to component {component_id} handler {handler_id}");
            let outcome = shared.with_state(|state| {
                let entry = state.live_entry_mut(component_id)?;
                if !entry.handles(handler_id) {
                    return Err(RenderError::UnknownEventHandler {
                        component_id,
                        handler_id,
                    });
                }
                entry
                    .component
                    .handle_event(handler_id, &args)
                    .map_err(RenderError::Handler)
            })?;
            if let HandlerOutcome::Pending(future) = outcome {
                block_on(future).map_err(RenderError::Handler)?;
            }
            shared.queue.push(component_id);
            shared.render_pending()
        })?
    }

    /// Disposes a root component. Its id is reported in the next batch's
    /// disposed list, which is emitted right away. If the surface rejects
    /// that batch the id is carried into the next accepted one.
    pub fn remove_root_component(&self, component_id: ComponentId) -> Result<(), RenderError> {
        self.run(move |shared, state| {
            state.live_entry_mut(component_id)?;
            if let Some(mut entry) = state.components.remove(&component_id) {
                entry.component.dispose();
            }
            state.disposed.insert(component_id);
            state.pending_disposals.push(component_id);
            log::debug!("disposed component {component_id}");
            // Stays pending until a batch carrying it is accepted.
            shared.render_pass(state)
        })
    }

    pub fn component_status(&self, component_id: ComponentId) -> Result<ComponentStatus, RenderError> {
        self.run(move |_, state| Ok(state.status(component_id)))
    }

    /// Disposes every live component without emitting a batch.
    pub fn dispose(&self) -> Result<(), RenderError> {
        self.run(|shared, state| {
            shared.queue.clear();
            let ids: Vec<ComponentId> = state.components.keys().copied().collect();
            for id in ids {
                if let Some(mut entry) = state.components.remove(&id) {
                    entry.component.dispose();
                }
                state.disposed.insert(id);
            }
            state.pending_disposals.clear();
            log::debug!("renderer disposed");
            Ok(())
        })
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("dispatcher", &self.shared.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
