use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;

use crate::error::BoxError;
use crate::frame::RenderTreeBuilder;
use crate::renderer::RenderHandle;
use crate::EventHandlerId;

/// A stateful unit of UI owned by a [`Renderer`](crate::Renderer).
///
/// Every callback runs on the renderer's dispatcher turn.
pub trait Component: Send + 'static {
    /// Called once when the component is registered. The handle lets the
    /// component request its own re-render later.
    fn attach(&mut self, _handle: RenderHandle) {}

    /// Applies parameters supplied by the caller ahead of a render.
    fn set_parameters(&mut self, _parameters: &ParameterView) -> Result<(), BoxError> {
        Ok(())
    }

    fn render(&mut self, builder: &mut RenderTreeBuilder);

    /// Handles an event addressed to one of the handler ids this component
    /// emitted in its last render.
    fn handle_event(
        &mut self,
        _handler_id: EventHandlerId,
        _args: &EventArgs,
    ) -> Result<HandlerOutcome, BoxError> {
        Ok(HandlerOutcome::Completed)
    }

    fn dispose(&mut self) {}
}

pub type HandlerFuture = BoxFuture<'static, Result<(), BoxError>>;

/// Result of a successfully started event handler.
pub enum HandlerOutcome {
    Completed,
    /// The handler continues asynchronously. The renderer drives the future
    /// to completion before `dispatch_event` returns.
    Pending(HandlerFuture),
}

impl HandlerOutcome {
    pub fn pending(future: impl Future<Output = Result<(), BoxError>> + Send + 'static) -> Self {
        HandlerOutcome::Pending(future.boxed())
    }
}

impl fmt::Debug for HandlerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutcome::Completed => f.write_str("Completed"),
            HandlerOutcome::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEventKind {
    Down,
    Up,
    Move,
}

/// Payload of a UI-originated event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventArgs {
    Empty,
    Change { value: String },
    Pointer { kind: PointerEventKind, x: f32, y: f32 },
    Keyboard { key: String },
}

impl EventArgs {
    pub fn change(value: impl Into<String>) -> Self {
        EventArgs::Change {
            value: value.into(),
        }
    }
}

/// Named, typed values handed to [`Component::set_parameters`].
#[derive(Clone, Default)]
pub struct ParameterView {
    values: IndexMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ParameterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Returns the value stored under `name` if it has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values
            .get(name)
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for ParameterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
