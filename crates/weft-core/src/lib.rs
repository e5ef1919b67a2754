#![doc = r"Render dispatch, render batches and component lifecycle for Weft."]

pub mod batch;
pub mod collections;
pub mod component;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod renderer;

pub use batch::{
    CapturedBatch, CapturedDiff, RenderBatch, RenderBatchBuilder, RenderTreeDiff, RenderTreeEdit,
};
pub use component::{
    Component, EventArgs, HandlerFuture, HandlerOutcome, ParameterView, PointerEventKind,
};
pub use diff::{DiffEngine, PositionalDiffEngine};
pub use dispatcher::{block_on, DispatchFuture, Dispatcher, DispatcherHandle, InlineDispatcher, Job};
pub use error::{BoxError, DispatchError, RenderError};
pub use frame::{RenderFrame, RenderTreeBuilder};
pub use renderer::{ComponentStatus, RenderHandle, RenderSurface, Renderer};

/// Identity of a component within one renderer.
pub type ComponentId = u64;

/// Identity of an event handler within one component's output.
pub type EventHandlerId = u64;
