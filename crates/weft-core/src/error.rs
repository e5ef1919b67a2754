use thiserror::Error;

use crate::{ComponentId, EventHandlerId};

/// Failure raised by code outside this crate: component callbacks, event
/// handlers and display surfaces.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatcher is shut down and no longer accepts work")]
    Closed,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no component with id {0} is registered")]
    UnknownComponent(ComponentId),
    #[error("component {0} has been disposed")]
    DisposedComponent(ComponentId),
    #[error("component {component_id} has no event handler {handler_id}")]
    UnknownEventHandler {
        component_id: ComponentId,
        handler_id: EventHandlerId,
    },
    #[error("renderer re-entered while a render pass holds the dispatcher turn")]
    Reentrant,
    /// The original failure of a component callback, event handler or surface.
    #[error(transparent)]
    Handler(BoxError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl RenderError {
    /// True for failures caused by addressing a component or handler that does
    /// not exist (anymore).
    pub fn is_unknown_target(&self) -> bool {
        matches!(
            self,
            RenderError::UnknownComponent(_)
                | RenderError::DisposedComponent(_)
                | RenderError::UnknownEventHandler { .. }
        )
    }

    /// Returns the handler's own error, if this is a handler failure.
    pub fn into_handler_error(self) -> Option<BoxError> {
        match self {
            RenderError::Handler(err) => Some(err),
            _ => None,
        }
    }

    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            RenderError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
