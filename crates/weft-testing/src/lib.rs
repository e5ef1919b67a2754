//! Testing utilities and harness for Weft

mod component;
mod recorder;
mod renderer;

pub use component::{ComponentProbe, TestComponent};
pub use recorder::BatchRecorder;
pub use renderer::TestRenderer;

pub mod prelude {
    pub use crate::{BatchRecorder, ComponentProbe, TestComponent, TestRenderer};
    pub use weft_core::{CapturedBatch, EventArgs, HandlerOutcome, RenderFrame, RenderTreeEdit};
}
