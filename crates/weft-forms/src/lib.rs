#![doc = r"Field identity, dirty tracking and change notification for Weft forms."]

mod binding;
mod channel;
mod edit_context;
mod error;
mod field;
mod properties;

pub use binding::render_on_change;
pub use channel::ListenerId;
pub use edit_context::EditContext;
pub use error::EditContextError;
pub use field::{FieldIdentifier, ModelRef};
pub use properties::EditContextProperties;
