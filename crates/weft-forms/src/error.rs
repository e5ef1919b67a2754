use thiserror::Error;
use weft_core::BoxError;

#[derive(Debug, Error)]
pub enum EditContextError {
    #[error("an edit context requires a model")]
    MissingModel,
    #[error("field name must not be empty")]
    EmptyFieldName,
    #[error("field `{field_name}` belongs to a different model than this edit context")]
    ForeignField { field_name: String },
    /// The first failure raised by a listener during a notification fan-out.
    #[error(transparent)]
    Listener(BoxError),
}

impl EditContextError {
    /// True for failures caused by a bad argument rather than by a listener.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            EditContextError::MissingModel
                | EditContextError::EmptyFieldName
                | EditContextError::ForeignField { .. }
        )
    }

    pub fn into_listener_error(self) -> Option<BoxError> {
        match self {
            EditContextError::Listener(err) => Some(err),
            _ => None,
        }
    }
}
