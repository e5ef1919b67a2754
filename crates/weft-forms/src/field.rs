use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::EditContextError;

/// Shared reference to the data object an edit context is bound to.
pub type ModelRef = Arc<dyn Any + Send + Sync>;

fn model_address(model: &ModelRef) -> usize {
    Arc::as_ptr(model) as *const () as usize
}

/// Names one editable property of one model instance.
///
/// Two identifiers are equal when they point at the same model allocation and
/// carry the same field name. The model's contents never take part in the
/// comparison.
#[derive(Clone)]
pub struct FieldIdentifier {
    model: ModelRef,
    field_name: Arc<str>,
}

impl FieldIdentifier {
    pub fn new(model: &ModelRef, field_name: &str) -> Result<Self, EditContextError> {
        if field_name.is_empty() {
            return Err(EditContextError::EmptyFieldName);
        }
        Ok(Self {
            model: Arc::clone(model),
            field_name: Arc::from(field_name),
        })
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// True when this identifier belongs to `model`.
    pub fn is_for_model(&self, model: &ModelRef) -> bool {
        model_address(&self.model) == model_address(model)
    }
}

impl PartialEq for FieldIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.is_for_model(&other.model) && self.field_name == other.field_name
    }
}

impl Eq for FieldIdentifier {}

impl Hash for FieldIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        model_address(&self.model).hash(state);
        self.field_name.hash(state);
    }
}

impl fmt::Debug for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldIdentifier")
            .field("model", &format_args!("{:#x}", model_address(&self.model)))
            .field("field_name", &self.field_name)
            .finish()
    }
}

impl fmt::Display for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field_name)
    }
}

/// Per-field edit metadata, owned by the edit context that created it.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FieldState {
    pub(crate) is_modified: bool,
}
