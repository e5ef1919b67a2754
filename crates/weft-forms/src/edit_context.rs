//! Field-level dirty tracking for one model instance.
//!
//! An [`EditContext`] records which fields of its model have been touched and
//! broadcasts change notifications. Notifications run synchronously on the
//! calling thread; the field-state table is never locked while listeners run,
//! so listeners may query or mutate the context they were notified by.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use weft_core::collections::map::HashMap;
use weft_core::BoxError;

use crate::channel::{EventChannel, Listener, ListenerId};
use crate::error::EditContextError;
use crate::field::{FieldIdentifier, FieldState, ModelRef};
use crate::properties::EditContextProperties;

struct Inner {
    model: ModelRef,
    field_states: Mutex<HashMap<FieldIdentifier, FieldState>>,
    field_changed: EventChannel<FieldIdentifier>,
    validation_requested: EventChannel<()>,
    validation_state_changed: EventChannel<()>,
    properties: EditContextProperties,
}

/// Edit-tracking session for one model.
///
/// Cloning yields another handle to the same session; equality is handle
/// identity.
#[derive(Clone)]
pub struct EditContext {
    inner: Arc<Inner>,
}

impl EditContext {
    pub fn new<M: Any + Send + Sync>(model: Arc<M>) -> Self {
        Self::from_model_ref(model)
    }

    /// Fails with [`EditContextError::MissingModel`] when no model is given.
    pub fn try_new(model: Option<ModelRef>) -> Result<Self, EditContextError> {
        model
            .map(Self::from_model_ref)
            .ok_or(EditContextError::MissingModel)
    }

    fn from_model_ref(model: ModelRef) -> Self {
        Self {
            inner: Arc::new(Inner {
                model,
                field_states: Mutex::new(HashMap::default()),
                field_changed: EventChannel::new("field_changed"),
                validation_requested: EventChannel::new("validation_requested"),
                validation_state_changed: EventChannel::new("validation_state_changed"),
                properties: EditContextProperties::default(),
            }),
        }
    }

    pub fn model_ref(&self) -> &ModelRef {
        &self.inner.model
    }

    /// The bound model, if it has type `M`.
    pub fn model<M: Any + Send + Sync>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.inner.model).downcast::<M>().ok()
    }

    /// Identifier binding `name` to this context's model. Records nothing.
    pub fn field(&self, name: &str) -> Result<FieldIdentifier, EditContextError> {
        FieldIdentifier::new(&self.inner.model, name)
    }

    /// Flags `field` as modified, then notifies every field-changed listener
    /// in subscription order.
    ///
    /// All listeners run even if some fail; see [`EditContextError::Listener`].
    pub fn notify_field_changed(&self, field: &FieldIdentifier) -> Result<(), EditContextError> {
        if !field.is_for_model(&self.inner.model) {
            return Err(EditContextError::ForeignField {
                field_name: field.field_name().to_owned(),
            });
        }
        self.inner
            .field_states
            .lock()
            .entry(field.clone())
            .or_default()
            .is_modified = true;
        log::debug!("field `{field}` changed");
        self.inner.field_changed.fire(self, field)
    }

    /// Clears the modified flag of `field`. Untracked fields are left alone.
    pub fn mark_field_as_unmodified(&self, field: &FieldIdentifier) {
        if let Some(state) = self.inner.field_states.lock().get_mut(field) {
            state.is_modified = false;
        }
    }

    pub fn mark_as_unmodified(&self) {
        for state in self.inner.field_states.lock().values_mut() {
            state.is_modified = false;
        }
    }

    pub fn is_modified(&self) -> bool {
        self.inner
            .field_states
            .lock()
            .values()
            .any(|state| state.is_modified)
    }

    pub fn is_field_modified(&self, field: &FieldIdentifier) -> bool {
        self.inner
            .field_states
            .lock()
            .get(field)
            .is_some_and(|state| state.is_modified)
    }

    pub fn modified_fields(&self) -> Vec<FieldIdentifier> {
        self.inner
            .field_states
            .lock()
            .iter()
            .filter(|(_, state)| state.is_modified)
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Number of fields that have state, modified or not.
    pub fn tracked_field_count(&self) -> usize {
        self.inner.field_states.lock().len()
    }

    pub fn subscribe_field_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&EditContext, &FieldIdentifier) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.field_changed.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe_field_changed(&self, id: ListenerId) -> bool {
        self.inner.field_changed.unsubscribe(id)
    }

    pub fn field_changed_listener_count(&self) -> usize {
        self.inner.field_changed.len()
    }

    pub fn subscribe_validation_requested<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&EditContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner
            .validation_requested
            .subscribe(without_args(listener))
    }

    pub fn unsubscribe_validation_requested(&self, id: ListenerId) -> bool {
        self.inner.validation_requested.unsubscribe(id)
    }

    pub fn subscribe_validation_state_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&EditContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner
            .validation_state_changed
            .subscribe(without_args(listener))
    }

    pub fn unsubscribe_validation_state_changed(&self, id: ListenerId) -> bool {
        self.inner.validation_state_changed.unsubscribe(id)
    }

    /// Asks validators to run against the current model.
    pub fn request_validation(&self) -> Result<(), EditContextError> {
        self.inner.validation_requested.fire(self, &())
    }

    /// Tells validation UI that the set of validation messages changed.
    pub fn notify_validation_state_changed(&self) -> Result<(), EditContextError> {
        self.inner.validation_state_changed.fire(self, &())
    }

    pub fn properties(&self) -> &EditContextProperties {
        &self.inner.properties
    }
}

fn without_args<F>(listener: F) -> Listener<()>
where
    F: Fn(&EditContext) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(move |context: &EditContext, _: &()| listener(context))
}

impl PartialEq for EditContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EditContext {}

impl fmt::Debug for EditContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states = self.inner.field_states.lock();
        f.debug_struct("EditContext")
            .field("tracked_fields", &states.len())
            .field(
                "modified_fields",
                &states.values().filter(|state| state.is_modified).count(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/edit_context_tests.rs"]
mod tests;
