use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Arbitrary state that collaborators such as validators attach to an edit
/// context, keyed by name.
#[derive(Default)]
pub struct EditContextProperties {
    values: Mutex<IndexMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl EditContextProperties {
    /// Stores `value` under `key`, returning whatever was stored there before.
    pub fn set<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values.lock().insert(key.into(), Arc::new(value))
    }

    /// Returns the value under `key` if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.values.lock().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values.lock().shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl fmt::Debug for EditContextProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.lock();
        f.debug_set().entries(values.keys()).finish()
    }
}
