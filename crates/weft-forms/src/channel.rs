//! Multicast notification channels owned by an [`EditContext`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use weft_core::BoxError;

use crate::edit_context::EditContext;
use crate::error::EditContextError;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by a subscription; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type Listener<A> =
    Arc<dyn Fn(&EditContext, &A) -> Result<(), BoxError> + Send + Sync + 'static>;

pub(crate) struct EventChannel<A> {
    name: &'static str,
    listeners: Mutex<IndexMap<ListenerId, Listener<A>>>,
}

impl<A> EventChannel<A> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            listeners: Mutex::new(IndexMap::new()),
        }
    }

    pub(crate) fn subscribe(&self, listener: Listener<A>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.lock().insert(id, listener);
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.lock().shift_remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Runs every listener in subscription order, even when earlier ones
    /// fail. The first panic is resumed once all listeners ran; otherwise the
    /// first error is returned.
    ///
    /// Listeners subscribed or removed during the fan-out take effect on the
    /// next notification.
    pub(crate) fn fire(&self, context: &EditContext, args: &A) -> Result<(), EditContextError> {
        let listeners: Vec<Listener<A>> = self.listeners.lock().values().cloned().collect();
        if listeners.is_empty() {
            return Ok(());
        }
        log::trace!("{}: notifying {} listener(s)", self.name, listeners.len());

        let mut first_error = None;
        let mut first_panic = None;
        for listener in &listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(context, args))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log::warn!("{}: listener failed: {err}", self.name);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(payload) => {
                    log::error!("{}: listener panicked", self.name);
                    if first_panic.is_none() {
                        first_panic = Some(payload);
                    }
                }
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        match first_error {
            Some(err) => Err(EditContextError::Listener(err)),
            None => Ok(()),
        }
    }
}
