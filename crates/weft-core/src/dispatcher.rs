//! Serialised execution for everything that mutates a render tree.
//!
//! A [`Dispatcher`] owns one logical thread of execution. Jobs posted to it
//! run one at a time, in the order they were posted, regardless of which
//! physical thread posted them. [`DispatcherHandle`] layers the blocking
//! [`invoke`](DispatcherHandle::invoke) and deferred
//! [`invoke_async`](DispatcherHandle::invoke_async) entry points on top of
//! any dispatcher implementation.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::{pin, Pin};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, ThreadId};

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use futures_task::{waker_ref, ArcWake};
use parking_lot::Mutex;

use crate::error::DispatchError;

/// Unit of work executed on the dispatcher's logical thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Serialisation primitive for a render tree.
///
/// Implementations must run posted jobs one at a time in post order and must
/// be safe to post to from any thread.
pub trait Dispatcher: Send + Sync + 'static {
    /// Returns true when the calling code is already running on this
    /// dispatcher's logical thread.
    fn check_access(&self) -> bool;

    /// Queue a job behind every job posted before it.
    ///
    /// A job that can no longer be executed (the dispatcher shut down) is
    /// dropped without running.
    fn post(&self, job: Job);
}

/// Cheaply cloneable handle over a shared dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    inner: Arc<dyn Dispatcher>,
}

impl DispatcherHandle {
    pub fn new(dispatcher: impl Dispatcher) -> Self {
        Self {
            inner: Arc::new(dispatcher),
        }
    }

    pub fn from_arc(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { inner: dispatcher }
    }

    /// Handle over a fresh [`InlineDispatcher`].
    pub fn inline() -> Self {
        Self::new(InlineDispatcher::new())
    }

    pub fn check_access(&self) -> bool {
        self.inner.check_access()
    }

    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        self.inner.post(Box::new(job));
    }

    /// Run `action` on the dispatcher and block until it has finished.
    ///
    /// Runs inline when the caller already holds the dispatcher turn. A panic
    /// raised by `action` is resumed on the calling thread with its original
    /// payload.
    pub fn invoke<R, F>(&self, action: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.check_access() {
            return Ok(action());
        }
        let (tx, rx) = oneshot::channel::<thread::Result<R>>();
        self.inner.post(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(action));
            let _ = tx.send(result);
        }));
        log::trace!("invoke: waiting for dispatcher turn");
        block_on(DispatchFuture { receiver: rx })
    }

    /// Schedule `action` on the dispatcher without blocking the caller.
    ///
    /// The future returned by `action` is only ever polled on the
    /// dispatcher's logical thread; each wake-up posts a fresh poll job.
    pub fn invoke_async<T, F, Fut>(&self, action: F) -> DispatchFuture<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<thread::Result<T>>();
        let work = async move {
            let result = AssertUnwindSafe(async move { action().await })
                .catch_unwind()
                .await;
            let _ = tx.send(result);
        };
        let task = Arc::new(DispatchTask {
            future: Mutex::new(Some(work.boxed())),
            dispatcher: self.clone(),
        });
        task.schedule();
        DispatchFuture { receiver: rx }
    }
}

impl fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherHandle").finish_non_exhaustive()
    }
}

/// Completion of work scheduled through [`DispatcherHandle::invoke_async`].
///
/// Resolves to the work's output, or [`DispatchError::Closed`] when the
/// dispatcher dropped the work. A panic inside the work is resumed when this
/// future is polled.
#[must_use = "dispatched work keeps running, but its result is lost unless awaited"]
pub struct DispatchFuture<T> {
    receiver: oneshot::Receiver<thread::Result<T>>,
}

impl<T> DispatchFuture<T> {
    /// Park the current thread until the work has completed.
    pub fn wait(self) -> Result<T, DispatchError> {
        block_on(self)
    }
}

impl<T> Future for DispatchFuture<T> {
    type Output = Result<T, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Ok(value))) => Poll::Ready(Ok(value)),
            Poll::Ready(Ok(Err(payload))) => panic::resume_unwind(payload),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(DispatchError::Closed)),
        }
    }
}

impl<T> fmt::Debug for DispatchFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFuture").finish_non_exhaustive()
    }
}

struct DispatchTask {
    future: Mutex<Option<BoxFuture<'static, ()>>>,
    dispatcher: DispatcherHandle,
}

impl DispatchTask {
    fn schedule(self: &Arc<Self>) {
        let task = Arc::clone(self);
        self.dispatcher.post(move || task.poll());
    }

    fn poll(self: &Arc<Self>) {
        // The slot is empty once the work finished; late wake-ups land here.
        let Some(mut future) = self.future.lock().take() else {
            return;
        };
        let waker = waker_ref(self);
        let mut cx = Context::from_waker(&waker);
        if future.as_mut().poll(&mut cx).is_pending() {
            *self.future.lock() = Some(future);
        }
    }
}

impl ArcWake for DispatchTask {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        log::trace!("invoke_async: task woken, re-posting poll");
        arc_self.schedule();
    }
}

struct ThreadWaker(thread::Thread);

impl ArcWake for ThreadWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.unpark();
    }
}

/// Drive `future` to completion on the current thread, parking between polls.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Arc::new(ThreadWaker(thread::current()));
    let waker = waker_ref(&waker);
    let mut cx = Context::from_waker(&waker);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        thread::park();
    }
}

pub(crate) fn panic_message(payload: &PanicPayload) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Run a raw posted job, isolating a panic so the queue keeps draining.
pub fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        log::error!("dispatched job panicked: {}", panic_message(&payload));
    }
}

/// Dispatcher without a thread of its own.
///
/// Whichever thread posts into an idle queue becomes the logical thread and
/// drains the queue, including jobs other threads post meanwhile. Jobs posted
/// from inside a running job are queued behind it.
#[derive(Default)]
pub struct InlineDispatcher {
    state: Mutex<InlineState>,
}

#[derive(Default)]
struct InlineState {
    queue: VecDeque<Job>,
    owner: Option<ThreadId>,
}

impl InlineDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_jobs(&self) -> usize {
        self.state.lock().queue.len()
    }
}

impl Dispatcher for InlineDispatcher {
    fn check_access(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    fn post(&self, job: Job) {
        {
            let mut state = self.state.lock();
            state.queue.push_back(job);
            if state.owner.is_some() {
                return;
            }
            state.owner = Some(thread::current().id());
        }
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(job) => job,
                    None => {
                        state.owner = None;
                        break;
                    }
                }
            };
            run_job(next);
        }
    }
}

impl fmt::Debug for InlineDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InlineDispatcher")
            .field("pending", &state.queue.len())
            .field("running", &state.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
