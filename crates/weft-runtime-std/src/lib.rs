//! Standard dispatcher backed by a dedicated OS thread.
//!
//! [`StdDispatcher`] owns one worker thread that executes posted jobs in the
//! order they arrive. Wrap it in a [`weft_core::DispatcherHandle`] and hand
//! that to a [`weft_core::Renderer`] to run every render pass and event
//! handler on the worker.

use std::fmt;
use std::io;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use weft_core::dispatcher::run_job;
use weft_core::{Dispatcher, Job};

const DEFAULT_THREAD_NAME: &str = "weft-dispatcher";

enum Message {
    Run(Job),
    Shutdown,
}

/// Dispatcher whose logical thread is a named worker thread.
///
/// Dropping the dispatcher lets the worker finish the jobs already queued,
/// then joins it. Jobs posted after shutdown are dropped, which surfaces as
/// [`weft_core::DispatchError::Closed`] to `invoke` callers.
pub struct StdDispatcher {
    sender: Sender<Message>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    thread_name: String,
}

impl StdDispatcher {
    pub fn new() -> io::Result<Self> {
        Self::with_thread_name(DEFAULT_THREAD_NAME)
    }

    pub fn with_thread_name(name: impl Into<String>) -> io::Result<Self> {
        let thread_name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_loop(receiver))?;
        log::debug!("started dispatcher thread `{thread_name}`");
        Ok(Self {
            sender,
            worker_id: worker.thread().id(),
            worker: Some(worker),
            thread_name,
        })
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

fn worker_loop(receiver: Receiver<Message>) {
    for message in receiver.iter() {
        match message {
            Message::Run(job) => run_job(job),
            Message::Shutdown => break,
        }
    }
    log::debug!(
        "dispatcher thread `{}` exiting",
        thread::current().name().unwrap_or("<unnamed>")
    );
}

impl Dispatcher for StdDispatcher {
    fn check_access(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    fn post(&self, job: Job) {
        if self.sender.send(Message::Run(job)).is_err() {
            log::warn!(
                "dispatcher `{}` is shut down; dropping posted job",
                self.thread_name
            );
        }
    }
}

impl Drop for StdDispatcher {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropped from one of its own jobs: the worker exits on its own once
        // it reaches the shutdown message.
        if self.check_access() {
            log::debug!("dispatcher `{}` dropped on its own thread", self.thread_name);
            return;
        }
        if worker.join().is_err() {
            log::error!("dispatcher thread `{}` panicked", self.thread_name);
        }
    }
}

impl fmt::Debug for StdDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdDispatcher")
            .field("thread_name", &self.thread_name)
            .field("queued", &self.sender.len())
            .finish()
    }
}
