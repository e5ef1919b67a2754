use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

struct ClosedDispatcher;

impl Dispatcher for ClosedDispatcher {
    fn check_access(&self) -> bool {
        false
    }

    fn post(&self, job: Job) {
        drop(job);
    }
}

#[test]
fn inline_dispatcher_runs_nested_posts_after_the_current_job() {
    let handle = DispatcherHandle::inline();
    let log = Arc::new(Mutex::new(Vec::new()));

    let outer_log = Arc::clone(&log);
    let nested = handle.clone();
    handle.post(move || {
        outer_log.lock().push("outer:start");
        let inner_log = Arc::clone(&outer_log);
        nested.post(move || inner_log.lock().push("inner"));
        outer_log.lock().push("outer:end");
    });

    assert_eq!(*log.lock(), vec!["outer:start", "outer:end", "inner"]);
}

#[test]
fn invoke_returns_the_action_result() {
    let handle = DispatcherHandle::inline();
    assert_eq!(handle.invoke(|| 6 * 7), Ok(42));
}

#[test]
fn invoke_runs_inline_when_called_from_the_dispatcher() {
    let handle = DispatcherHandle::inline();
    let nested = handle.clone();
    let result = handle.invoke(move || {
        assert!(nested.check_access());
        nested.invoke(|| "nested").expect("nested invoke")
    });
    assert_eq!(result, Ok("nested"));
    assert!(!handle.check_access());
}

#[test]
fn invoke_resumes_the_original_panic_payload() {
    let handle = DispatcherHandle::inline();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = handle.invoke(|| -> u32 { panic!("handler exploded") });
    }));
    let payload = outcome.expect_err("invoke should resume the panic");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"handler exploded"));
    // The dispatcher remains usable afterwards.
    assert_eq!(handle.invoke(|| 1), Ok(1));
}

#[test]
fn invoke_async_polls_on_the_dispatcher_after_wake() {
    let handle = DispatcherHandle::inline();
    let (tx, rx) = oneshot::channel::<u32>();
    let probe = handle.clone();
    let polled_on_dispatcher = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&polled_on_dispatcher);

    let future = handle.invoke_async(move || async move {
        let value = rx.await.unwrap_or(0);
        flag.store(probe.check_access(), Ordering::SeqCst);
        value * 2
    });

    thread::spawn(move || {
        let _ = tx.send(21);
    })
    .join()
    .expect("sender thread");

    assert_eq!(future.wait(), Ok(42));
    assert!(polled_on_dispatcher.load(Ordering::SeqCst));
}

#[test]
fn dropped_work_reports_a_closed_dispatcher() {
    let handle = DispatcherHandle::new(ClosedDispatcher);
    assert_eq!(handle.invoke(|| 1), Err(DispatchError::Closed));
    assert_eq!(
        handle.invoke_async(|| async { 1 }).wait(),
        Err(DispatchError::Closed)
    );
}

#[test]
fn panicking_job_does_not_stall_the_queue() {
    let dispatcher = Arc::new(InlineDispatcher::new());
    let handle = DispatcherHandle::from_arc(dispatcher.clone());
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    handle.post(|| panic!("raw job failure"));
    handle.post(move || flag.store(true, Ordering::SeqCst));

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(dispatcher.pending_jobs(), 0);
    assert!(!handle.check_access());
}

#[test]
fn jobs_from_many_threads_never_overlap() {
    let handle = DispatcherHandle::inline();
    let busy = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            let busy = Arc::clone(&busy);
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                for _ in 0..50 {
                    let busy = Arc::clone(&busy);
                    let completed = Arc::clone(&completed);
                    handle
                        .invoke(move || {
                            assert!(!busy.swap(true, Ordering::SeqCst), "jobs overlapped");
                            completed.fetch_add(1, Ordering::SeqCst);
                            busy.store(false, Ordering::SeqCst);
                        })
                        .expect("dispatcher open");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }

    assert_eq!(completed.load(Ordering::SeqCst), 200);
}
