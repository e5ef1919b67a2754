use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use parking_lot::Mutex;
use weft_core::{BoxError, ComponentStatus, EventHandlerId, RenderError};
use weft_forms::{render_on_change, EditContext};
use weft_testing::prelude::*;

const CLICK: EventHandlerId = 1;
const CHANGE: EventHandlerId = 2;

fn counter(count: Arc<Mutex<u32>>) -> TestComponent {
    let shown = Arc::clone(&count);
    TestComponent::new(move |builder| {
        builder
            .open_element("button")
            .add_event_handler("onclick", CLICK)
            .add_text(format!("clicked {}", *shown.lock()))
            .close_element();
    })
    .on_event(CLICK, move |_| {
        *count.lock() += 1;
        Ok(HandlerOutcome::Completed)
    })
}

#[derive(Debug)]
struct SaveFailed;

impl fmt::Display for SaveFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("save failed")
    }
}

impl std::error::Error for SaveFailed {}

#[test]
fn every_registration_gets_a_fresh_id_and_unknown_ids_are_rejected() {
    let renderer = TestRenderer::new();
    let shared = Arc::new(Mutex::new(0));
    let first = renderer
        .renderer()
        .assign_root_component_id(counter(Arc::clone(&shared)))
        .expect("register");
    let second = renderer
        .renderer()
        .assign_root_component_id(counter(shared))
        .expect("register");
    assert_ne!(first, second);

    let err = renderer
        .renderer()
        .render_root_component(first + second + 100)
        .expect_err("never assigned");
    assert!(matches!(err, RenderError::UnknownComponent(_)));
    assert!(err.is_unknown_target());
    assert!(renderer.recorder().is_empty());
}

#[test]
fn captured_batches_survive_later_passes() {
    let renderer = TestRenderer::new();
    let count = Arc::new(Mutex::new(0));
    let button = counter(Arc::clone(&count));
    let button_probe = button.probe();
    let button_id = renderer.mount(button).expect("mount");
    let label_id = renderer
        .mount(TestComponent::new(|builder| {
            builder.add_text("label");
        }))
        .expect("mount");

    // One pass that both re-renders the button and disposes the label.
    *count.lock() = 5;
    let inner = renderer.renderer().clone();
    renderer
        .renderer()
        .dispatcher()
        .invoke(move || {
            assert!(button_probe.request_render());
            inner.remove_root_component(label_id)
        })
        .expect("dispatcher open")
        .expect("remove label");
    let snapshot = renderer.last_batch().expect("combined batch");
    assert_eq!(snapshot.reference_frames(), &[RenderFrame::text("clicked 5")]);
    assert_eq!(snapshot.disposed_component_ids(), &[label_id]);

    renderer
        .dispatch_event(button_id, CLICK, EventArgs::Empty)
        .expect("click");

    let history = renderer.batches();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], snapshot);
    assert_eq!(snapshot.reference_frames(), &[RenderFrame::text("clicked 5")]);
    assert_eq!(snapshot.disposed_component_ids(), &[label_id]);
    assert_eq!(history[3].reference_frames(), &[RenderFrame::text("clicked 6")]);
    assert!(history[3].disposed_component_ids().is_empty());
}

#[test]
fn failing_handlers_surface_their_own_error() {
    let renderer = TestRenderer::new();
    let id = renderer
        .mount(
            TestComponent::new(|builder| {
                builder.add_event_handler("onsubmit", CLICK);
            })
            .on_event(CLICK, |_| Err(SaveFailed.into())),
        )
        .expect("mount");

    let err = renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect_err("handler fails");
    assert_eq!(err.to_string(), "save failed");
    let cause = err.into_handler_error().expect("handler failure");
    assert!(cause.downcast::<SaveFailed>().is_ok());
    assert_eq!(renderer.batches().len(), 1, "failed handler renders nothing");
}

#[test]
fn failing_async_handlers_surface_their_own_error() {
    let renderer = TestRenderer::new();
    let id = renderer
        .mount(
            TestComponent::new(|builder| {
                builder.add_event_handler("onsubmit", CLICK);
            })
            .on_event(CLICK, |_| {
                Ok(HandlerOutcome::pending(async {
                    Err::<(), BoxError>(SaveFailed.into())
                }))
            }),
        )
        .expect("mount");

    let err = renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect_err("handler fails");
    let cause = err.handler_error().expect("handler failure");
    assert!(cause.downcast_ref::<SaveFailed>().is_some());
}

#[test]
fn async_handlers_finish_before_dispatch_returns() {
    let renderer = TestRenderer::new();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let id = renderer
        .mount(
            TestComponent::new(|builder| {
                builder.add_event_handler("onsave", CLICK);
            })
            .on_event(CLICK, move |_| {
                let (tx, rx) = oneshot::channel();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    let _ = tx.send(());
                });
                let flag = Arc::clone(&flag);
                Ok(HandlerOutcome::pending(async move {
                    rx.await?;
                    flag.store(true, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }))
            }),
        )
        .expect("mount");

    renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect("dispatch");

    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(renderer.batches().len(), 2);
}

#[test]
fn lifecycle_ends_in_disposal() {
    let renderer = TestRenderer::new();
    let component = counter(Arc::new(Mutex::new(0)));
    let probe = component.probe();
    let id = renderer
        .renderer()
        .assign_root_component_id(component)
        .expect("register");
    assert_eq!(probe.component_id(), Some(id));
    let status = |id| renderer.renderer().component_status(id).expect("status");

    assert_eq!(status(id), ComponentStatus::Registered);
    renderer.renderer().render_root_component(id).expect("render");
    assert_eq!(status(id), ComponentStatus::Rendered);
    renderer.renderer().remove_root_component(id).expect("remove");
    assert_eq!(status(id), ComponentStatus::Disposed);
    assert!(probe.is_disposed());

    let err = renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect_err("disposed");
    assert!(matches!(err, RenderError::DisposedComponent(_)));
    assert!(err.is_unknown_target());
}

#[test]
fn field_changes_during_an_event_join_the_event_batch() {
    let renderer = TestRenderer::new();
    let name = Arc::new(Mutex::new(String::new()));
    let context = EditContext::new(Arc::clone(&name));
    let name_field = context.field("name").expect("field");

    let summary_context = context.clone();
    let summary = TestComponent::new(move |builder| {
        builder.add_text(format!("modified: {}", summary_context.is_modified()));
    });
    let summary_probe = summary.probe();
    let summary_id = renderer.mount(summary).expect("mount");
    render_on_change(
        &context,
        summary_probe.render_handle().expect("attached"),
    );

    let shown = Arc::clone(&name);
    let editor_context = context.clone();
    let editor = TestComponent::new(move |builder| {
        builder
            .open_element("input")
            .add_attribute("value", shown.lock().clone())
            .add_event_handler("onchange", CHANGE)
            .close_element();
    })
    .on_event(CHANGE, move |args| {
        if let EventArgs::Change { value } = args {
            *name.lock() = value.clone();
        }
        editor_context.notify_field_changed(&name_field)?;
        Ok(HandlerOutcome::Completed)
    });
    let editor_id = renderer.mount(editor).expect("mount");
    assert_eq!(renderer.batches().len(), 2);

    renderer
        .dispatch_event(editor_id, CHANGE, EventArgs::change("Ada"))
        .expect("dispatch");

    let batches = renderer.batches();
    assert_eq!(batches.len(), 3, "listener render folded into the event batch");
    let batch = &batches[2];
    let order: Vec<_> = batch.diffs().iter().map(|diff| diff.component_id).collect();
    assert_eq!(order, vec![summary_id, editor_id]);
    let summary_edit = &batch.diff_for(summary_id).expect("summary diff").edits[0];
    assert_eq!(
        batch.reference_frame(summary_edit),
        Some(&RenderFrame::text("modified: true"))
    );
    assert!(context.is_modified());
}

#[test]
fn a_rejected_batch_keeps_the_last_accepted_frames() {
    let renderer = TestRenderer::new();
    let count = Arc::new(Mutex::new(0));
    let id = renderer.mount(counter(Arc::clone(&count))).expect("mount");

    renderer.recorder().fail_next("display lost");
    let err = renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect_err("surface failure");
    assert_eq!(err.to_string(), "display lost");
    assert_eq!(*count.lock(), 1, "the handler itself ran");

    renderer
        .dispatch_event(id, CLICK, EventArgs::Empty)
        .expect("dispatch");
    let last = renderer.last_batch().expect("batch");
    assert_eq!(last.sequence(), 2);
    assert_eq!(
        last.diff_for(id).expect("diff").edits,
        vec![RenderTreeEdit::UpdateText {
            sibling_index: 2,
            reference_frame_index: 0,
        }]
    );
    assert_eq!(last.reference_frames(), &[RenderFrame::text("clicked 2")]);
}

#[test]
fn a_component_asking_to_render_again_gets_a_follow_up_batch() {
    let renderer = TestRenderer::new();
    let renders = Arc::new(Mutex::new(0_u32));
    let slot: Arc<Mutex<Option<ComponentProbe>>> = Arc::default();
    let counted = Arc::clone(&renders);
    let own = Arc::clone(&slot);
    let component = TestComponent::new(move |builder| {
        let mut renders = counted.lock();
        *renders += 1;
        builder.add_text(format!("render {}", *renders));
        if *renders < 3 {
            if let Some(this) = own.lock().as_ref() {
                assert!(this.request_render());
            }
        }
    });
    *slot.lock() = Some(component.probe());

    let id = renderer.mount(component).expect("mount");

    assert_eq!(*renders.lock(), 3);
    let batches = renderer.batches();
    assert_eq!(batches.len(), 3);
    for (batch, expected) in batches.iter().zip(["render 1", "render 2", "render 3"]) {
        let rendered: Vec<_> = batch.diffs().iter().map(|diff| diff.component_id).collect();
        assert_eq!(rendered, vec![id], "one diff per component per batch");
        assert_eq!(batch.reference_frames(), &[RenderFrame::text(expected)]);
    }
}

#[test]
fn a_disposal_rejected_by_the_surface_is_reported_by_the_next_batch() {
    let renderer = TestRenderer::new();
    let first = renderer.mount(counter(Arc::default())).expect("mount");
    let first_batches = renderer.batches().len();

    renderer.recorder().fail_next("display lost");
    let err = renderer
        .renderer()
        .remove_root_component(first)
        .expect_err("surface failure");
    assert_eq!(err.to_string(), "display lost");
    assert_eq!(
        renderer.renderer().component_status(first).expect("status"),
        ComponentStatus::Disposed
    );
    assert_eq!(renderer.batches().len(), first_batches);

    let second = renderer.mount(counter(Arc::default())).expect("mount");
    let last = renderer.last_batch().expect("batch");
    assert_eq!(last.disposed_component_ids(), &[first]);
    assert!(last.diff_for(second).is_some());

    renderer
        .dispatch_event(second, CLICK, EventArgs::Empty)
        .expect("click");
    let reported: usize = renderer
        .batches()
        .iter()
        .map(|batch| {
            batch
                .disposed_component_ids()
                .iter()
                .filter(|&&id| id == first)
                .count()
        })
        .sum();
    assert_eq!(reported, 1);
}
