use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use weft_core::{
    BoxError, Component, DispatcherHandle, EventArgs, EventHandlerId, HandlerOutcome, RenderBatch,
    RenderSurface, RenderTreeBuilder, Renderer,
};

const ROW_SAMPLES: &[usize] = &[8, 32, 128, 512];
const BUMP: EventHandlerId = 1;

struct Table {
    rows: usize,
    revision: u64,
}

impl Component for Table {
    fn render(&mut self, builder: &mut RenderTreeBuilder) {
        builder
            .open_element("table")
            .add_event_handler("onclick", BUMP);
        for row in 0..self.rows {
            builder
                .open_element("tr")
                .add_attribute("class", if row % 2 == 0 { "even" } else { "odd" })
                .add_text(format!("row {row}"))
                // Only the last cell changes between revisions.
                .add_text(if row + 1 == self.rows {
                    format!("rev {}", self.revision)
                } else {
                    String::from("stable")
                })
                .close_element();
        }
        builder.close_element();
    }

    fn handle_event(
        &mut self,
        _handler_id: EventHandlerId,
        _args: &EventArgs,
    ) -> Result<HandlerOutcome, BoxError> {
        self.revision += 1;
        Ok(HandlerOutcome::Completed)
    }
}

struct CountingSurface;

impl RenderSurface for CountingSurface {
    fn update_display(&mut self, batch: &RenderBatch<'_>) -> Result<(), BoxError> {
        black_box(batch.reference_frames().len());
        Ok(())
    }
}

fn bench_event_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_render");
    for &rows in ROW_SAMPLES {
        let renderer = Renderer::new(DispatcherHandle::inline(), CountingSurface);
        let id = renderer
            .assign_root_component_id(Table { rows, revision: 0 })
            .expect("register");
        renderer.render_root_component(id).expect("first render");

        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| {
                renderer
                    .dispatch_event(id, BUMP, EventArgs::Empty)
                    .expect("dispatch");
            });
        });
    }
    group.finish();
}

fn bench_first_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_render");
    for &rows in ROW_SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let renderer = Renderer::new(DispatcherHandle::inline(), CountingSurface);
                let id = renderer
                    .assign_root_component_id(Table { rows, revision: 0 })
                    .expect("register");
                renderer.render_root_component(id).expect("render");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_event_render, bench_first_render);
criterion_main!(benches);
