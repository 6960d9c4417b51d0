use bpmn_render::dimensions::DimensionResolver;
use bpmn_render::environment::HeadlessEnvironment;
use bpmn_render::rendering::rasterize;
use bpmn_render::{Dimensions, RenderOrchestrator, RenderRequest};
use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn order_fixture() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/order.bpmn");
    std::fs::read_to_string(path).expect("fixture")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

fn bench_import_and_save(c: &mut Criterion) {
    let xml = order_fixture();
    let rt = runtime();
    c.bench_function("import_and_save_svg", |b| {
        b.iter(|| {
            let env = HeadlessEnvironment::install().unwrap();
            let out = rt
                .block_on(RenderOrchestrator::new(&env).render::<bpmn_render::BpmnViewer>(&xml))
                .unwrap();
            env.teardown();
            out
        })
    });
}

fn bench_resolve_and_rasterize(c: &mut Criterion) {
    let xml = order_fixture();
    let rt = runtime();
    let env = HeadlessEnvironment::install().unwrap();
    let svg = rt
        .block_on(RenderOrchestrator::new(&env).render::<bpmn_render::BpmnViewer>(&xml))
        .unwrap()
        .svg;
    env.teardown();

    let resolver = DimensionResolver::new(Dimensions { width: 800, height: 600 }, 20);
    c.bench_function("resolve_dimensions", |b| b.iter(|| resolver.resolve(&svg).unwrap()));

    let resolved = resolver.resolve(&svg).unwrap();
    c.bench_function("rasterize_1x", |b| {
        b.iter(|| {
            rasterize(&resolved.markup, resolved.dimensions.width, resolved.dimensions.height, 1.0)
                .unwrap()
        })
    });
}

fn bench_full_render(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let request = RenderRequest::new(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/order.bpmn"),
        dir.path().join("bench.png"),
    );
    let rt = runtime();
    c.bench_function("render_to_png", |b| {
        b.iter(|| rt.block_on(bpmn_render::render(&request)).unwrap())
    });
}

criterion_group!(benches, bench_import_and_save, bench_resolve_and_rasterize, bench_full_render);
criterion_main!(benches);
