//! End-to-end tests for the render pipeline

use bpmn_render::{render, Error, HeadlessEnvironment, RenderRequest};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The environment is process-wide; renders in this binary must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn png_size(path: &Path) -> (u32, u32) {
    let decoder = png::Decoder::new(std::fs::File::open(path).unwrap());
    let reader = decoder.read_info().unwrap();
    let info = reader.info();
    (info.width, info.height)
}

fn rgba_at(path: &Path, x: u32, y: u32) -> [u8; 4] {
    let decoder = png::Decoder::new(std::fs::File::open(path).unwrap());
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();
    assert_eq!(info.color_type, png::ColorType::Rgba);
    let at = (y as usize * info.line_size) + x as usize * 4;
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}

fn digest(path: &Path) -> String {
    hex::encode(Sha256::digest(std::fs::read(path).unwrap()))
}

#[tokio::test]
async fn renders_order_diagram_with_padding() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("order.png");
    let request = RenderRequest::new(fixture("order.bpmn"), &output);

    let report = render(&request).await.unwrap();

    // viewBox extent 900x500 plus 20px on each side; height raised to the minimum
    assert_eq!((report.dimensions.width, report.dimensions.height), (940, 600));
    assert_eq!((report.pixel_width, report.pixel_height), (940, 600));
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(png_size(&output), (940, 600));
    assert_eq!(report.bytes as u64, std::fs::metadata(&output).unwrap().len());
    assert_eq!(report.output, output);
    assert!(!HeadlessEnvironment::is_installed());
}

#[tokio::test]
async fn background_outside_the_diagram_is_opaque_white() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("order.png");
    render(&RenderRequest::new(fixture("order.bpmn"), &output)).await.unwrap();

    // the 900x500 viewBox is centred vertically, leaving blank bands above and below
    assert_eq!(rgba_at(&output, 0, 0), [255, 255, 255, 255]);
    assert_eq!(rgba_at(&output, 939, 599), [255, 255, 255, 255]);
}

#[tokio::test]
async fn scale_multiplies_pixel_size() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("order@2x.png");
    let request = RenderRequest::new(fixture("order.bpmn"), &output).with_scale("2");

    let report = render(&request).await.unwrap();
    assert_eq!((report.dimensions.width, report.dimensions.height), (940, 600));
    assert_eq!(png_size(&output), (1880, 1200));
}

#[tokio::test]
async fn larger_minimum_wins() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("min.png");
    let request = RenderRequest::new(fixture("order.bpmn"), &output)
        .with_min_dimensions("1200x700")
        .with_padding("0");

    let report = render(&request).await.unwrap();
    assert_eq!(png_size(&output), (1200, 700));
    assert_eq!(report.dimensions.width, 1200);
}

#[tokio::test]
async fn document_without_layout_renders_blank_minimum() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("plain.png");
    let request = RenderRequest::new(fixture("no_di.bpmn"), &output);

    let report = render(&request).await.unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("BPMNDiagram"));
    assert_eq!(png_size(&output), (800, 600));
}

#[tokio::test]
async fn dangling_di_reference_is_a_warning() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("dangling.png");
    let request = RenderRequest::new(fixture("dangling.bpmn"), &output);

    let report = render(&request).await.unwrap();
    assert_eq!(report.warnings, vec!["unresolved reference <Ghost>".to_string()]);
    assert!(output.exists());
}

#[tokio::test]
async fn rendering_is_deterministic() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.png");
    let second = dir.path().join("second.png");

    render(&RenderRequest::new(fixture("order.bpmn"), &first)).await.unwrap();
    render(&RenderRequest::new(fixture("order.bpmn"), &second)).await.unwrap();
    assert_eq!(digest(&first), digest(&second));
}

#[tokio::test]
async fn non_bpmn_input_is_rejected_before_rendering() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("catalog.png");
    let request = RenderRequest::new(fixture("not_bpmn.xml"), &output);

    let err = render(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)), "got {:?}", err);
    assert!(!output.exists());
}

#[tokio::test]
async fn definitions_mentioned_only_in_a_comment_is_rejected() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("catalog.png");
    let request = RenderRequest::new(fixture("commented_root.xml"), &output);

    let err = render(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)), "got {:?}", err);
    assert!(!output.exists());
    assert!(!HeadlessEnvironment::is_installed());
}

#[tokio::test]
async fn malformed_xml_fails_import_and_releases_environment() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("truncated.png");
    let request = RenderRequest::new(fixture("truncated.bpmn"), &output);

    let err = render(&request).await.unwrap_err();
    assert!(matches!(err, Error::ImportError(_)), "got {:?}", err);
    assert!(!output.exists());
    assert!(!HeadlessEnvironment::is_installed());
}

#[tokio::test]
async fn missing_input_leaves_output_alone() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never.png");
    let request = RenderRequest::new(dir.path().join("missing.bpmn"), &output);

    let err = render(&request).await.unwrap_err();
    assert!(matches!(err, Error::InputNotFound(_)));
    assert!(err.to_string().contains("missing.bpmn"));
    assert!(!output.exists());
}

#[tokio::test]
async fn unwritable_output_is_reported() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("no-such-dir").join("out.png");
    let request = RenderRequest::new(fixture("order.bpmn"), &output);

    let err = render(&request).await.unwrap_err();
    match err {
        Error::OutputWriteError { path, .. } => assert_eq!(path, output),
        other => panic!("expected OutputWriteError, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_install_is_refused() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("busy.png");
    let held = HeadlessEnvironment::install().unwrap();

    let err = render(&RenderRequest::new(fixture("order.bpmn"), &output)).await.unwrap_err();
    assert!(matches!(err, Error::EnvironmentBusy));
    assert!(!output.exists());

    held.teardown();
    render(&RenderRequest::new(fixture("order.bpmn"), &output)).await.unwrap();
    assert!(output.exists());
}
