//! bpmn-render
//!
//! Headless rendering of BPMN 2.0 process diagrams to PNG. A diagram toolkit
//! draws the document into an emulated SVG environment; the resulting vector
//! output is sized from its `viewBox` and rasterized.
//!
//! # Pipeline
//!
//! - **Validation**: cheap structural checks before any rendering work
//! - **Environment**: an emulated document with SVG geometry support,
//!   installed once per process at a time
//! - **Orchestration**: toolkit import and SVG export, with guaranteed cleanup
//! - **Dimensions**: output size from the `viewBox`, minimums and padding
//! - **Rasterization**: white canvas, scale, PNG encoding
//!
//! # Example
//!
//! ```no_run
//! use bpmn_render::RenderRequest;
//!
//! # async fn run() -> bpmn_render::Result<()> {
//! let request = RenderRequest::new("order.bpmn", "order.png")
//!     .with_scale("2")
//!     .with_padding("10");
//! let report = bpmn_render::render(&request).await?;
//! println!("{}x{} px", report.pixel_width, report.pixel_height);
//! # Ok(())
//! # }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod error;
pub use error::{Error, Result};

pub mod dimensions;
pub mod environment;
pub mod orchestrator;
pub mod rendering;
pub mod toolkit;
pub mod validate;

pub use dimensions::DimensionResolver;
pub use environment::{EnvironmentHandle, HeadlessEnvironment};
pub use orchestrator::RenderOrchestrator;
pub use rendering::RasterImage;
pub use toolkit::{BpmnViewer, DiagramToolkit};

pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_MIN_DIMENSIONS: Dimensions = Dimensions { width: 800, height: 600 };
pub const DEFAULT_PADDING: u32 = 20;

/// Width and height in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        DEFAULT_MIN_DIMENSIONS
    }
}

/// What to render and how.
///
/// The `with_*` builders take raw caller text and keep the default when it
/// does not parse, so a request can always be built.
///
/// ```
/// let req = bpmn_render::RenderRequest::new("in.bpmn", "out.png")
///     .with_scale("abc")
///     .with_min_dimensions("1024x768");
/// assert_eq!(req.scale, 1.0);
/// assert_eq!(req.min_dimensions.width, 1024);
/// ```
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Magnification applied when rasterizing
    pub scale: f64,
    pub min_dimensions: Dimensions,
    /// Added on each side of the diagram extent
    pub padding: u32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            scale: DEFAULT_SCALE,
            min_dimensions: DEFAULT_MIN_DIMENSIONS,
            padding: DEFAULT_PADDING,
        }
    }
}

impl RenderRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, raw: &str) -> Self {
        match parse_scale(raw) {
            Some(scale) => self.scale = scale,
            None => log::warn!("ignoring invalid scale {:?}; using {}", raw, DEFAULT_SCALE),
        }
        self
    }

    pub fn with_min_dimensions(mut self, raw: &str) -> Self {
        match parse_min_dimensions(raw) {
            Some(dims) => self.min_dimensions = dims,
            None => log::warn!("ignoring invalid minimum dimensions {:?}", raw),
        }
        self
    }

    pub fn with_padding(mut self, raw: &str) -> Self {
        match parse_padding(raw) {
            Some(padding) => self.padding = padding,
            None => log::warn!("ignoring invalid padding {:?}; using {}", raw, DEFAULT_PADDING),
        }
        self
    }
}

/// A finite real number greater than zero.
pub fn parse_scale(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|s| s.is_finite() && *s > 0.0)
}

/// `WxH` with two positive integers.
pub fn parse_min_dimensions(raw: &str) -> Option<Dimensions> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let width = w.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    let height = h.trim().parse::<u32>().ok().filter(|v| *v > 0)?;
    Some(Dimensions { width, height })
}

/// A non-negative integer.
pub fn parse_padding(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok()
}

/// Outcome of a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub input: PathBuf,
    /// Where the PNG was written, made absolute against the working directory
    pub output: PathBuf,
    /// Logical size after minimums and padding
    pub dimensions: Dimensions,
    pub scale: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Size of the written PNG
    pub bytes: usize,
    /// Validation and import warnings, in the order they were raised
    pub warnings: Vec<String>,
}

/// Render `request.input` to `request.output` with the bundled [`BpmnViewer`].
pub async fn render(request: &RenderRequest) -> Result<RenderReport> {
    render_with::<BpmnViewer>(request).await
}

/// Render with a caller-chosen diagram toolkit.
///
/// Nothing is written unless rasterization succeeds; a missing input never
/// touches the output path.
pub async fn render_with<T: DiagramToolkit>(request: &RenderRequest) -> Result<RenderReport> {
    let text = read_input(&request.input)?;
    let label = request.input.display().to_string();
    let validation = validate::validate(&text, &label)?;
    let mut warnings: Vec<String> = validation.warnings.iter().map(ToString::to_string).collect();

    let env = HeadlessEnvironment::install()?;
    let vector = RenderOrchestrator::new(&env).render::<T>(&text).await;
    env.teardown();
    let vector = vector?;
    warnings.extend(vector.warnings);

    let resolved = DimensionResolver::new(request.min_dimensions, request.padding).resolve(&vector.svg)?;
    let dimensions = resolved.dimensions;
    log::debug!("resolved output size {}x{}", dimensions.width, dimensions.height);

    let image = rendering::rasterize(&resolved.markup, dimensions.width, dimensions.height, request.scale)?;
    std::fs::write(&request.output, &image.png_data).map_err(|source| Error::OutputWriteError {
        path: request.output.clone(),
        source,
    })?;
    log::debug!("wrote {} ({} bytes)", request.output.display(), image.byte_len());

    Ok(RenderReport {
        input: request.input.clone(),
        output: std::path::absolute(&request.output).unwrap_or_else(|_| request.output.clone()),
        dimensions,
        scale: request.scale,
        pixel_width: image.pixel_width,
        pixel_height: image.pixel_height,
        bytes: image.byte_len(),
        warnings,
    })
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}
