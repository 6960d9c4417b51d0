//! Diagram toolkit contract and the bundled BPMN viewer.
//!
//! The orchestrator drives a toolkit through [`DiagramToolkit`] only; the
//! toolkit draws into the installed headless environment and hands back
//! serialized SVG.

pub mod draw;
pub mod model;
pub mod viewer;

pub use viewer::BpmnViewer;

use crate::environment::{EnvironmentHandle, NodeId};
use crate::Result;

/// Non-fatal problems reported by an import.
pub type ImportWarnings = Vec<String>;

/// A diagram library bound to one container node.
///
/// Lifecycle: `create` → `import_xml` → `save_svg` → `destroy`. `destroy` is
/// called exactly once by the orchestrator, whatever happened before.
#[allow(async_fn_in_trait)]
pub trait DiagramToolkit: Sized {
    fn create(env: &EnvironmentHandle, container: NodeId) -> Result<Self>;

    /// Load a BPMN document. Fails with `ImportError` when rejected.
    async fn import_xml(&mut self, xml: &str) -> Result<ImportWarnings>;

    /// Serialize the imported diagram as a standalone SVG document.
    async fn save_svg(&mut self) -> Result<String>;

    fn destroy(&mut self);
}
