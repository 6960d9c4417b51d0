//! Drives a [`DiagramToolkit`] through one import/save cycle.

use crate::environment::{Document, EnvironmentHandle, NodeId};
use crate::toolkit::{DiagramToolkit, ImportWarnings};
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};

/// SVG produced by the toolkit, with the warnings its import reported.
#[derive(Debug, Clone)]
pub struct VectorOutput {
    pub svg: String,
    pub warnings: ImportWarnings,
}

/// Owns a live toolkit and destroys it exactly once when dropped, then
/// detaches its container from the document.
struct ToolkitGuard<T: DiagramToolkit> {
    toolkit: T,
    document: Arc<Mutex<Document>>,
    container: NodeId,
}

impl<T: DiagramToolkit> Drop for ToolkitGuard<T> {
    fn drop(&mut self) {
        self.toolkit.destroy();
        detach(&self.document, self.container);
        log::debug!("toolkit destroyed");
    }
}

fn detach(document: &Mutex<Document>, container: NodeId) {
    let mut doc = document.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(parent) = doc.parent(container) {
        doc.remove_child(parent, container);
    }
}

pub struct RenderOrchestrator<'env> {
    env: &'env EnvironmentHandle,
}

impl<'env> RenderOrchestrator<'env> {
    pub fn new(env: &'env EnvironmentHandle) -> Self {
        RenderOrchestrator { env }
    }

    /// Import `xml` into a fresh toolkit of type `T` and save it as SVG.
    ///
    /// The toolkit is destroyed on every path once it has been created,
    /// including import and save failures.
    pub async fn render<T: DiagramToolkit>(&self, xml: &str) -> Result<VectorOutput> {
        let container = self.env.create_container();
        let toolkit = match T::create(self.env, container) {
            Ok(toolkit) => toolkit,
            Err(e) => {
                detach(&self.env.shared_document(), container);
                return Err(e);
            }
        };
        let mut guard = ToolkitGuard {
            toolkit,
            document: self.env.shared_document(),
            container,
        };

        log::debug!("importing diagram ({} bytes)", xml.len());
        let warnings = guard.toolkit.import_xml(xml).await?;
        for warning in &warnings {
            log::warn!("import warning: {}", warning);
        }

        let svg = guard.toolkit.save_svg().await?;
        log::debug!("saved SVG ({} bytes)", svg.len());
        Ok(VectorOutput { svg, warnings })
    }
}
