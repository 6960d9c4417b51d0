//! Headless graphics environment: an emulated document and window with
//! enough of the browser SVG geometry contract for a diagram toolkit to run
//! without a browser.
//!
//! Installing the environment is process-wide. Only one [`EnvironmentHandle`]
//! may be live at a time; a second [`HeadlessEnvironment::install`] fails
//! with [`Error::EnvironmentBusy`] until the first handle is torn down.
//! Concurrent renders therefore need separate processes.

pub mod dom;
pub mod geometry;
pub mod matrix;
pub mod window;

pub use dom::{Document, Node, NodeId, NodeKind};
pub use geometry::{BoundingBox, Capabilities, ClientRect};
pub use matrix::{AffineTransform, SvgPoint, SvgTransform, TransformKind};
pub use window::{ComputedStyle, ResizeObserver, Window};

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Entry point for installing the emulated environment.
pub struct HeadlessEnvironment;

impl HeadlessEnvironment {
    /// Install the document and window for one render.
    pub fn install() -> Result<EnvironmentHandle> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::EnvironmentBusy);
        }
        log::debug!("headless environment installed");
        let document = Arc::new(Mutex::new(Document::new()));
        let window = Arc::new(Window::new(document.clone()));
        Ok(EnvironmentHandle { document, window, released: false })
    }

    pub fn is_installed() -> bool {
        INSTALLED.load(Ordering::SeqCst)
    }
}

/// Owner of the installed document and window.
///
/// Dropping the handle releases the process-wide slot as well; `teardown`
/// only makes the point of release explicit.
pub struct EnvironmentHandle {
    document: Arc<Mutex<Document>>,
    window: Arc<Window>,
    released: bool,
}

impl EnvironmentHandle {
    /// Lock the document for reading or mutation.
    pub fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shared_document(&self) -> Arc<Mutex<Document>> {
        self.document.clone()
    }

    pub fn window(&self) -> Arc<Window> {
        self.window.clone()
    }

    /// Append a fresh `div` to `body` for a toolkit to render into.
    pub fn create_container(&self) -> NodeId {
        let mut doc = self.document();
        let container = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, container);
        container
    }

    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            INSTALLED.store(false, Ordering::SeqCst);
            log::debug!("headless environment torn down");
        }
    }
}

impl Drop for EnvironmentHandle {
    fn drop(&mut self) {
        self.release();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected_until_teardown() {
        let _guard = test_support::serial();
        let env = HeadlessEnvironment::install().expect("first install");
        assert!(HeadlessEnvironment::is_installed());
        assert!(matches!(
            HeadlessEnvironment::install(),
            Err(Error::EnvironmentBusy)
        ));
        env.teardown();
        assert!(!HeadlessEnvironment::is_installed());

        let again = HeadlessEnvironment::install().expect("reinstall after teardown");
        drop(again);
        assert!(!HeadlessEnvironment::is_installed());
    }

    #[test]
    fn container_is_attached_under_body() {
        let _guard = test_support::serial();
        let env = HeadlessEnvironment::install().unwrap();
        let container = env.create_container();
        {
            let doc = env.document();
            assert_eq!(doc.parent(container), Some(doc.body()));
            assert!(doc.bounding_box(container).is_none());
        }
        env.teardown();
    }
}
