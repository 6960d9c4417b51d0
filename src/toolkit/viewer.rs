use super::draw::Painter;
use super::model::{self, ElementKind};
use super::{DiagramToolkit, ImportWarnings};
use crate::environment::{
    BoundingBox, Document, EnvironmentHandle, NodeId, ResizeObserver, Window, SVG_NS, XLINK_NS,
};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DEFAULT_FONT_FAMILY: &str = "Arial, sans-serif";

/// Read-only BPMN viewer drawing into the headless document.
pub struct BpmnViewer {
    document: Arc<Mutex<Document>>,
    window: Arc<Window>,
    container: NodeId,
    svg: NodeId,
    defs: NodeId,
    viewport: NodeId,
    layer: NodeId,
    resize_observer: Box<dyn ResizeObserver>,
    font_family: String,
    render_frame: Option<u32>,
    rendered: Arc<AtomicBool>,
    imported: bool,
    destroyed: bool,
}

impl BpmnViewer {
    fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the deferred render pass after the last import has run.
    pub fn is_rendered(&self) -> bool {
        self.rendered.load(Ordering::SeqCst)
    }
}

impl DiagramToolkit for BpmnViewer {
    fn create(env: &EnvironmentHandle, container: NodeId) -> Result<Self> {
        let window = env.window();
        let font_family = match window.computed_style(container).get_property_value("font-family") {
            "" => DEFAULT_FONT_FAMILY.to_string(),
            family => family.to_string(),
        };

        let (svg, defs, viewport, layer) = {
            let mut doc = env.document();
            let svg = doc.create_element_ns(SVG_NS, "svg");
            doc.set_attribute(svg, "xmlns", SVG_NS);
            doc.set_attribute(svg, "xmlns:xlink", XLINK_NS);
            doc.set_attribute(svg, "width", "100%");
            doc.set_attribute(svg, "height", "100%");
            doc.append_child(container, svg);

            let defs = doc.create_element_ns(SVG_NS, "defs");
            doc.append_child(svg, defs);
            Painter::new(&mut doc, &font_family).markers(defs);

            let viewport = doc.create_element_ns(SVG_NS, "g");
            doc.add_class(viewport, "viewport");
            doc.append_child(svg, viewport);
            let layer = doc.create_element_ns(SVG_NS, "g");
            doc.add_class(layer, "layer-root");
            doc.append_child(viewport, layer);
            (svg, defs, viewport, layer)
        };

        let resize_observer = window.resize_observer();
        resize_observer.observe(container);
        log::debug!("viewer created in container {:?}", container);

        Ok(BpmnViewer {
            document: env.shared_document(),
            window,
            container,
            svg,
            defs,
            viewport,
            layer,
            resize_observer,
            font_family,
            render_frame: None,
            rendered: Arc::new(AtomicBool::new(false)),
            imported: false,
            destroyed: false,
        })
    }

    async fn import_xml(&mut self, xml: &str) -> Result<ImportWarnings> {
        if self.destroyed {
            return Err(Error::ImportError("viewer has been destroyed".to_string()));
        }
        let (model, warnings) = model::parse(xml)?;

        let mut shapes: Vec<_> = model
            .shapes
            .iter()
            .filter_map(|s| model.elements.get(&s.element).map(|e| (e, s)))
            .collect();
        // containers first so nested shapes paint over them
        shapes.sort_by_key(|(element, shape)| match element.kind {
            ElementKind::Participant => 0,
            ElementKind::Lane => 1,
            ElementKind::SubProcess if shape.is_expanded == Some(true) => 2,
            _ => 3,
        });

        {
            let mut doc = self.document();
            doc.remove_all_children(self.layer);
            let layer = self.layer;
            let mut painter = Painter::new(&mut doc, &self.font_family);
            for (element, shape) in &shapes {
                painter.shape(layer, element, shape);
            }
            for edge in &model.edges {
                if let Some(element) = model.elements.get(&edge.element) {
                    let is_default = model.default_flows.contains(&element.id);
                    painter.edge(layer, element, edge, is_default);
                }
            }
        }
        log::debug!(
            "imported {} shapes and {} edges with {} warnings",
            shapes.len(),
            model.edges.len(),
            warnings.len()
        );

        if let Some(frame) = self.render_frame.take() {
            self.window.cancel_animation_frame(frame);
        }
        self.rendered.store(false, Ordering::SeqCst);
        let rendered = self.rendered.clone();
        self.render_frame = Some(self.window.request_animation_frame(move |_| {
            rendered.store(true, Ordering::SeqCst);
        }));
        self.imported = true;
        Ok(warnings)
    }

    async fn save_svg(&mut self) -> Result<String> {
        if !self.imported || self.destroyed {
            return Err(Error::ImportError("no diagram imported".to_string()));
        }
        if self.window.animation_frames().pending() > 0 {
            self.window.animation_frames().tick().await;
        }
        self.render_frame = None;

        let doc = self.document();
        let bbox = doc.bounding_box(self.viewport).unwrap_or_else(BoundingBox::default_box);
        let (x, y, w, h) = (
            super::draw::num(bbox.x),
            super::draw::num(bbox.y),
            super::draw::num(bbox.width),
            super::draw::num(bbox.height),
        );
        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <!-- created with bpmn-render {version} -->\n\
             <svg xmlns=\"{svg_ns}\" xmlns:xlink=\"{xlink_ns}\" width=\"{w}\" height=\"{h}\" \
             viewBox=\"{x} {y} {w} {h}\" version=\"1.1\">{defs}{content}</svg>",
            version = env!("CARGO_PKG_VERSION"),
            svg_ns = SVG_NS,
            xlink_ns = XLINK_NS,
            defs = doc.outer_xml(self.defs),
            content = doc.inner_xml(self.viewport),
        ))
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(frame) = self.render_frame.take() {
            self.window.cancel_animation_frame(frame);
        }
        self.resize_observer.unobserve(self.container);
        self.resize_observer.disconnect();
        let mut doc = self.document();
        doc.remove_all_children(self.layer);
        doc.remove_child(self.container, self.svg);
        log::debug!("viewer destroyed");
    }
}
