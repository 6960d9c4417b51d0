//! Arena-backed emulated document.
//!
//! Nodes are addressed by [`NodeId`] and never freed while the document lives;
//! removed nodes simply become detached. The only node factory is
//! [`Document::create_element_ns`], which attaches the geometry capability
//! table to every node created in the SVG namespace.

use super::geometry::{BoundingBox, Capabilities, ClientRect};
use super::matrix::{AffineTransform, SvgPoint, SvgTransform};
use super::{HTML_NS, SVG_NS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Coarse node classification used to pick geometry capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf drawing element (rect, circle, text, ...)
    Element,
    /// Container whose geometry is the union of its children
    Group,
    /// `path`, measured from its path data
    Path,
    /// `svg` drawing surface
    Root,
}

impl NodeKind {
    pub fn for_svg_tag(tag: &str) -> Self {
        match tag {
            "svg" => NodeKind::Root,
            "g" | "a" | "switch" => NodeKind::Group,
            "path" => NodeKind::Path,
            _ => NodeKind::Element,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub namespace: String,
    pub kind: NodeKind,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: Option<String>,
    capabilities: Option<Capabilities>,
}

impl Node {
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn has_capabilities(&self) -> bool {
        self.capabilities.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    document_element: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A fresh document holding `<html><body/></html>`.
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            document_element: NodeId(0),
            body: NodeId(0),
        };
        let html = doc.create_element_ns(HTML_NS, "html");
        let body = doc.create_element_ns(HTML_NS, "body");
        doc.append_child(html, body);
        doc.document_element = html;
        doc.body = body;
        doc
    }

    pub fn document_element(&self) -> NodeId {
        self.document_element
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_ns(HTML_NS, tag)
    }

    /// Create a detached element. SVG-namespace elements receive the
    /// geometry capabilities for their kind.
    pub fn create_element_ns(&mut self, namespace: &str, tag: &str) -> NodeId {
        let is_svg = namespace == SVG_NS;
        let kind = if is_svg { NodeKind::for_svg_tag(tag) } else { NodeKind::Element };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_string(),
            namespace: namespace.to_string(),
            kind,
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
            text: None,
            capabilities: is_svg.then(|| Capabilities::for_kind(kind)),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent {
            self.nodes[old.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let children = &mut self.nodes[parent.0].children;
        let before = children.len();
        children.retain(|&c| c != child);
        if children.len() == before {
            return false;
        }
        self.nodes[child.0].parent = None;
        true
    }

    pub fn remove_all_children(&mut self, parent: NodeId) {
        for child in std::mem::take(&mut self.nodes[parent.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attrs = &mut self.nodes[id.0].attributes;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].attributes.retain(|(k, _)| k != name);
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text = Some(text.to_string());
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let current = self.attribute(id, "class").unwrap_or_default();
        if current.split_whitespace().any(|c| c == class) {
            return;
        }
        let next = if current.is_empty() {
            class.to_string()
        } else {
            format!("{} {}", current, class)
        };
        self.set_attribute(id, "class", &next);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Pre-order walk of `root` and its attached descendants.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First attached element carrying `id` as its `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.document_element)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    pub fn query_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    // --- geometry capabilities ---

    /// `getBBox()`. `None` for nodes outside the SVG namespace.
    pub fn bounding_box(&self, id: NodeId) -> Option<BoundingBox> {
        self.nodes[id.0]
            .capabilities
            .map(|caps| (caps.bounding_box)(self, id))
    }

    /// `getBoundingClientRect()`, derived from the bounding box.
    pub fn bounding_client_rect(&self, id: NodeId) -> Option<ClientRect> {
        self.bounding_box(id).map(ClientRect::from)
    }

    /// `getScreenCTM()`
    pub fn screen_ctm(&self, id: NodeId) -> Option<AffineTransform> {
        self.nodes[id.0].capabilities.map(|caps| (caps.screen_ctm)(self, id))
    }

    /// `getCTM()`
    pub fn ctm(&self, id: NodeId) -> Option<AffineTransform> {
        self.nodes[id.0].capabilities.map(|caps| (caps.ctm)(self, id))
    }

    pub fn create_svg_point(&self, id: NodeId) -> Option<SvgPoint> {
        self.nodes[id.0].capabilities.map(|_| SvgPoint::default())
    }

    /// `createSVGMatrix()`, only on root surfaces.
    pub fn create_svg_matrix(&self, id: NodeId) -> Option<AffineTransform> {
        self.surface_capabilities(id).map(|_| AffineTransform::identity())
    }

    /// `createSVGTransform()`, only on root surfaces.
    pub fn create_svg_transform(&self, id: NodeId) -> Option<SvgTransform> {
        self.surface_capabilities(id).map(|_| SvgTransform::default())
    }

    /// `createSVGTransformFromMatrix()`, only on root surfaces.
    pub fn create_svg_transform_from_matrix(
        &self,
        id: NodeId,
        matrix: AffineTransform,
    ) -> Option<SvgTransform> {
        self.surface_capabilities(id)
            .map(|_| SvgTransform::from_matrix(matrix))
    }

    /// `ownerSVGElement`: nearest ancestor root surface.
    pub fn owner_svg_element(&self, id: NodeId) -> Option<NodeId> {
        if self.nodes[id.0].kind == NodeKind::Root {
            return None;
        }
        let mut current = self.parent(id);
        while let Some(p) = current {
            let node = &self.nodes[p.0];
            if node.namespace == SVG_NS && node.kind == NodeKind::Root {
                return Some(p);
            }
            current = node.parent;
        }
        None
    }

    fn surface_capabilities(&self, id: NodeId) -> Option<Capabilities> {
        self.nodes[id.0].capabilities.filter(|c| c.surface)
    }

    // --- serialization ---

    /// Markup of `id` and its subtree.
    pub fn outer_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Markup of the children of `id`, without `id` itself.
    pub fn inner_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push('<');
        out.push_str(&node.tag);
        for (k, v) in &node.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape_attribute(v));
            out.push('"');
        }
        if node.children.is_empty() && node.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape_text(text));
        }
        for &child in &node.children {
            self.write_node(child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn escape_attribute(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
