//! Geometry capabilities attached to SVG nodes of the emulated document.
//!
//! A diagram toolkit written against the browser SVG contract calls
//! `getBBox()`, `getBoundingClientRect()`, `getScreenCTM()` and friends on
//! nodes that were never laid out. The functions here answer those queries
//! from the declared attributes alone. They are plain functions over
//! `(&Document, NodeId)` so they can be tested without an installed
//! environment; [`Capabilities::for_kind`] picks the right ones per node kind.

use super::dom::{Document, NodeId, NodeKind};
use super::matrix::AffineTransform;

/// Width and height assumed for nodes that do not declare them.
pub const DEFAULT_EXTENT: f64 = 100.0;

/// Axis-aligned box in user units. Always finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }.sanitized()
    }

    pub fn default_box() -> Self {
        Self::new(0.0, 0.0, DEFAULT_EXTENT, DEFAULT_EXTENT)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }

    fn sanitized(self) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        Self {
            x: finite_or(self.x, 0.0),
            y: finite_or(self.y, 0.0),
            width: finite_or(self.width, DEFAULT_EXTENT),
            height: finite_or(self.height, DEFAULT_EXTENT),
        }
    }
}

/// Result of `getBoundingClientRect()`: the bounding box plus edge aliases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
}

impl From<BoundingBox> for ClientRect {
    fn from(b: BoundingBox) -> Self {
        ClientRect {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            top: b.y,
            left: b.x,
            right: b.right(),
            bottom: b.bottom(),
        }
    }
}

/// Geometry capability table installed on a node at creation time.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub bounding_box: fn(&Document, NodeId) -> BoundingBox,
    pub screen_ctm: fn(&Document, NodeId) -> AffineTransform,
    pub ctm: fn(&Document, NodeId) -> AffineTransform,
    /// Root surfaces also construct matrices and transforms.
    pub surface: bool,
}

impl Capabilities {
    pub fn for_kind(kind: NodeKind) -> Self {
        let bounding_box = match kind {
            NodeKind::Element => leaf_bounding_box,
            NodeKind::Path => path_bounding_box,
            NodeKind::Group | NodeKind::Root => group_bounding_box,
        };
        Capabilities {
            bounding_box,
            screen_ctm: identity_transform,
            ctm: identity_transform,
            surface: kind == NodeKind::Root,
        }
    }
}

/// No real screen mapping exists headless.
pub fn identity_transform(_doc: &Document, _id: NodeId) -> AffineTransform {
    AffineTransform::identity()
}

/// Box from the node's declared positional attributes.
///
/// `circle`, `ellipse`, `line`, `polyline` and `polygon` use their own
/// positional attributes when present; everything else (and those shapes when
/// their attributes are missing) uses `x`, `y`, `width`, `height` with
/// `width`/`height` defaulting to [`DEFAULT_EXTENT`].
pub fn leaf_bounding_box(doc: &Document, id: NodeId) -> BoundingBox {
    let num = |name: &str| doc.attribute(id, name).and_then(parse_length);

    let shaped = match doc.node(id).tag.as_str() {
        "circle" => match (num("cx"), num("cy"), num("r")) {
            (cx, cy, Some(r)) => {
                let (cx, cy) = (cx.unwrap_or(0.0), cy.unwrap_or(0.0));
                Some(BoundingBox::new(cx - r, cy - r, 2.0 * r, 2.0 * r))
            }
            _ => None,
        },
        "ellipse" => match (num("rx"), num("ry")) {
            (Some(rx), Some(ry)) => {
                let (cx, cy) = (num("cx").unwrap_or(0.0), num("cy").unwrap_or(0.0));
                Some(BoundingBox::new(cx - rx, cy - ry, 2.0 * rx, 2.0 * ry))
            }
            _ => None,
        },
        "line" => match (num("x1"), num("y1"), num("x2"), num("y2")) {
            (Some(x1), Some(y1), Some(x2), Some(y2)) => Some(BoundingBox::new(
                x1.min(x2),
                y1.min(y2),
                (x2 - x1).abs(),
                (y2 - y1).abs(),
            )),
            _ => None,
        },
        "polyline" | "polygon" => doc
            .attribute(id, "points")
            .and_then(|points| extents_of(&scan_numbers(points))),
        _ => None,
    };

    shaped.unwrap_or_else(|| declared_box(doc, id))
}

/// Box from the numeric data of a path's `d` attribute, read pairwise.
///
/// Fewer than two numbers yields the default box; a dimension that collapses
/// to zero is replaced by [`DEFAULT_EXTENT`].
pub fn path_bounding_box(doc: &Document, id: NodeId) -> BoundingBox {
    let numbers = doc.attribute(id, "d").map(scan_numbers).unwrap_or_default();
    match extents_of(&numbers) {
        Some(b) => b,
        None => {
            log::trace!("path {:?} has no usable coordinates; using default box", id);
            BoundingBox::default_box()
        }
    }
}

/// Union of every descendant box reachable now; the node's own declared
/// attributes when no descendant has one.
pub fn group_bounding_box(doc: &Document, id: NodeId) -> BoundingBox {
    let union = doc
        .children(id)
        .iter()
        .filter_map(|&child| doc.bounding_box(child))
        .reduce(|acc, b| acc.union(&b));
    union.unwrap_or_else(|| declared_box(doc, id))
}

fn declared_box(doc: &Document, id: NodeId) -> BoundingBox {
    let num = |name: &str| doc.attribute(id, name).and_then(parse_length);
    BoundingBox::new(
        num("x").unwrap_or(0.0),
        num("y").unwrap_or(0.0),
        num("width").unwrap_or(DEFAULT_EXTENT),
        num("height").unwrap_or(DEFAULT_EXTENT),
    )
}

fn extents_of(numbers: &[f64]) -> Option<BoundingBox> {
    if numbers.len() < 2 {
        return None;
    }
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for pair in numbers.chunks_exact(2) {
        min_x = min_x.min(pair[0]);
        max_x = max_x.max(pair[0]);
        min_y = min_y.min(pair[1]);
        max_y = max_y.max(pair[1]);
    }
    let width = max_x - min_x;
    let height = max_y - min_y;
    Some(BoundingBox::new(
        min_x,
        min_y,
        if width > 0.0 { width } else { DEFAULT_EXTENT },
        if height > 0.0 { height } else { DEFAULT_EXTENT },
    ))
}

/// Leading number of an attribute value such as `"12.5"` or `"40px"`.
pub fn parse_length(value: &str) -> Option<f64> {
    scan_numbers(value).first().copied()
}

/// All numbers in `text`, in order. Command letters, commas, whitespace and
/// unit suffixes act as separators; a sign or a second decimal point starts a
/// new number, as in SVG path data (`"M10-20.5.5"` → `10, -20.5, 0.5`).
pub fn scan_numbers(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let starts_number = c.is_ascii_digit()
            || c == b'.' && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit())
            || (c == b'-' || c == b'+')
                && bytes
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_digit() || *n == b'.');
        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        if c == b'-' || c == b'+' {
            i += 1;
        }
        let mut seen_dot = false;
        while i < bytes.len() {
            match bytes[i] {
                b'0'..=b'9' => i += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    i += 1;
                }
                _ => break,
            }
        }
        // exponent, only when followed by digits
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                i = j;
            }
        }
        if let Ok(v) = text[start..i].parse::<f64>() {
            if v.is_finite() {
                out.push(v);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::SVG_NS;

    fn rect(doc: &mut Document, parent: NodeId, x: f64, y: f64, w: f64, h: f64) -> NodeId {
        let r = doc.create_element_ns(SVG_NS, "rect");
        doc.set_attribute(r, "x", &x.to_string());
        doc.set_attribute(r, "y", &y.to_string());
        doc.set_attribute(r, "width", &w.to_string());
        doc.set_attribute(r, "height", &h.to_string());
        doc.append_child(parent, r);
        r
    }

    #[test]
    fn group_of_two_leaves_is_their_union() {
        let mut doc = Document::new();
        let g = doc.create_element_ns(SVG_NS, "g");
        rect(&mut doc, g, 0.0, 0.0, 10.0, 10.0);
        rect(&mut doc, g, 20.0, 20.0, 5.0, 5.0);
        assert_eq!(doc.bounding_box(g), Some(BoundingBox::new(0.0, 0.0, 25.0, 25.0)));
    }

    #[test]
    fn group_union_reflects_mutation_at_query_time() {
        let mut doc = Document::new();
        let g = doc.create_element_ns(SVG_NS, "g");
        let r = rect(&mut doc, g, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(doc.bounding_box(g).map(|b| b.width), Some(10.0));
        doc.set_attribute(r, "width", "40");
        assert_eq!(doc.bounding_box(g).map(|b| b.width), Some(40.0));
    }

    #[test]
    fn nested_groups_union_recursively() {
        let mut doc = Document::new();
        let outer = doc.create_element_ns(SVG_NS, "g");
        let inner = doc.create_element_ns(SVG_NS, "g");
        doc.append_child(outer, inner);
        rect(&mut doc, inner, -5.0, 10.0, 10.0, 10.0);
        rect(&mut doc, outer, 30.0, 0.0, 10.0, 5.0);
        assert_eq!(
            doc.bounding_box(outer),
            Some(BoundingBox::new(-5.0, 0.0, 45.0, 20.0))
        );
    }

    #[test]
    fn empty_group_falls_back_to_declared_attributes() {
        let mut doc = Document::new();
        let g = doc.create_element_ns(SVG_NS, "g");
        assert_eq!(doc.bounding_box(g), Some(BoundingBox::default_box()));
        doc.set_attribute(g, "x", "7");
        doc.set_attribute(g, "width", "3");
        assert_eq!(doc.bounding_box(g), Some(BoundingBox::new(7.0, 0.0, 3.0, 100.0)));
    }

    #[test]
    fn leaf_defaults_width_and_height() {
        let mut doc = Document::new();
        let t = doc.create_element_ns(SVG_NS, "text");
        doc.set_attribute(t, "x", "12");
        doc.set_attribute(t, "y", "8px");
        assert_eq!(doc.bounding_box(t), Some(BoundingBox::new(12.0, 8.0, 100.0, 100.0)));
    }

    #[test]
    fn circle_uses_center_and_radius() {
        let mut doc = Document::new();
        let c = doc.create_element_ns(SVG_NS, "circle");
        doc.set_attribute(c, "cx", "50");
        doc.set_attribute(c, "cy", "40");
        doc.set_attribute(c, "r", "18");
        assert_eq!(doc.bounding_box(c), Some(BoundingBox::new(32.0, 22.0, 36.0, 36.0)));
    }

    #[test]
    fn path_extents_come_from_coordinate_pairs() {
        let mut doc = Document::new();
        let p = doc.create_element_ns(SVG_NS, "path");
        doc.set_attribute(p, "d", "M 10 20 L 110 70");
        assert_eq!(doc.bounding_box(p), Some(BoundingBox::new(10.0, 20.0, 100.0, 50.0)));
    }

    #[test]
    fn path_with_too_few_numbers_uses_default_box() {
        let mut doc = Document::new();
        let p = doc.create_element_ns(SVG_NS, "path");
        assert_eq!(doc.bounding_box(p), Some(BoundingBox::default_box()));
        doc.set_attribute(p, "d", "M 5");
        assert_eq!(doc.bounding_box(p), Some(BoundingBox::default_box()));
    }

    #[test]
    fn collapsed_path_dimension_becomes_default_extent() {
        let mut doc = Document::new();
        let p = doc.create_element_ns(SVG_NS, "path");
        doc.set_attribute(p, "d", "M0,50L200,50");
        assert_eq!(doc.bounding_box(p), Some(BoundingBox::new(0.0, 50.0, 200.0, 100.0)));
        doc.set_attribute(p, "d", "M 0 0");
        assert_eq!(doc.bounding_box(p), Some(BoundingBox::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn client_rect_aliases_bounding_box() {
        let mut doc = Document::new();
        let g = doc.create_element_ns(SVG_NS, "g");
        rect(&mut doc, g, 10.0, 20.0, 30.0, 40.0);
        let r = doc.bounding_client_rect(g).unwrap();
        assert_eq!((r.left, r.top, r.right, r.bottom), (10.0, 20.0, 40.0, 60.0));
        assert_eq!((r.x, r.y, r.width, r.height), (10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn scan_numbers_handles_compact_path_syntax() {
        assert_eq!(scan_numbers("M10-20.5.5"), vec![10.0, -20.5, 0.5]);
        assert_eq!(scan_numbers("l1e2,3E-1"), vec![100.0, 0.3]);
        assert_eq!(scan_numbers("M 1 2 Z"), vec![1.0, 2.0]);
        assert!(scan_numbers("none").is_empty());
    }
}
