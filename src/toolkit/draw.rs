//! SVG visuals for BPMN elements, drawn into the emulated document.
//!
//! All coordinates are absolute diagram coordinates and paths only use the
//! `M`, `L` and `Z` commands, so every visual answers the environment's
//! bounding-box queries without transforms.

use super::model::{
    Bounds, DiEdge, DiShape, ElementKind, EventMarker, EventPosition, GatewayKind,
    SemanticElement, TaskKind,
};
use crate::environment::{Document, NodeId, SVG_NS};

pub const STROKE: &str = "#22242a";
pub const FILL: &str = "white";
pub const FONT_SIZE: f64 = 12.0;
pub const LINE_HEIGHT: f64 = FONT_SIZE * 1.2;

/// Width of an external label box (events, gateways, flows, data).
const EXTERNAL_LABEL_WIDTH: f64 = 90.0;
/// Width of the title band of pools and lanes.
const BAND_WIDTH: f64 = 30.0;
/// Average glyph advance relative to the font size.
const GLYPH_ADVANCE: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    /// Centered both ways
    Center,
    /// Left aligned, starting at the top
    TopLeft,
}

/// Format a coordinate with at most two decimals.
pub fn num(v: f64) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        "0".to_string()
    } else {
        r.to_string()
    }
}

/// Greedy word wrap into lines of at most `max_width` estimated pixels.
/// A single word wider than the line stays on a line of its own.
pub fn wrap_text(text: &str, max_width: f64) -> Vec<String> {
    let max_chars = ((max_width / (FONT_SIZE * GLYPH_ADVANCE)).floor() as usize).max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn polyline(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, (x, y))| format!("{} {} {}", if i == 0 { "M" } else { "L" }, num(*x), num(*y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn polygon(points: &[(f64, f64)]) -> String {
    format!("{} Z", polyline(points))
}

/// Writes visuals for one diagram into the document.
pub struct Painter<'a> {
    doc: &'a mut Document,
    font_family: &'a str,
}

impl<'a> Painter<'a> {
    pub fn new(doc: &'a mut Document, font_family: &'a str) -> Self {
        Painter { doc, font_family }
    }

    /// Append the arrow markers used by flows to `defs`.
    pub fn markers(&mut self, defs: NodeId) {
        let specs: [(&str, &str, &str, &str, &str); 5] = [
            ("sequenceflow-end", "11", "10", "M 1 5 L 11 10 L 1 15 Z", STROKE),
            ("messageflow-end", "8.5", "5", "M 1 5 L 1 2 L 8 5 L 1 8 Z", FILL),
            ("association-end", "11", "10", "M 1 5 L 11 10 L 1 15", "none"),
            ("conditional-default-flow-marker", "-5", "10", "M 6 4 L 10 16", "none"),
            ("messageflow-start", "6", "6", "", FILL),
        ];
        for (id, ref_x, ref_y, d, fill) in specs {
            let marker = self.element(
                defs,
                "marker",
                &[
                    ("id", id.to_string()),
                    ("viewBox", "0 0 20 20".to_string()),
                    ("refX", ref_x.to_string()),
                    ("refY", ref_y.to_string()),
                    ("markerWidth", "10".to_string()),
                    ("markerHeight", "10".to_string()),
                    ("orient", "auto".to_string()),
                ],
            );
            if d.is_empty() {
                self.element(
                    marker,
                    "circle",
                    &[
                        ("cx", "6".to_string()),
                        ("cy", "6".to_string()),
                        ("r", "3.5".to_string()),
                        ("fill", fill.to_string()),
                        ("stroke", STROKE.to_string()),
                        ("stroke-width", "1".to_string()),
                    ],
                );
            } else {
                self.element(
                    marker,
                    "path",
                    &[
                        ("d", d.to_string()),
                        ("fill", fill.to_string()),
                        ("stroke", STROKE.to_string()),
                        ("stroke-width", "1".to_string()),
                        ("stroke-linecap", "round".to_string()),
                    ],
                );
            }
        }
    }

    /// Draw a shape as `g.djs-element > g.djs-visual`.
    pub fn shape(&mut self, layer: NodeId, element: &SemanticElement, shape: &DiShape) -> NodeId {
        let (group, visual) = self.element_group(layer, &element.id, "djs-shape");
        let b = shape.bounds;
        match &element.kind {
            ElementKind::Event { position, marker, interrupting } => {
                self.event(visual, b, *position, *marker, *interrupting);
                self.external_label(visual, element, b, shape.label);
            }
            ElementKind::Task(kind) => {
                self.activity_box(visual, b, 2.0);
                self.task_icon(visual, b, *kind);
                self.label(visual, element.label(), b, Align::Center);
            }
            ElementKind::SubProcess => {
                self.activity_box(visual, b, 2.0);
                if shape.is_expanded == Some(true) {
                    self.label(visual, element.label(), b, Align::TopLeft);
                } else {
                    self.collapsed_marker(visual, b);
                    self.label(visual, element.label(), b, Align::Center);
                }
            }
            ElementKind::CallActivity => {
                self.activity_box(visual, b, 5.0);
                if shape.is_expanded != Some(true) {
                    self.collapsed_marker(visual, b);
                }
                self.label(visual, element.label(), b, Align::Center);
            }
            ElementKind::Gateway(kind) => {
                self.gateway(visual, b, *kind);
                self.external_label(visual, element, b, shape.label);
            }
            ElementKind::Participant | ElementKind::Lane => {
                self.rect(visual, b, 0.0, 1.5, FILL, &[]);
                let band_x = b.x + BAND_WIDTH;
                self.path(visual, &polyline(&[(band_x, b.y), (band_x, b.bottom())]), 1.5, "none", &[]);
                self.band_title(visual, element.label(), b);
            }
            ElementKind::TextAnnotation => {
                let d = polyline(&[
                    (b.x + 10.0, b.y),
                    (b.x, b.y),
                    (b.x, b.bottom()),
                    (b.x + 10.0, b.bottom()),
                ]);
                self.path(visual, &d, 1.0, "none", &[]);
                self.label(visual, element.label(), b, Align::TopLeft);
            }
            ElementKind::DataObject => {
                self.data_object(visual, b);
                self.external_label(visual, element, b, shape.label);
            }
            ElementKind::DataStore => {
                self.data_store(visual, b);
                self.external_label(visual, element, b, shape.label);
            }
            ElementKind::SequenceFlow
            | ElementKind::MessageFlow
            | ElementKind::Association
            | ElementKind::DataAssociation
            | ElementKind::Other(_) => {
                log::debug!("drawing <{}> as a generic shape", element.id);
                self.rect(visual, b, 0.0, 1.0, "none", &[("stroke-dasharray", "4")]);
                self.label(visual, element.label(), b, Align::Center);
            }
        }
        group
    }

    /// Draw a connection as a polyline through its waypoints.
    pub fn edge(
        &mut self,
        layer: NodeId,
        element: &SemanticElement,
        edge: &DiEdge,
        is_default: bool,
    ) -> NodeId {
        let (group, visual) = self.element_group(layer, &element.id, "djs-connection");
        let d = polyline(&edge.waypoints);
        match element.kind {
            ElementKind::SequenceFlow => {
                let mut extra = vec![("marker-end", "url(#sequenceflow-end)")];
                if is_default {
                    extra.push(("marker-start", "url(#conditional-default-flow-marker)"));
                }
                self.path(visual, &d, 1.5, "none", &extra);
            }
            ElementKind::MessageFlow => {
                self.path(
                    visual,
                    &d,
                    1.5,
                    "none",
                    &[
                        ("stroke-dasharray", "10, 11"),
                        ("marker-start", "url(#messageflow-start)"),
                        ("marker-end", "url(#messageflow-end)"),
                    ],
                );
            }
            ElementKind::Association => {
                self.path(
                    visual,
                    &d,
                    1.5,
                    "none",
                    &[("stroke-dasharray", "0.5, 5"), ("stroke-linecap", "round")],
                );
            }
            ElementKind::DataAssociation => {
                self.path(
                    visual,
                    &d,
                    1.5,
                    "none",
                    &[
                        ("stroke-dasharray", "0.5, 5"),
                        ("stroke-linecap", "round"),
                        ("marker-end", "url(#association-end)"),
                    ],
                );
            }
            _ => {
                self.path(visual, &d, 1.0, "none", &[]);
            }
        }

        if let Some(text) = element.label() {
            let lines = wrap_text(text, EXTERNAL_LABEL_WIDTH);
            let height = lines.len() as f64 * LINE_HEIGHT;
            let label = edge.label.unwrap_or_else(|| {
                let mid = edge.waypoints.len() / 2;
                let (x1, y1) = edge.waypoints[mid - 1];
                let (x2, y2) = edge.waypoints[mid];
                let (mx, my) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
                Bounds {
                    x: mx - EXTERNAL_LABEL_WIDTH / 2.0,
                    y: my - height - 5.0,
                    width: EXTERNAL_LABEL_WIDTH,
                    height,
                }
            });
            self.text_block(visual, &lines, label, Align::Center, None);
        }
        group
    }

    fn element_group(&mut self, layer: NodeId, element_id: &str, class: &str) -> (NodeId, NodeId) {
        let group = self.element(layer, "g", &[("data-element-id", element_id.to_string())]);
        self.doc.add_class(group, "djs-element");
        self.doc.add_class(group, class);
        let visual = self.element(group, "g", &[]);
        self.doc.add_class(visual, "djs-visual");
        (group, visual)
    }

    fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, String)]) -> NodeId {
        let id = self.doc.create_element_ns(SVG_NS, tag);
        for (name, value) in attrs {
            self.doc.set_attribute(id, name, value);
        }
        self.doc.append_child(parent, id);
        id
    }

    fn rect(
        &mut self,
        parent: NodeId,
        b: Bounds,
        radius: f64,
        stroke_width: f64,
        fill: &str,
        extra: &[(&str, &str)],
    ) -> NodeId {
        let mut attrs = vec![
            ("x", num(b.x)),
            ("y", num(b.y)),
            ("width", num(b.width)),
            ("height", num(b.height)),
            ("rx", num(radius)),
            ("ry", num(radius)),
            ("fill", fill.to_string()),
            ("stroke", STROKE.to_string()),
            ("stroke-width", num(stroke_width)),
        ];
        attrs.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        self.element(parent, "rect", &attrs)
    }

    fn circle(
        &mut self,
        parent: NodeId,
        (cx, cy): (f64, f64),
        r: f64,
        stroke_width: f64,
        fill: &str,
        extra: &[(&str, &str)],
    ) -> NodeId {
        let mut attrs = vec![
            ("cx", num(cx)),
            ("cy", num(cy)),
            ("r", num(r)),
            ("fill", fill.to_string()),
            ("stroke", STROKE.to_string()),
            ("stroke-width", num(stroke_width)),
        ];
        attrs.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        self.element(parent, "circle", &attrs)
    }

    fn path(
        &mut self,
        parent: NodeId,
        d: &str,
        stroke_width: f64,
        fill: &str,
        extra: &[(&str, &str)],
    ) -> NodeId {
        let mut attrs = vec![
            ("d", d.to_string()),
            ("fill", fill.to_string()),
            ("stroke", STROKE.to_string()),
            ("stroke-width", num(stroke_width)),
        ];
        attrs.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        self.element(parent, "path", &attrs)
    }

    fn activity_box(&mut self, parent: NodeId, b: Bounds, stroke_width: f64) {
        self.rect(parent, b, 10.0, stroke_width, FILL, &[]);
    }

    fn collapsed_marker(&mut self, parent: NodeId, b: Bounds) {
        let (cx, _) = b.center();
        let marker = Bounds { x: cx - 7.0, y: b.bottom() - 18.0, width: 14.0, height: 14.0 };
        self.rect(parent, marker, 0.0, 1.0, FILL, &[]);
        let my = marker.y + 7.0;
        let d = format!(
            "{} {}",
            polyline(&[(cx - 4.0, my), (cx + 4.0, my)]),
            polyline(&[(cx, my - 4.0), (cx, my + 4.0)])
        );
        self.path(parent, &d, 1.5, "none", &[]);
    }

    fn event(
        &mut self,
        parent: NodeId,
        b: Bounds,
        position: EventPosition,
        marker: EventMarker,
        interrupting: bool,
    ) {
        let center = b.center();
        let r = b.width.min(b.height) / 2.0;
        let dash: &[(&str, &str)] = if interrupting { &[] } else { &[("stroke-dasharray", "6")] };
        match position {
            EventPosition::Start => {
                self.circle(parent, center, r, 2.0, FILL, dash);
            }
            EventPosition::End => {
                self.circle(parent, center, r, 4.0, FILL, &[]);
            }
            EventPosition::IntermediateCatch
            | EventPosition::IntermediateThrow
            | EventPosition::Boundary => {
                self.circle(parent, center, r, 1.5, FILL, dash);
                self.circle(parent, center, r - 3.0, 1.5, "none", dash);
            }
        }
        let filled = matches!(position, EventPosition::End | EventPosition::IntermediateThrow);
        self.event_marker(parent, center, r, marker, filled);
    }

    fn event_marker(
        &mut self,
        parent: NodeId,
        (cx, cy): (f64, f64),
        r: f64,
        marker: EventMarker,
        filled: bool,
    ) {
        let fill = if filled { STROKE } else { FILL };
        match marker {
            EventMarker::Message => {
                let envelope = Bounds { x: cx - r * 0.5, y: cy - r * 0.35, width: r, height: r * 0.7 };
                self.envelope(parent, envelope, filled);
            }
            EventMarker::Timer => {
                self.circle(parent, (cx, cy), r * 0.6, 2.0, FILL, &[]);
                let d = polyline(&[(cx, cy - r * 0.45), (cx, cy), (cx + r * 0.3, cy)]);
                self.path(parent, &d, 1.5, "none", &[]);
            }
            EventMarker::Signal => {
                let d = polygon(&[
                    (cx, cy - r * 0.5),
                    (cx + r * 0.45, cy + r * 0.3),
                    (cx - r * 0.45, cy + r * 0.3),
                ]);
                self.path(parent, &d, 1.0, fill, &[]);
            }
            EventMarker::Error => {
                let d = polygon(&[
                    (cx - r * 0.4, cy + r * 0.45),
                    (cx - r * 0.15, cy - r * 0.45),
                    (cx + r * 0.1, cy + r * 0.05),
                    (cx + r * 0.4, cy - r * 0.45),
                    (cx + r * 0.15, cy + r * 0.45),
                    (cx - r * 0.1, cy - r * 0.05),
                ]);
                self.path(parent, &d, 1.0, fill, &[]);
            }
            EventMarker::Terminate => {
                self.circle(parent, (cx, cy), r * 0.6, 4.0, STROKE, &[]);
            }
            EventMarker::None | EventMarker::Other => {}
        }
    }

    fn envelope(&mut self, parent: NodeId, b: Bounds, filled: bool) {
        let (fill, flap) = if filled { (STROKE, FILL) } else { (FILL, STROKE) };
        let body = polygon(&[
            (b.x, b.y),
            (b.x + b.width, b.y),
            (b.x + b.width, b.bottom()),
            (b.x, b.bottom()),
        ]);
        self.path(parent, &body, 1.0, fill, &[]);
        let d = polyline(&[(b.x, b.y), (b.x + b.width / 2.0, b.y + b.height / 2.0), (b.x + b.width, b.y)]);
        self.path(parent, &d, 1.0, "none", &[("stroke", flap)]);
    }

    fn task_icon(&mut self, parent: NodeId, b: Bounds, kind: TaskKind) {
        let (x, y) = (b.x, b.y);
        match kind {
            TaskKind::User => {
                self.circle(parent, (x + 15.0, y + 12.0), 4.0, 1.0, FILL, &[]);
                let d = polygon(&[(x + 8.0, y + 25.0), (x + 9.0, y + 19.0), (x + 21.0, y + 19.0), (x + 22.0, y + 25.0)]);
                self.path(parent, &d, 1.0, FILL, &[]);
            }
            TaskKind::Service => {
                self.circle(parent, (x + 15.0, y + 17.0), 7.0, 1.5, FILL, &[("stroke-dasharray", "3, 1.5")]);
                self.circle(parent, (x + 15.0, y + 17.0), 2.5, 1.0, FILL, &[]);
            }
            TaskKind::Script => {
                let mut d = polygon(&[(x + 9.0, y + 9.0), (x + 21.0, y + 9.0), (x + 21.0, y + 25.0), (x + 9.0, y + 25.0)]);
                for row in [14.0, 18.0, 22.0] {
                    d.push(' ');
                    d.push_str(&polyline(&[(x + 12.0, y + row), (x + 18.0, y + row)]));
                }
                self.path(parent, &d, 1.0, FILL, &[]);
            }
            TaskKind::BusinessRule => {
                let table = Bounds { x: x + 8.0, y: y + 10.0, width: 18.0, height: 13.0 };
                self.rect(parent, table, 0.0, 1.0, FILL, &[]);
                let d = format!(
                    "{} {}",
                    polyline(&[(table.x, table.y + 4.0), (table.x + table.width, table.y + 4.0)]),
                    polyline(&[(table.x + 5.0, table.y + 4.0), (table.x + 5.0, table.bottom())])
                );
                self.path(parent, &d, 1.0, "none", &[]);
            }
            TaskKind::Send | TaskKind::Receive => {
                let envelope = Bounds { x: x + 8.0, y: y + 10.0, width: 18.0, height: 12.0 };
                self.envelope(parent, envelope, kind == TaskKind::Send);
            }
            TaskKind::Plain | TaskKind::Manual => {}
        }
    }

    fn gateway(&mut self, parent: NodeId, b: Bounds, kind: GatewayKind) {
        let (cx, cy) = b.center();
        let diamond = polygon(&[(cx, b.y), (b.x + b.width, cy), (cx, b.bottom()), (b.x, cy)]);
        self.path(parent, &diamond, 2.0, FILL, &[]);

        let (dx, dy) = (b.width * 0.15, b.height * 0.15);
        let cross = format!(
            "{} {}",
            polyline(&[(cx - dx, cy - dy), (cx + dx, cy + dy)]),
            polyline(&[(cx + dx, cy - dy), (cx - dx, cy + dy)])
        );
        let (px, py) = (b.width * 0.2, b.height * 0.2);
        let plus = format!(
            "{} {}",
            polyline(&[(cx - px, cy), (cx + px, cy)]),
            polyline(&[(cx, cy - py), (cx, cy + py)])
        );
        match kind {
            GatewayKind::Exclusive => {
                self.path(parent, &cross, 3.0, "none", &[]);
            }
            GatewayKind::Parallel => {
                self.path(parent, &plus, 3.0, "none", &[]);
            }
            GatewayKind::Complex => {
                self.path(parent, &format!("{} {}", cross, plus), 3.0, "none", &[]);
            }
            GatewayKind::Inclusive => {
                self.circle(parent, (cx, cy), b.width * 0.24, 2.5, "none", &[]);
            }
            GatewayKind::EventBased => {
                self.circle(parent, (cx, cy), b.width * 0.2, 1.0, "none", &[]);
                self.circle(parent, (cx, cy), b.width * 0.16, 1.0, "none", &[]);
                let s = b.width * 0.1;
                let pentagon = polygon(&[
                    (cx, cy - s),
                    (cx + s * 0.95, cy - s * 0.31),
                    (cx + s * 0.59, cy + s * 0.81),
                    (cx - s * 0.59, cy + s * 0.81),
                    (cx - s * 0.95, cy - s * 0.31),
                ]);
                self.path(parent, &pentagon, 1.0, "none", &[]);
            }
        }
    }

    fn data_object(&mut self, parent: NodeId, b: Bounds) {
        let fold = 10.0_f64.min(b.width / 2.0);
        let right = b.x + b.width;
        let outline = polygon(&[
            (b.x, b.y),
            (right - fold, b.y),
            (right, b.y + fold),
            (right, b.bottom()),
            (b.x, b.bottom()),
        ]);
        self.path(parent, &outline, 1.5, FILL, &[]);
        let corner = polyline(&[(right - fold, b.y), (right - fold, b.y + fold), (right, b.y + fold)]);
        self.path(parent, &corner, 1.5, "none", &[]);
    }

    fn data_store(&mut self, parent: NodeId, b: Bounds) {
        let ry = (b.height * 0.15).min(10.0);
        let (cx, _) = b.center();
        let rx = b.width / 2.0;
        let body = Bounds { x: b.x, y: b.y + ry, width: b.width, height: b.height - 2.0 * ry };
        // the body hides the upper half of the bottom ellipse
        self.ellipse(parent, (cx, b.bottom() - ry), rx, ry);
        self.rect(parent, body, 0.0, 0.0, FILL, &[("stroke", "none")]);
        let sides = format!(
            "{} {}",
            polyline(&[(b.x, b.y + ry), (b.x, b.bottom() - ry)]),
            polyline(&[(b.x + b.width, b.y + ry), (b.x + b.width, b.bottom() - ry)])
        );
        self.path(parent, &sides, 1.5, "none", &[]);
        self.ellipse(parent, (cx, b.y + ry), rx, ry);
    }

    fn ellipse(&mut self, parent: NodeId, (cx, cy): (f64, f64), rx: f64, ry: f64) {
        self.element(
            parent,
            "ellipse",
            &[
                ("cx", num(cx)),
                ("cy", num(cy)),
                ("rx", num(rx)),
                ("ry", num(ry)),
                ("fill", FILL.to_string()),
                ("stroke", STROKE.to_string()),
                ("stroke-width", "1.5".to_string()),
            ],
        );
    }

    /// Label inside `b`.
    fn label(&mut self, parent: NodeId, text: Option<&str>, b: Bounds, align: Align) {
        let Some(text) = text else { return };
        let lines = wrap_text(text, b.width - 10.0);
        self.text_block(parent, &lines, b, align, None);
    }

    /// Label below a shape, or in the box given by the diagram.
    fn external_label(
        &mut self,
        parent: NodeId,
        element: &SemanticElement,
        b: Bounds,
        di_label: Option<Bounds>,
    ) {
        let Some(text) = element.label() else { return };
        let lines = wrap_text(text, EXTERNAL_LABEL_WIDTH);
        let label = di_label.unwrap_or_else(|| {
            let (cx, _) = b.center();
            Bounds {
                x: cx - EXTERNAL_LABEL_WIDTH / 2.0,
                y: b.bottom() + 5.0,
                width: EXTERNAL_LABEL_WIDTH,
                height: lines.len() as f64 * LINE_HEIGHT,
            }
        });
        self.text_block(parent, &lines, label, Align::Center, None);
    }

    /// Title rotated into the band on the left of a pool or lane.
    fn band_title(&mut self, parent: NodeId, text: Option<&str>, b: Bounds) {
        let Some(text) = text else { return };
        let band = Bounds { x: b.x, y: b.y, width: BAND_WIDTH, height: b.height };
        let lines = wrap_text(text, b.height - 10.0);
        let (cx, cy) = band.center();
        let rotation = format!("rotate(-90 {} {})", num(cx), num(cy));
        // lay out horizontally around the band center, then rotate in place
        let horizontal = Bounds {
            x: cx - b.height / 2.0,
            y: cy - BAND_WIDTH / 2.0,
            width: b.height,
            height: BAND_WIDTH,
        };
        let title = self.text_block(parent, &lines, horizontal, Align::Center, Some(rotation));
        if let Some(text_node) = title {
            for (name, value) in [("x", band.x), ("y", band.y), ("width", band.width), ("height", band.height)] {
                self.doc.set_attribute(text_node, name, &num(value));
            }
        }
    }

    fn text_block(
        &mut self,
        parent: NodeId,
        lines: &[String],
        b: Bounds,
        align: Align,
        transform: Option<String>,
    ) -> Option<NodeId> {
        if lines.is_empty() {
            return None;
        }
        let mut attrs = vec![
            ("x", num(b.x)),
            ("y", num(b.y)),
            ("width", num(b.width)),
            ("height", num(b.height)),
            ("font-family", self.font_family.to_string()),
            ("font-size", format!("{}px", num(FONT_SIZE))),
            ("fill", STROKE.to_string()),
            (
                "text-anchor",
                match align {
                    Align::Center => "middle",
                    Align::TopLeft => "start",
                }
                .to_string(),
            ),
        ];
        if let Some(transform) = transform {
            attrs.push(("transform", transform));
        }
        let text = self.element(parent, "text", &attrs);
        self.doc.add_class(text, "djs-label");

        let (cx, cy) = b.center();
        let (line_x, first_y) = match align {
            Align::Center => (
                cx,
                cy - (lines.len() - 1) as f64 * LINE_HEIGHT / 2.0 + FONT_SIZE * 0.35,
            ),
            Align::TopLeft => (b.x + 5.0, b.y + 5.0 + FONT_SIZE),
        };
        for (i, line) in lines.iter().enumerate() {
            let tspan = self.element(
                text,
                "tspan",
                &[("x", num(line_x)), ("y", num(first_y + i as f64 * LINE_HEIGHT))],
            );
            self.doc.set_text(tspan, line);
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, name: &str) -> SemanticElement {
        SemanticElement {
            id: id.to_string(),
            kind: ElementKind::Task(TaskKind::Plain),
            name: Some(name.to_string()),
            text: None,
        }
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(num(150.0), "150");
        assert_eq!(num(12.346), "12.35");
        assert_eq!(num(-0.001), "0");
    }

    #[test]
    fn wraps_on_word_boundaries() {
        // 12px font at 0.55 advance fits 9 chars in 60px
        let lines = wrap_text("Check the incoming order", 60.0);
        assert_eq!(lines, vec!["Check the", "incoming", "order"]);
        assert_eq!(wrap_text("Supercalifragilistic", 30.0), vec!["Supercalifragilistic"]);
        assert!(wrap_text("   ", 100.0).is_empty());
    }

    #[test]
    fn task_group_box_covers_shape_and_label() {
        let mut doc = Document::new();
        let layer = doc.create_element_ns(SVG_NS, "g");
        let shape = DiShape {
            element: "t".to_string(),
            bounds: Bounds { x: 200.0, y: 80.0, width: 100.0, height: 80.0 },
            is_expanded: None,
            label: None,
        };
        let group = Painter::new(&mut doc, "Arial").shape(layer, &task("t", "Check order"), &shape);

        assert!(doc.has_class(group, "djs-element"));
        assert_eq!(doc.attribute(group, "data-element-id"), Some("t"));
        let bbox = doc.bounding_box(group).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (200.0, 80.0, 100.0, 80.0));
        let labels = doc.query_by_class(group, "djs-label");
        assert_eq!(labels.len(), 1);
        assert!(doc.outer_xml(labels[0]).contains(">Check order</tspan>"));
    }

    #[test]
    fn sequence_flow_uses_arrow_and_default_marker() {
        let mut doc = Document::new();
        let layer = doc.create_element_ns(SVG_NS, "g");
        let flow = SemanticElement {
            id: "f".to_string(),
            kind: ElementKind::SequenceFlow,
            name: None,
            text: None,
        };
        let edge = DiEdge {
            element: "f".to_string(),
            waypoints: vec![(10.0, 20.0), (110.0, 20.0), (110.0, 70.0)],
            label: None,
        };
        let group = Painter::new(&mut doc, "Arial").edge(layer, &flow, &edge, true);
        let xml = doc.outer_xml(group);
        assert!(xml.contains(r#"d="M 10 20 L 110 20 L 110 70""#));
        assert!(xml.contains("url(#sequenceflow-end)"));
        assert!(xml.contains("url(#conditional-default-flow-marker)"));
        let bbox = doc.bounding_box(group).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (10.0, 20.0, 100.0, 50.0));
    }

    #[test]
    fn end_event_label_sits_below_the_circle() {
        let mut doc = Document::new();
        let layer = doc.create_element_ns(SVG_NS, "g");
        let end = SemanticElement {
            id: "e".to_string(),
            kind: ElementKind::Event {
                position: EventPosition::End,
                marker: EventMarker::Terminate,
                interrupting: true,
            },
            name: Some("Done".to_string()),
            text: None,
        };
        let shape = DiShape {
            element: "e".to_string(),
            bounds: Bounds { x: 400.0, y: 100.0, width: 36.0, height: 36.0 },
            is_expanded: None,
            label: None,
        };
        let group = Painter::new(&mut doc, "Arial").shape(layer, &end, &shape);
        let label = doc.query_by_class(group, "djs-label")[0];
        assert_eq!(doc.attribute(label, "y"), Some("141"));
        assert_eq!(doc.attribute(label, "x"), Some("373"));
        let bbox = doc.bounding_box(group).unwrap();
        assert_eq!(bbox.y, 100.0);
        assert_eq!(bbox.x, 373.0);
    }
}
