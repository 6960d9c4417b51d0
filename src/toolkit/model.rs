//! BPMN semantic elements and diagram-interchange geometry, read with `roxmltree`.

use crate::{Error, Result};
use roxmltree::Node;
use std::collections::{HashMap, HashSet};

pub use crate::validate::BPMN_MODEL_NS as BPMN_NS;
pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";

/// Default shape size when a `dc:Bounds` omits width or height.
const DEFAULT_SHAPE_WIDTH: f64 = 100.0;
const DEFAULT_SHAPE_HEIGHT: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Plain,
    User,
    Service,
    Manual,
    Script,
    BusinessRule,
    Send,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    EventBased,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPosition {
    Start,
    IntermediateCatch,
    IntermediateThrow,
    Boundary,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMarker {
    None,
    Message,
    Timer,
    Signal,
    Error,
    Terminate,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Event {
        position: EventPosition,
        marker: EventMarker,
        interrupting: bool,
    },
    Task(TaskKind),
    SubProcess,
    CallActivity,
    Gateway(GatewayKind),
    Participant,
    Lane,
    TextAnnotation,
    DataObject,
    DataStore,
    SequenceFlow,
    MessageFlow,
    Association,
    DataAssociation,
    /// Any other BPMN element carrying an id
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticElement {
    pub id: String,
    pub kind: ElementKind,
    pub name: Option<String>,
    /// Text of a `textAnnotation`
    pub text: Option<String>,
}

impl SemanticElement {
    /// Name for labels, falling back to annotation text.
    pub fn label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.text.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiShape {
    pub element: String,
    pub bounds: Bounds,
    pub is_expanded: Option<bool>,
    pub label: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiEdge {
    pub element: String,
    pub waypoints: Vec<(f64, f64)>,
    pub label: Option<Bounds>,
}

#[derive(Debug, Clone, Default)]
pub struct BpmnModel {
    pub elements: HashMap<String, SemanticElement>,
    pub default_flows: HashSet<String>,
    pub shapes: Vec<DiShape>,
    pub edges: Vec<DiEdge>,
}

/// Parse `xml` into semantic elements and DI geometry.
///
/// Fails when the text is not well-formed XML or its root is not
/// `bpmn:definitions`. DI entries that cannot be drawn are skipped and
/// described in the returned warnings.
pub fn parse(xml: &str) -> Result<(BpmnModel, Vec<String>)> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::ImportError(format!("unparsable content: {}", e)))?;
    let root = doc.root_element();
    if root.tag_name().name() != "definitions" || root.tag_name().namespace() != Some(BPMN_NS) {
        return Err(Error::ImportError(format!(
            "failed to parse document as <bpmn:definitions>: found <{}>",
            root.tag_name().name()
        )));
    }

    let mut model = BpmnModel::default();
    let mut warnings = Vec::new();

    for node in root.descendants().filter(|n| n.is_element()) {
        if node.tag_name().namespace() != Some(BPMN_NS) {
            continue;
        }
        let Some(id) = node.attribute("id") else { continue };
        let Some(kind) = classify(node) else { continue };
        if let Some(default) = node.attribute("default") {
            model.default_flows.insert(default.to_string());
        }
        let text = (kind == ElementKind::TextAnnotation)
            .then(|| child(node, BPMN_NS, "text").and_then(|t| t.text()).map(str::to_string))
            .flatten();
        model.elements.insert(
            id.to_string(),
            SemanticElement {
                id: id.to_string(),
                kind,
                name: node.attribute("name").map(str::to_string),
                text,
            },
        );
    }

    let plane = root
        .children()
        .find(|n| n.has_tag_name((BPMNDI_NS, "BPMNDiagram")))
        .and_then(|d| child(d, BPMNDI_NS, "BPMNPlane"));
    let Some(plane) = plane else {
        return Ok((model, warnings));
    };

    for node in plane.descendants().filter(|n| n.is_element()) {
        if node.has_tag_name((BPMNDI_NS, "BPMNShape")) {
            match read_shape(node, &model) {
                Ok(shape) => model.shapes.push(shape),
                Err(msg) => warnings.push(msg),
            }
        } else if node.has_tag_name((BPMNDI_NS, "BPMNEdge")) {
            match read_edge(node, &model) {
                Ok(edge) => model.edges.push(edge),
                Err(msg) => warnings.push(msg),
            }
        }
    }

    Ok((model, warnings))
}

fn classify(node: Node) -> Option<ElementKind> {
    let name = node.tag_name().name();
    let kind = match name {
        "startEvent" | "endEvent" | "intermediateCatchEvent" | "intermediateThrowEvent"
        | "boundaryEvent" => {
            let position = match name {
                "startEvent" => EventPosition::Start,
                "endEvent" => EventPosition::End,
                "intermediateCatchEvent" => EventPosition::IntermediateCatch,
                "intermediateThrowEvent" => EventPosition::IntermediateThrow,
                _ => EventPosition::Boundary,
            };
            let interrupting = node.attribute("isInterrupting") != Some("false")
                && node.attribute("cancelActivity") != Some("false");
            ElementKind::Event { position, marker: event_marker(node), interrupting }
        }
        "task" => ElementKind::Task(TaskKind::Plain),
        "userTask" => ElementKind::Task(TaskKind::User),
        "serviceTask" => ElementKind::Task(TaskKind::Service),
        "manualTask" => ElementKind::Task(TaskKind::Manual),
        "scriptTask" => ElementKind::Task(TaskKind::Script),
        "businessRuleTask" => ElementKind::Task(TaskKind::BusinessRule),
        "sendTask" => ElementKind::Task(TaskKind::Send),
        "receiveTask" => ElementKind::Task(TaskKind::Receive),
        "subProcess" | "transaction" | "adHocSubProcess" => ElementKind::SubProcess,
        "callActivity" => ElementKind::CallActivity,
        "exclusiveGateway" => ElementKind::Gateway(GatewayKind::Exclusive),
        "parallelGateway" => ElementKind::Gateway(GatewayKind::Parallel),
        "inclusiveGateway" => ElementKind::Gateway(GatewayKind::Inclusive),
        "eventBasedGateway" => ElementKind::Gateway(GatewayKind::EventBased),
        "complexGateway" => ElementKind::Gateway(GatewayKind::Complex),
        "participant" => ElementKind::Participant,
        "lane" => ElementKind::Lane,
        "textAnnotation" => ElementKind::TextAnnotation,
        "dataObjectReference" | "dataObject" | "dataInput" | "dataOutput" => ElementKind::DataObject,
        "dataStoreReference" => ElementKind::DataStore,
        "sequenceFlow" => ElementKind::SequenceFlow,
        "messageFlow" => ElementKind::MessageFlow,
        "association" => ElementKind::Association,
        "dataInputAssociation" | "dataOutputAssociation" => ElementKind::DataAssociation,
        // containers and definitions without a visual of their own
        "definitions" | "process" | "collaboration" | "laneSet" | "message" | "signal"
        | "error" | "escalation" | "itemDefinition" => return None,
        n if n.ends_with("EventDefinition") => return None,
        other => ElementKind::Other(other.to_string()),
    };
    Some(kind)
}

fn event_marker(node: Node) -> EventMarker {
    let mut markers = node
        .children()
        .filter(|c| c.is_element() && c.tag_name().name().ends_with("EventDefinition"))
        .map(|c| match c.tag_name().name() {
            "messageEventDefinition" => EventMarker::Message,
            "timerEventDefinition" => EventMarker::Timer,
            "signalEventDefinition" => EventMarker::Signal,
            "errorEventDefinition" => EventMarker::Error,
            "terminateEventDefinition" => EventMarker::Terminate,
            _ => EventMarker::Other,
        });
    markers.next().unwrap_or(EventMarker::None)
}

fn read_shape(node: Node, model: &BpmnModel) -> std::result::Result<DiShape, String> {
    let element = resolve_reference(node, model)?;
    let bounds = child(node, DC_NS, "Bounds")
        .and_then(read_bounds)
        .ok_or_else(|| format!("shape for <{}> has no bounds; skipped", element))?;
    let label = child(node, BPMNDI_NS, "BPMNLabel")
        .and_then(|l| child(l, DC_NS, "Bounds"))
        .and_then(read_bounds);
    let is_expanded = node.attribute("isExpanded").map(|v| v == "true");
    Ok(DiShape { element, bounds, is_expanded, label })
}

fn read_edge(node: Node, model: &BpmnModel) -> std::result::Result<DiEdge, String> {
    let element = resolve_reference(node, model)?;
    let waypoints: Vec<(f64, f64)> = node
        .children()
        .filter(|c| c.has_tag_name((DI_NS, "waypoint")))
        .filter_map(|w| Some((number(w, "x")?, number(w, "y")?)))
        .collect();
    if waypoints.len() < 2 {
        return Err(format!("edge for <{}> has fewer than two waypoints; skipped", element));
    }
    let label = child(node, BPMNDI_NS, "BPMNLabel")
        .and_then(|l| child(l, DC_NS, "Bounds"))
        .and_then(read_bounds);
    Ok(DiEdge { element, waypoints, label })
}

fn resolve_reference(node: Node, model: &BpmnModel) -> std::result::Result<String, String> {
    let reference = node.attribute("bpmnElement").ok_or_else(|| {
        format!(
            "{} <{}> has no bpmnElement reference; skipped",
            node.tag_name().name(),
            node.attribute("id").unwrap_or("?")
        )
    })?;
    if !model.elements.contains_key(reference) {
        return Err(format!("unresolved reference <{}>", reference));
    }
    Ok(reference.to_string())
}

fn read_bounds(node: Node) -> Option<Bounds> {
    Some(Bounds {
        x: number(node, "x")?,
        y: number(node, "y")?,
        width: number(node, "width").unwrap_or(DEFAULT_SHAPE_WIDTH),
        height: number(node, "height").unwrap_or(DEFAULT_SHAPE_HEIGHT),
    })
}

fn number(node: Node, attr: &str) -> Option<f64> {
    node.attribute(attr)?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn child<'a, 'input>(node: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name((ns, name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
    xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI"
    xmlns:dc="http://www.omg.org/spec/DD/20100524/DC"
    xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="defs">
  <bpmn:process id="order">
    <bpmn:startEvent id="start" name="Order received"><bpmn:messageEventDefinition/></bpmn:startEvent>
    <bpmn:userTask id="check" name="Check order"/>
    <bpmn:exclusiveGateway id="ok" name="OK?" default="flow_no"/>
    <bpmn:endEvent id="end"/>
    <bpmn:sequenceFlow id="flow1" sourceRef="start" targetRef="check"/>
    <bpmn:sequenceFlow id="flow_no" sourceRef="ok" targetRef="end"/>
    <bpmn:textAnnotation id="note"><bpmn:text>Checked daily</bpmn:text></bpmn:textAnnotation>
  </bpmn:process>
  <bpmndi:BPMNDiagram id="diagram">
    <bpmndi:BPMNPlane id="plane" bpmnElement="order">
      <bpmndi:BPMNShape id="start_di" bpmnElement="start"><dc:Bounds x="100" y="100" width="36" height="36"/></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="check_di" bpmnElement="check"><dc:Bounds x="200" y="78" width="100" height="80"/></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="ghost_di" bpmnElement="ghost"><dc:Bounds x="0" y="0" width="10" height="10"/></bpmndi:BPMNShape>
      <bpmndi:BPMNShape id="end_di" bpmnElement="end"/>
      <bpmndi:BPMNEdge id="flow1_di" bpmnElement="flow1"><di:waypoint x="136" y="118"/><di:waypoint x="200" y="118"/></bpmndi:BPMNEdge>
      <bpmndi:BPMNEdge id="flow_no_di" bpmnElement="flow_no"><di:waypoint x="1" y="1"/></bpmndi:BPMNEdge>
    </bpmndi:BPMNPlane>
  </bpmndi:BPMNDiagram>
</bpmn:definitions>"#;

    #[test]
    fn reads_semantics_and_di() {
        let (model, warnings) = parse(ORDER).unwrap();
        assert_eq!(
            model.elements["start"].kind,
            ElementKind::Event {
                position: EventPosition::Start,
                marker: EventMarker::Message,
                interrupting: true
            }
        );
        assert_eq!(model.elements["check"].kind, ElementKind::Task(TaskKind::User));
        assert_eq!(model.elements["note"].label(), Some("Checked daily"));
        assert!(model.default_flows.contains("flow_no"));
        assert!(!model.elements.contains_key("order"));

        assert_eq!(model.shapes.len(), 2);
        assert_eq!(model.shapes[1].bounds, Bounds { x: 200.0, y: 78.0, width: 100.0, height: 80.0 });
        assert_eq!(model.edges.len(), 1);
        assert_eq!(model.edges[0].waypoints, vec![(136.0, 118.0), (200.0, 118.0)]);

        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("unresolved reference <ghost>")));
        assert!(warnings.iter().any(|w| w.contains("<end> has no bounds")));
        assert!(warnings.iter().any(|w| w.contains("fewer than two waypoints")));
    }

    #[test]
    fn document_without_di_has_no_warnings() {
        let xml = r#"<definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL"><process id="p"><task id="t"/></process></definitions>"#;
        let (model, warnings) = parse(xml).unwrap();
        assert!(warnings.is_empty());
        assert!(model.shapes.is_empty());
        assert_eq!(model.elements.len(), 1);
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse("<bpmn:definitions xmlns:bpmn=\"x\"><unclosed>").unwrap_err();
        assert!(matches!(err, Error::ImportError(_)));
    }

    #[test]
    fn rejects_foreign_root() {
        let err = parse(r#"<definitions xmlns="urn:not-bpmn"/>"#).unwrap_err();
        assert!(matches!(err, Error::ImportError(ref m) if m.contains("bpmn:definitions")));
    }
}
