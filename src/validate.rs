//! Structural sanity check run before any heavy rendering work.
//!
//! Only looks for the markers every BPMN 2.0 document carries; well-formedness
//! is left to the toolkit import.

use crate::{Error, Result};

/// Namespace URI of the BPMN 2.0 model schema.
pub const BPMN_MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

/// A non-fatal finding reported by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// No BPMN model namespace URI appears anywhere in the text
    MissingNamespace { source: String },
    /// The document has no `BPMNDiagram` section, so there is nothing to lay out
    MissingDiagramInterchange { source: String },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::MissingNamespace { source } => {
                write!(f, "{}: no BPMN 2.0 namespace declaration found", source)
            }
            ValidationWarning::MissingDiagramInterchange { source } => write!(
                f,
                "{}: no diagram interchange (BPMNDiagram) section; the diagram will render without layout",
                source
            ),
        }
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub warnings: Vec<ValidationWarning>,
}

/// Check that `text` looks like a BPMN 2.0 document.
///
/// Fails with [`Error::InvalidDocument`] when neither an XML declaration nor a
/// `definitions` root is present, or when the root element is anything other
/// than `definitions`. Missing namespace and missing diagram interchange are
/// reported as warnings.
pub fn validate(text: &str, source_label: &str) -> Result<Validation> {
    let has_declaration = text.trim_start_matches('\u{feff}').trim_start().starts_with("<?xml");
    let has_definitions = root_element_name(text).is_some_and(is_definitions);

    if !has_declaration && !has_definitions {
        return Err(Error::InvalidDocument(format!(
            "{}: not an XML document (no XML declaration or definitions element)",
            source_label
        )));
    }
    if !has_definitions {
        return Err(Error::InvalidDocument(format!(
            "{}: missing BPMN root element <definitions>",
            source_label
        )));
    }

    let mut validation = Validation::default();
    if !text.contains(BPMN_MODEL_NS) {
        validation.warnings.push(ValidationWarning::MissingNamespace {
            source: source_label.to_string(),
        });
    }
    if !text.contains("BPMNDiagram") {
        validation
            .warnings
            .push(ValidationWarning::MissingDiagramInterchange {
                source: source_label.to_string(),
            });
    }

    for w in &validation.warnings {
        log::warn!("{}", w);
    }
    Ok(validation)
}

/// Name of the first element in `text`, skipping the prolog: XML
/// declaration, processing instructions, comments and a DOCTYPE.
fn root_element_name(text: &str) -> Option<&str> {
    let mut rest = text.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("<?") {
            rest = &after[after.find("?>")? + 2..];
        } else if let Some(after) = rest.strip_prefix("<!--") {
            rest = &after[after.find("-->")? + 3..];
        } else if let Some(after) = rest.strip_prefix("<!") {
            rest = &after[doctype_end(after)?..];
        } else {
            let tag = rest.strip_prefix('<')?;
            let name_end = tag
                .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                .unwrap_or(tag.len());
            return Some(&tag[..name_end]);
        }
    }
}

/// Offset just past the `>` closing a DOCTYPE, stepping over an internal subset.
fn doctype_end(decl: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in decl.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '>' if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// `definitions` or `prefix:definitions`.
fn is_definitions(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => {
            local == "definitions" && !prefix.is_empty() && prefix.chars().all(is_name_char)
        }
        None => name == "definitions",
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
