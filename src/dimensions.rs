//! Output size from the SVG `viewBox`, and the matching rewrite of the root
//! element's `width`/`height`.

use crate::{Dimensions, Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

/// The four numbers of a `viewBox` attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    /// Four numbers separated by whitespace and/or commas, with a finite
    /// positive width and height.
    pub fn parse(value: &str) -> Option<ViewBox> {
        let numbers = value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        match numbers[..] {
            [min_x, min_y, width, height] if width > 0.0 && height > 0.0 => {
                Some(ViewBox { min_x, min_y, width, height })
            }
            _ => None,
        }
    }
}

/// SVG markup whose root carries the resolved size.
#[derive(Debug, Clone)]
pub struct ResolvedVector {
    pub markup: String,
    pub dimensions: Dimensions,
    pub view_box: Option<ViewBox>,
}

/// Output size for a diagram: the `viewBox` extent rounded up, plus padding
/// on each side, never smaller than `min`.
pub fn resolve_dimensions(view_box: Option<ViewBox>, min: Dimensions, padding: u32) -> Dimensions {
    let Some(vb) = view_box else {
        return min;
    };
    let pad = padding.saturating_mul(2);
    let extent = |v: f64| (v.ceil() as u32).saturating_add(pad);
    Dimensions {
        width: extent(vb.width).max(min.width),
        height: extent(vb.height).max(min.height),
    }
}

/// Computes and applies output dimensions.
#[derive(Debug, Clone, Copy)]
pub struct DimensionResolver {
    min: Dimensions,
    padding: u32,
}

impl DimensionResolver {
    pub fn new(min: Dimensions, padding: u32) -> Self {
        DimensionResolver { min, padding }
    }

    pub fn resolve(&self, svg: &str) -> Result<ResolvedVector> {
        let view_box = read_view_box(svg)?;
        if view_box.is_none() {
            log::debug!("no usable viewBox; using minimum dimensions");
        }
        let dimensions = resolve_dimensions(view_box, self.min, self.padding);
        let markup = set_root_dimensions(svg, dimensions)?;
        Ok(ResolvedVector { markup, dimensions, view_box })
    }
}

/// The root element's `viewBox`, if present and well formed.
pub fn read_view_box(svg: &str) -> Result<Option<ViewBox>> {
    let mut reader = Reader::from_str(svg);
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) => {
                check_root(&e)?;
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    if attr.key.as_ref() == b"viewBox" {
                        let value = attr.unescape_value().map_err(xml_error)?;
                        return Ok(ViewBox::parse(&value));
                    }
                }
                return Ok(None);
            }
            Event::Eof => return Err(no_root()),
            _ => {}
        }
    }
}

/// Re-serialize `svg` with the root's `width` and `height` set to
/// `dimensions`. Existing attributes are replaced where they stand; missing
/// ones are appended. Every other event is written back unchanged.
pub fn set_root_dimensions(svg: &str, dimensions: Dimensions) -> Result<String> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len() + 32));
    let mut root_seen = false;

    loop {
        let event = match reader.read_event().map_err(xml_error)? {
            Event::Start(e) if !root_seen => {
                root_seen = true;
                Event::Start(with_dimensions(&e, dimensions)?)
            }
            Event::Empty(e) if !root_seen => {
                root_seen = true;
                Event::Empty(with_dimensions(&e, dimensions)?)
            }
            Event::Eof => break,
            other => other,
        };
        writer
            .write_event(event)
            .map_err(|e| Error::RasterizationError(format!("cannot write SVG: {}", e)))?;
    }

    if !root_seen {
        return Err(no_root());
    }
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::RasterizationError(format!("SVG is not UTF-8: {}", e)))
}

fn with_dimensions(root: &BytesStart, dimensions: Dimensions) -> Result<BytesStart<'static>> {
    check_root(root)?;
    let name = std::str::from_utf8(root.name().as_ref())
        .map_err(|e| Error::RasterizationError(format!("root name is not UTF-8: {}", e)))?
        .to_string();
    let width = dimensions.width.to_string();
    let height = dimensions.height.to_string();

    let mut rewritten = BytesStart::new(name);
    let (mut has_width, mut has_height) = (false, false);
    for attr in root.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::RasterizationError(format!("attribute name is not UTF-8: {}", e)))?;
        match key {
            "width" if !has_width => {
                has_width = true;
                rewritten.push_attribute(("width", width.as_str()));
            }
            "height" if !has_height => {
                has_height = true;
                rewritten.push_attribute(("height", height.as_str()));
            }
            "width" | "height" => {}
            _ => {
                let value = attr.unescape_value().map_err(xml_error)?;
                rewritten.push_attribute((key, value.as_ref()));
            }
        }
    }
    if !has_width {
        rewritten.push_attribute(("width", width.as_str()));
    }
    if !has_height {
        rewritten.push_attribute(("height", height.as_str()));
    }
    Ok(rewritten)
}

fn check_root(e: &BytesStart) -> Result<()> {
    if e.local_name().as_ref() == b"svg" {
        Ok(())
    } else {
        Err(Error::RasterizationError(format!(
            "root element is <{}>, not <svg>",
            String::from_utf8_lossy(e.name().as_ref())
        )))
    }
}

fn no_root() -> Error {
    Error::RasterizationError("SVG has no root element".to_string())
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::RasterizationError(format!("unreadable SVG: {}", e))
}
