//! Stand-ins for the browser-only globals a diagram toolkit looks up

use super::dom::{Document, NodeId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Interval between emulated animation frames (~60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// `requestAnimationFrame` backed by a tokio timer.
///
/// Callbacks queue up until [`AnimationFrames::tick`] waits one frame
/// interval and runs them with the elapsed milliseconds since creation.
pub struct AnimationFrames {
    started: Instant,
    next_id: AtomicU32,
    pending: Mutex<Vec<(u32, FrameCallback)>>,
}

impl AnimationFrames {
    pub fn new() -> Self {
        AnimationFrames {
            started: Instant::now(),
            next_id: AtomicU32::new(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn request<F>(&self, cb: F) -> u32
    where
        F: FnOnce(f64) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Box::new(cb)));
        id
    }

    pub fn cancel(&self, id: u32) {
        self.lock().retain(|(i, _)| *i != id);
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait one frame, then run every callback queued before the wait ended.
    /// Returns how many ran.
    pub async fn tick(&self) -> usize {
        tokio::time::sleep(FRAME_INTERVAL).await;
        let due = std::mem::take(&mut *self.lock());
        let timestamp = self.started.elapsed().as_secs_f64() * 1000.0;
        let count = due.len();
        for (_, cb) in due {
            cb(timestamp);
        }
        count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u32, FrameCallback)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AnimationFrames {
    fn default() -> Self {
        Self::new()
    }
}

/// `ResizeObserver` surface. Nothing ever resizes headless.
pub trait ResizeObserver: Send + Sync {
    fn observe(&self, target: NodeId);
    fn unobserve(&self, target: NodeId);
    fn disconnect(&self);
}

pub struct NoopResizeObserver;

impl ResizeObserver for NoopResizeObserver {
    fn observe(&self, _target: NodeId) {}
    fn unobserve(&self, _target: NodeId) {}
    fn disconnect(&self) {}
}

/// Result of `getComputedStyle`: presentation attributes overlaid with
/// declarations from the inline `style` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    properties: BTreeMap<String, String>,
}

/// Attributes that double as CSS properties on SVG elements.
const PRESENTATION_ATTRIBUTES: &[&str] = &[
    "fill",
    "fill-opacity",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "stroke-opacity",
    "opacity",
    "font-family",
    "font-size",
    "font-weight",
    "text-anchor",
    "display",
    "visibility",
];

impl ComputedStyle {
    pub fn of(doc: &Document, id: NodeId) -> Self {
        let mut properties = BTreeMap::new();
        for &name in PRESENTATION_ATTRIBUTES {
            if let Some(v) = doc.attribute(id, name) {
                properties.insert(name.to_string(), v.to_string());
            }
        }
        if let Some(style) = doc.attribute(id, "style") {
            for decl in style.split(';') {
                if let Some((k, v)) = decl.split_once(':') {
                    let (k, v) = (k.trim(), v.trim());
                    if !k.is_empty() {
                        properties.insert(k.to_ascii_lowercase(), v.to_string());
                    }
                }
            }
        }
        ComputedStyle { properties }
    }

    /// Empty string for unknown properties, as browsers do.
    pub fn get_property_value(&self, name: &str) -> &str {
        self.properties.get(name).map(String::as_str).unwrap_or("")
    }
}

/// The emulated `window`.
pub struct Window {
    document: Arc<Mutex<Document>>,
    animation_frames: AnimationFrames,
}

impl Window {
    pub fn new(document: Arc<Mutex<Document>>) -> Self {
        Window { document, animation_frames: AnimationFrames::new() }
    }

    pub fn request_animation_frame<F>(&self, cb: F) -> u32
    where
        F: FnOnce(f64) + Send + 'static,
    {
        self.animation_frames.request(cb)
    }

    pub fn cancel_animation_frame(&self, id: u32) {
        self.animation_frames.cancel(id)
    }

    pub fn animation_frames(&self) -> &AnimationFrames {
        &self.animation_frames
    }

    pub fn resize_observer(&self) -> Box<dyn ResizeObserver> {
        Box::new(NoopResizeObserver)
    }

    /// `getComputedStyle`, read through to the document.
    pub fn computed_style(&self, id: NodeId) -> ComputedStyle {
        let doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        ComputedStyle::of(&doc, id)
    }
}
