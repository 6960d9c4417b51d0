//! Vector-to-pixel conversion

pub mod raster;

pub use raster::{rasterize, EmbeddedImage};

/// An encoded PNG with the logical size it was drawn at.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Logical width before scaling
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub png_data: Vec<u8>,
}

impl RasterImage {
    pub fn byte_len(&self) -> usize {
        self.png_data.len()
    }
}
