//! PNG rasterization with `resvg`.

use crate::rendering::RasterImage;
use crate::{Error, Result};
use base64::Engine as Base64Engine;

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";
/// Family used when the markup names fonts the system does not have.
const FALLBACK_FONT_FAMILY: &str = "Arial";

/// SVG markup wrapped as an embeddable image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    src: String,
}

impl EmbeddedImage {
    pub fn from_svg(svg: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
        EmbeddedImage { src: format!("{}{}", DATA_URL_PREFIX, encoded) }
    }

    /// The `data:` URL.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Markup bytes behind the source.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = self
            .src
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| Error::RasterizationError("not an SVG data URL".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::RasterizationError(format!("image source is not valid base64: {}", e)))
    }
}

/// Pixel size of a `width` × `height` logical surface at `scale`.
pub fn pixel_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let px = |v: u32| (v as f64 * scale).ceil().max(1.0) as u32;
    (px(width), px(height))
}

/// Draw `svg` at `width` × `height` logical pixels onto an opaque white
/// surface scaled by `scale`, and encode it as PNG.
pub fn rasterize(svg: &str, width: u32, height: u32, scale: f64) -> Result<RasterImage> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::RasterizationError(format!("invalid scale {}", scale)));
    }
    let (px_width, px_height) = pixel_size(width, height, scale);

    let mut pixmap = tiny_skia::Pixmap::new(px_width, px_height).ok_or_else(|| {
        Error::RasterizationError(format!("cannot allocate a {}x{} surface", px_width, px_height))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let image = EmbeddedImage::from_svg(svg);
    let data = image.decode()?;

    let mut opt = usvg::Options::default();
    opt.font_family = FALLBACK_FONT_FAMILY.to_string();
    opt.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_data(&data, &opt)
        .map_err(|e| Error::RasterizationError(format!("image failed to load: {}", e)))?;

    // stretch the markup's own size onto the logical surface, then magnify
    let size = tree.size();
    let sx = width as f32 / size.width() * scale as f32;
    let sy = height as f32 / size.height() * scale as f32;
    resvg::render(&tree, tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    let png_data = pixmap
        .encode_png()
        .map_err(|e| Error::RasterizationError(format!("PNG encoding failed: {}", e)))?;
    log::debug!("rasterized {}x{} ({} bytes)", px_width, px_height, png_data.len());

    Ok(RasterImage {
        width,
        height,
        scale,
        pixel_width: px_width,
        pixel_height: px_height,
        png_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30" viewBox="0 0 40 30"><rect x="5" y="5" width="10" height="10" fill="black"/></svg>"#;

    #[test]
    fn produces_png_at_scaled_size() {
        let image = rasterize(SQUARE, 40, 30, 2.0).unwrap();
        assert_eq!((image.width, image.height), (40, 30));
        assert_eq!((image.pixel_width, image.pixel_height), (80, 60));
        assert_eq!(image.scale, 2.0);
        assert_eq!(&image.png_data[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(image.byte_len(), image.png_data.len());
    }

    fn pixel(image: &RasterImage, x: u32, y: u32) -> [u8; 4] {
        let pixmap = tiny_skia::Pixmap::decode_png(&image.png_data).unwrap();
        let c = pixmap.pixel(x, y).unwrap();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn markup_is_stretched_to_the_logical_size() {
        let filled = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30"><rect width="40" height="30" fill="black"/></svg>"#;
        let image = rasterize(filled, 80, 60, 1.0).unwrap();
        assert_eq!((image.pixel_width, image.pixel_height), (80, 60));
        assert_eq!(pixel(&image, 10, 10), [0, 0, 0, 255]);
        assert_eq!(pixel(&image, 70, 50), [0, 0, 0, 255]);
    }

    #[test]
    fn background_is_opaque_white() {
        let empty = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30"/>"#;
        let image = rasterize(empty, 40, 30, 1.5).unwrap();
        assert_eq!(pixel(&image, 0, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&image, 59, 44), [255, 255, 255, 255]);
    }

    #[test]
    fn fractional_scale_rounds_up() {
        assert_eq!(pixel_size(801, 601, 1.5), (1202, 902));
        assert_eq!(pixel_size(10, 10, 0.01), (1, 1));
    }

    #[test]
    fn embedded_source_round_trips_markup() {
        let image = EmbeddedImage::from_svg(SQUARE);
        assert!(image.src().starts_with("data:image/svg+xml;base64,"));
        assert_eq!(image.decode().unwrap(), SQUARE.as_bytes());
    }

    #[test]
    fn unreadable_markup_is_a_rasterization_error() {
        let err = rasterize("<svg", 10, 10, 1.0).unwrap_err();
        assert!(matches!(err, Error::RasterizationError(_)));
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(matches!(rasterize(SQUARE, 40, 30, 0.0), Err(Error::RasterizationError(_))));
    }
}
