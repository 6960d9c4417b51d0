//! 2D affine matrix algebra for the emulated SVG geometry interfaces
//!
//! Only the subset diagram toolkits actually exercise is implemented.
//! `rotate` and `inverse` are no-ops: they return the matrix unchanged, so
//! rotated or inverted geometry comes out wrong but never panics.

/// An affine map `(x, y) -> (a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// `self × other`: applying the result equals applying `other` then `self`.
    pub fn multiply(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn translate(&self, tx: f64, ty: f64) -> AffineTransform {
        self.multiply(&AffineTransform::new(1.0, 0.0, 0.0, 1.0, tx, ty))
    }

    pub fn scale(&self, factor: f64) -> AffineTransform {
        self.scale_non_uniform(factor, factor)
    }

    pub fn scale_non_uniform(&self, sx: f64, sy: f64) -> AffineTransform {
        self.multiply(&AffineTransform::new(sx, 0.0, 0.0, sy, 0.0, 0.0))
    }

    /// Not implemented: returns `self` unchanged.
    pub fn rotate(&self, _degrees: f64) -> AffineTransform {
        log::trace!("rotate() is not emulated; returning matrix unchanged");
        *self
    }

    /// Not implemented for general matrices: returns `self` unchanged.
    ///
    /// The identity is its own inverse, so that case is exact.
    pub fn inverse(&self) -> AffineTransform {
        log::trace!("inverse() is not emulated; returning matrix unchanged");
        *self
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Point value returned by `createSVGPoint`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SvgPoint {
    pub x: f64,
    pub y: f64,
}

impl SvgPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn matrix_transform(&self, m: &AffineTransform) -> SvgPoint {
        let (x, y) = m.apply(self.x, self.y);
        SvgPoint { x, y }
    }
}

/// Kind tag of an [`SvgTransform`], mirroring `SVGTransform.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Matrix,
    Translate,
    Scale,
    Rotate,
}

/// Transform object returned by `createSVGTransform`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgTransform {
    pub kind: TransformKind,
    pub matrix: AffineTransform,
}

impl Default for SvgTransform {
    fn default() -> Self {
        Self { kind: TransformKind::Matrix, matrix: AffineTransform::identity() }
    }
}

impl SvgTransform {
    pub fn from_matrix(matrix: AffineTransform) -> Self {
        Self { kind: TransformKind::Matrix, matrix }
    }

    pub fn set_matrix(&mut self, matrix: AffineTransform) {
        self.kind = TransformKind::Matrix;
        self.matrix = matrix;
    }

    pub fn set_translate(&mut self, tx: f64, ty: f64) {
        self.kind = TransformKind::Translate;
        self.matrix = AffineTransform::identity().translate(tx, ty);
    }

    pub fn set_scale(&mut self, sx: f64, sy: f64) {
        self.kind = TransformKind::Scale;
        self.matrix = AffineTransform::identity().scale_non_uniform(sx, sy);
    }

    /// Records the kind only; the matrix is left as it was.
    pub fn set_rotate(&mut self, degrees: f64, _cx: f64, _cy: f64) {
        self.kind = TransformKind::Rotate;
        self.matrix = self.matrix.rotate(degrees);
    }

    /// Serialise as an SVG `transform` attribute value.
    pub fn to_attribute(&self) -> String {
        let m = &self.matrix;
        format!("matrix({} {} {} {} {} {})", m.a, m.b, m.c, m.d, m.e, m.f)
    }
}
