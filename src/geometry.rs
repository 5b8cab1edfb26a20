//! Page-space geometry
//!
//! Affine transforms between PDF content-stream coordinates and rendered
//! pixel space, plus the scale-independent rectangle representation used
//! for persisted highlight positions.

use serde::{Deserialize, Serialize};

/// A 2x3 affine transform in PDF row convention `[a b c d e f]`.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// PDF pages have a bottom-left origin; rendered output has top-left.
    pub const FLIP_Y: Matrix = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Compose `self` after `other`: the result applies `other` first.
    pub fn compose(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Euclidean norm of the first basis vector, i.e. the effective font
    /// size of a text-run transform.
    pub fn font_size(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }
}

/// Pixel position of a text run after projection into rendered space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomPosition {
    pub left: f32,
    pub top: f32,
    pub font_size: f32,
}

/// Project a text run's content-stream transform into rendered pixel space.
///
/// Composes the page viewport transform with the item transform, then flips
/// the y axis. Pure arithmetic; identical inputs always produce identical
/// output.
pub fn dom_position(item_transform: &Matrix, viewport_transform: &Matrix) -> DomPosition {
    let m = viewport_transform.compose(item_transform).compose(&Matrix::FLIP_Y);
    DomPosition {
        left: m.e,
        top: m.f,
        font_size: m.font_size(),
    }
}

/// A rectangle in rendered pixel space at some concrete scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Divide out the capture-time scale so the rectangle can be reapplied
    /// at any future scale by multiplication.
    pub fn normalized(&self, scale: f32) -> NormalizedRect {
        NormalizedRect {
            x: self.x / scale,
            y: self.y / scale,
            width: self.width / scale,
            height: self.height / scale,
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Scale-independent rectangle: stored pre-divided by the capture-time
/// scale, reapplied as `value * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn at_scale(&self, scale: f32) -> Rect {
        Rect {
            x: self.x * scale,
            y: self.y * scale,
            width: self.width * scale,
            height: self.height * scale,
        }
    }
}

/// Per-page viewport derived from the render engine: read-only input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub width: f32,
    pub height: f32,
    pub transform: Matrix,
}

impl Viewport {
    /// Standard viewport for a page of the given base size: scales and
    /// moves the origin to the top-left corner.
    pub fn for_page(page_width: f32, page_height: f32, scale: f32) -> Self {
        Self {
            scale,
            width: page_width * scale,
            height: page_height * scale,
            transform: Matrix::new(scale, 0.0, 0.0, -scale, 0.0, page_height * scale),
        }
    }
}
