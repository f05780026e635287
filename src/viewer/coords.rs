//! Coordinate transforms between client, viewport, and document space
//!
//! Three coordinate spaces exist in the viewer:
//! - client space: raw pointer coordinates relative to the window
//! - viewport space: coordinates relative to the page container, scaled
//!   by the current zoom factor
//! - document space: page coordinates at scale 1, independent of zoom
//!
//! Annotation geometry is always stored in document space; everything else
//! composes the two transforms below.

use serde::{Deserialize, Serialize};

/// A point in raw client (pointer) coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClientPoint {
    pub x: f32,
    pub y: f32,
}

impl ClientPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in viewport space (container-relative, scaled)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewPoint {
    pub x: f32,
    pub y: f32,
}

impl ViewPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in viewport space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle from two drag corners
    #[must_use]
    pub fn from_corners(a: ViewPoint, b: ViewPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Smallest rectangle enclosing both `self` and `other`
    #[must_use]
    pub fn union(&self, other: &ViewRect) -> Self {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = (self.x + self.width).max(other.x + other.width);
        let y1 = (self.y + self.height).max(other.y + other.height);
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// A point in document space (scale 1)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f32,
    pub y: f32,
}

impl DocPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in document space (scale 1) - the storage frame for annotations
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DocRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Convert a client-space point to document space.
///
/// `origin` is the page container's position in client coordinates.
/// A scale of zero or below is a programming error, not a recoverable one.
#[must_use]
pub fn client_to_document(point: ClientPoint, origin: ClientPoint, scale: f32) -> DocPoint {
    debug_assert!(scale > 0.0, "scale must be positive, got {scale}");
    DocPoint {
        x: (point.x - origin.x) / scale,
        y: (point.y - origin.y) / scale,
    }
}

/// Convert a client-space point to viewport space (origin subtraction only)
#[must_use]
pub fn client_to_view(point: ClientPoint, origin: ClientPoint) -> ViewPoint {
    ViewPoint {
        x: point.x - origin.x,
        y: point.y - origin.y,
    }
}

/// Project a document-space rectangle into viewport space at the given scale
#[must_use]
pub fn document_to_viewport(rect: DocRect, scale: f32) -> ViewRect {
    debug_assert!(scale > 0.0, "scale must be positive, got {scale}");
    ViewRect {
        x: rect.x * scale,
        y: rect.y * scale,
        width: rect.width * scale,
        height: rect.height * scale,
    }
}

/// Convert a viewport-space rectangle back to document space
#[must_use]
pub fn view_to_document(rect: ViewRect, scale: f32) -> DocRect {
    debug_assert!(scale > 0.0, "scale must be positive, got {scale}");
    DocRect {
        x: rect.x / scale,
        y: rect.y / scale,
        width: rect.width / scale,
        height: rect.height / scale,
    }
}

/// Project a document-space point into viewport space
#[must_use]
pub fn document_point_to_viewport(point: DocPoint, scale: f32) -> ViewPoint {
    debug_assert!(scale > 0.0, "scale must be positive, got {scale}");
    ViewPoint {
        x: point.x * scale,
        y: point.y * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn assert_close(a: f32, b: f32) {
        let tolerance = EPS * a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() <= tolerance, "{a} != {b}");
    }

    #[test]
    fn client_to_document_subtracts_origin_and_divides() {
        let p = client_to_document(
            ClientPoint::new(130.0, 250.0),
            ClientPoint::new(30.0, 50.0),
            2.0,
        );
        assert_eq!(p, DocPoint::new(50.0, 100.0));
    }

    #[test]
    fn round_trip_is_exact_within_tolerance() {
        let origin = ClientPoint::new(17.5, 42.25);
        for scale in [0.5, 1.0, 1.5, 2.0, 3.0, 0.001, 123.4] {
            for (x, y) in [(0.0, 0.0), (10.0, 10.0), (321.5, 7.75), (9999.0, 1.0)] {
                let client = ClientPoint::new(x + origin.x, y + origin.y);
                let doc = client_to_document(client, origin, scale);
                let view = document_to_viewport(DocRect::new(doc.x, doc.y, 0.0, 0.0), scale);
                assert_close(view.x, x);
                assert_close(view.y, y);
            }
        }
    }

    #[test]
    fn view_rect_from_corners_normalizes() {
        let rect = ViewRect::from_corners(ViewPoint::new(10.0, 40.0), ViewPoint::new(4.0, 8.0));
        assert_eq!(rect, ViewRect::new(4.0, 8.0, 6.0, 32.0));
    }

    #[test]
    fn view_rect_union_encloses_both() {
        let a = ViewRect::new(0.0, 0.0, 10.0, 5.0);
        let b = ViewRect::new(8.0, 3.0, 10.0, 5.0);
        assert_eq!(a.union(&b), ViewRect::new(0.0, 0.0, 18.0, 8.0));
    }

    #[test]
    fn document_rect_scales_all_components() {
        let view = document_to_viewport(DocRect::new(10.0, 20.0, 30.0, 40.0), 1.5);
        assert_eq!(view, ViewRect::new(15.0, 30.0, 45.0, 60.0));
    }

    #[test]
    fn view_to_document_inverts_projection() {
        let doc = DocRect::new(10.0, 10.0, 50.0, 50.0);
        let back = view_to_document(document_to_viewport(doc, 1.5), 1.5);
        assert_close(back.x, doc.x);
        assert_close(back.y, doc.y);
        assert_close(back.width, doc.width);
        assert_close(back.height, doc.height);
    }
}
