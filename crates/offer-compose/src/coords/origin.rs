//! Coordinate system conversion
//!
//! Template manifests may measure rectangles from the top-left corner of the
//! page (y grows downward) or from the bottom-left corner as PDF does. Every
//! rectangle passes through [`to_pdf_space`] exactly once, at load time.

use crate::types::Rect;
use serde::{Deserialize, Serialize};

/// Corner a coordinate system measures from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// y is the distance from the top page edge to the rectangle's top edge
    #[default]
    TopLeft,
    /// Native PDF space: y is the distance from the bottom page edge
    BottomLeft,
}

/// Convert a rectangle expressed relative to `origin` into PDF space
pub fn to_pdf_space(rect: Rect, origin: Origin, page_height: f32) -> Rect {
    match origin {
        Origin::BottomLeft => rect,
        Origin::TopLeft => Rect::new(
            rect.x,
            page_height - rect.y - rect.height,
            rect.width,
            rect.height,
        ),
    }
}

/// Inverse of [`to_pdf_space`]
pub fn from_pdf_space(rect: Rect, origin: Origin, page_height: f32) -> Rect {
    // The top-left flip is its own inverse
    to_pdf_space(rect, origin, page_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_left_flips_y() {
        let r = Rect::new(60.0, 120.0, 200.0, 14.0);
        let pdf = to_pdf_space(r, Origin::TopLeft, 841.89);
        assert_eq!(pdf.x, 60.0);
        assert!((pdf.y - (841.89 - 134.0)).abs() < 1e-3);
        assert_eq!((pdf.width, pdf.height), (200.0, 14.0));
    }

    #[test]
    fn test_bottom_left_is_identity() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(to_pdf_space(r, Origin::BottomLeft, 500.0), r);
    }

    #[test]
    fn test_conversion_round_trips() {
        let r = Rect::new(10.0, 30.0, 50.0, 20.0);
        let there = to_pdf_space(r, Origin::TopLeft, 400.0);
        assert_eq!(from_pdf_space(there, Origin::TopLeft, 400.0), r);
    }

    #[test]
    fn test_top_edge_maps_to_page_top() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let pdf = to_pdf_space(r, Origin::TopLeft, 100.0);
        assert_eq!(pdf.top(), 100.0);
    }
}
