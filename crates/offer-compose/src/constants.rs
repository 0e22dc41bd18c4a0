//! Shared constants for document composition
//!
//! Defaults for every tunable value live here; the options structs expose
//! them as configuration.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Flow Layout
// =============================================================================

/// Minimum free space kept at the bottom of an extended page (mm)
pub const DEFAULT_MIN_BOTTOM_SPACE_MM: f32 = 25.0;

/// Stricter bottom space for units containing a financing block (mm)
pub const DEFAULT_FINANCING_BOTTOM_SPACE_MM: f32 = 45.0;

/// Vertical gap between consecutive flow elements (points)
pub const DEFAULT_ELEMENT_SPACING: f32 = 8.0;

/// Line height as a multiple of font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.25;

// =============================================================================
// Charts
// =============================================================================

/// Share of the anchor rectangle height the tallest bar may occupy
pub const DEFAULT_BAR_FILL_RATIO: f32 = 0.8;

/// Height given to bars whose value is (close to) zero (points)
pub const DEFAULT_MIN_BAR_HEIGHT: f32 = 2.0;

/// Values with an absolute magnitude below this count as zero
pub const ZERO_EPSILON: f64 = 1e-9;

/// Ring thickness of donut gauges as a share of the outer radius
pub const DONUT_RING_RATIO: f32 = 0.22;

// =============================================================================
// Text
// =============================================================================

/// Default font size for placeholders without a style hint (points)
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Helvetica bold glyphs run slightly wider than regular
pub const BOLD_WIDTH_FACTOR: f32 = 1.06;

/// Ellipsis used when truncating overflowing text
pub const ELLIPSIS: char = '\u{2026}';

// =============================================================================
// Decorator
// =============================================================================

/// Default footer text; `{page}` and `{total}` are substituted
pub const DEFAULT_FOOTER_TEMPLATE: &str = "Page {page} of {total}";

/// Length of the corner ornament strokes (points)
pub const ORNAMENT_LENGTH: f32 = 14.0;

/// Line width of the corner ornaments (points)
pub const ORNAMENT_WIDTH: f32 = 0.6;
