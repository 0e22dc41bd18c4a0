//! Content stream builder for one output page
//!
//! A [`Canvas`] accumulates PDF drawing operators in PDF space (bottom-left
//! origin, points) together with the resources they reference. The page
//! writer turns finished canvases into page objects.

use crate::types::{Color, ComposeError, Rect, Result, fmt_num};
use lopdf::{Document, ObjectId};

use super::raster::DecodedImage;
use super::text::hex_string;

/// Standard fonts available to every page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn resource_name(self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
        }
    }

    pub fn base_font(self) -> &'static [u8] {
        match self {
            FontFace::Regular => b"Helvetica",
            FontFace::Bold => b"Helvetica-Bold",
        }
    }

    pub fn from_bold(bold: bool) -> Self {
        if bold { FontFace::Bold } else { FontFace::Regular }
    }
}

/// A source PDF page to be placed as a Form XObject
pub(crate) struct FormSource {
    pub doc: Document,
    pub page_id: ObjectId,
}

/// Drawing operations and resources for one page
#[derive(Default)]
pub struct Canvas {
    ops: String,
    pub(crate) uses_regular: bool,
    pub(crate) uses_bold: bool,
    pub(crate) images: Vec<(String, DecodedImage)>,
    pub(crate) forms: Vec<(String, FormSource)>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw content stream collected so far
    pub fn ops(&self) -> &str {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn save(&mut self) {
        self.ops.push_str("q\n");
    }

    pub fn restore(&mut self) {
        self.ops.push_str("Q\n");
    }

    /// Draw one line of text with its baseline at `(x, baseline)`
    pub fn text(
        &mut self,
        x: f32,
        baseline: f32,
        font: FontFace,
        size: f32,
        color: Color,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        match font {
            FontFace::Regular => self.uses_regular = true,
            FontFace::Bold => self.uses_bold = true,
        }
        self.ops.push_str(&format!(
            "BT /{} {} Tf {}{} {} Td {} Tj ET\n",
            font.resource_name(),
            fmt_num(size),
            color.fill_op(),
            fmt_num(x),
            fmt_num(baseline),
            hex_string(text)
        ));
    }

    pub fn fill_rect(&mut self, rect: &Rect, color: Color) {
        self.ops.push_str(&format!(
            "q {}{} {} {} {} re f Q\n",
            color.fill_op(),
            fmt_num(rect.x),
            fmt_num(rect.y),
            fmt_num(rect.width),
            fmt_num(rect.height)
        ));
    }

    pub fn stroke_rect(&mut self, rect: &Rect, color: Color, line_width: f32) {
        self.ops.push_str(&format!(
            "q {}{} w {} {} {} {} re S Q\n",
            color.stroke_op(),
            fmt_num(line_width),
            fmt_num(rect.x),
            fmt_num(rect.y),
            fmt_num(rect.width),
            fmt_num(rect.height)
        ));
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, line_width: f32) {
        self.ops.push_str(&format!(
            "q {}{} w {} {} m {} {} l S Q\n",
            color.stroke_op(),
            fmt_num(line_width),
            fmt_num(from.0),
            fmt_num(from.1),
            fmt_num(to.0),
            fmt_num(to.1)
        ));
    }

    /// Fill an annular sector (ring segment) centered at `(cx, cy)`.
    ///
    /// Angles are in degrees, measured counter-clockwise from the positive
    /// x axis. The sweep is split into arcs of at most 90° so the Bezier
    /// approximation stays accurate.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_ring_segment(
        &mut self,
        cx: f32,
        cy: f32,
        outer: f32,
        inner: f32,
        start_deg: f32,
        sweep_deg: f32,
        color: Color,
    ) {
        if sweep_deg.abs() < 0.01 || outer <= 0.0 {
            return;
        }
        let sweep = sweep_deg.clamp(-360.0, 360.0);
        let end_deg = start_deg + sweep;

        let mut path = String::new();
        let (sx, sy) = polar(cx, cy, outer, start_deg);
        path.push_str(&format!("{} {} m\n", fmt_num(sx), fmt_num(sy)));
        append_arc(&mut path, cx, cy, outer, start_deg, end_deg);

        if inner > 0.0 {
            let (ix, iy) = polar(cx, cy, inner, end_deg);
            path.push_str(&format!("{} {} l\n", fmt_num(ix), fmt_num(iy)));
            append_arc(&mut path, cx, cy, inner, end_deg, start_deg);
        } else {
            path.push_str(&format!("{} {} l\n", fmt_num(cx), fmt_num(cy)));
        }
        path.push_str("h f\n");

        self.ops.push_str("q\n");
        self.ops.push_str(&color.fill_op());
        self.ops.push_str(&path);
        self.ops.push_str("Q\n");
    }

    /// Place a decoded raster image stretched over `rect`
    pub fn draw_image(&mut self, image: DecodedImage, rect: &Rect) {
        let name = format!("Im{}", self.images.len());
        self.ops.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            fmt_num(rect.width),
            fmt_num(rect.height),
            fmt_num(rect.x),
            fmt_num(rect.y),
            name
        ));
        self.images.push((name, image));
    }

    /// Place the first page of a PDF as a Form XObject scaled onto `rect`
    pub fn draw_pdf_page(&mut self, pdf: &[u8], rect: &Rect) -> Result<()> {
        let doc = Document::load_mem(pdf)?;
        let page_id = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or(ComposeError::NoPages)?;
        let (width, height) = super::xobject::get_page_dimensions(&doc, page_id)?;

        let name = format!("Fm{}", self.forms.len());
        let sx = if width > 0.0 { rect.width / width } else { 1.0 };
        let sy = if height > 0.0 { rect.height / height } else { 1.0 };
        self.ops.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            fmt_num(sx),
            fmt_num(sy),
            fmt_num(rect.x),
            fmt_num(rect.y),
            name
        ));
        self.forms.push((name, FormSource { doc, page_id }));
        Ok(())
    }
}

fn polar(cx: f32, cy: f32, r: f32, deg: f32) -> (f32, f32) {
    let rad = deg.to_radians();
    (cx + r * rad.cos(), cy + r * rad.sin())
}

/// Append Bezier segments for an arc from `from_deg` to `to_deg`.
/// The current point must already be at the arc start.
fn append_arc(path: &mut String, cx: f32, cy: f32, r: f32, from_deg: f32, to_deg: f32) {
    let total = to_deg - from_deg;
    let segments = (total.abs() / 90.0).ceil().max(1.0) as usize;
    let step = total / segments as f32;

    for i in 0..segments {
        let a0 = (from_deg + step * i as f32).to_radians();
        let a1 = (from_deg + step * (i + 1) as f32).to_radians();
        // Control distance 4/3 * tan(theta / 4) * r; negative for clockwise arcs
        let k = 4.0 / 3.0 * ((a1 - a0) / 4.0).tan() * r;

        let (x0, y0) = (cx + r * a0.cos(), cy + r * a0.sin());
        let (x3, y3) = (cx + r * a1.cos(), cy + r * a1.sin());
        let (x1, y1) = (x0 - k * a0.sin(), y0 + k * a0.cos());
        let (x2, y2) = (x3 + k * a1.sin(), y3 - k * a1.cos());

        path.push_str(&format!(
            "{} {} {} {} {} {} c\n",
            fmt_num(x1),
            fmt_num(y1),
            fmt_num(x2),
            fmt_num(y2),
            fmt_num(x3),
            fmt_num(y3)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_marks_font_usage() {
        let mut canvas = Canvas::new();
        canvas.text(10.0, 20.0, FontFace::Bold, 12.0, Color::BLACK, "Hi");
        assert!(canvas.uses_bold);
        assert!(!canvas.uses_regular);
        assert!(canvas.ops().contains("/F2 12 Tf"));
        assert!(canvas.ops().contains("<4869> Tj"));
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let mut canvas = Canvas::new();
        canvas.text(0.0, 0.0, FontFace::Regular, 10.0, Color::BLACK, "");
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_ring_segment_splits_arcs() {
        let mut canvas = Canvas::new();
        canvas.fill_ring_segment(50.0, 50.0, 40.0, 30.0, 90.0, -270.0, Color::BLACK);
        // 3 outer + 3 inner quarter arcs
        assert_eq!(canvas.ops().matches(" c\n").count(), 6);
    }
}
