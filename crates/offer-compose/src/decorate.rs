//! Page furniture and two-pass numbering for the extended pages
//!
//! Pass 1 lays the flow content out only to learn how many pages it needs.
//! Pass 2 repeats the identical layout and paints content plus furniture,
//! so every footer can show the final total.

use crate::constants::{ORNAMENT_LENGTH, ORNAMENT_WIDTH, mm_to_pt};
use crate::flow::{FlowComposer, FlowElement, LaidOutPage, ProtectionEntry, paint_flow_page};
use crate::options::{DecoratorOptions, LayoutOptions, RenderOptions};
use crate::pipeline::Deadline;
use crate::render::text::text_width;
use crate::render::{Canvas, DecodedImage, FontFace, write_pages};
use crate::types::*;

/// Gap between the content area and the corner ornaments (points)
const ORNAMENT_GAP: f32 = 6.0;

/// Share of the bottom margin covered by the footer bar
const FOOTER_BAR_RATIO: f32 = 0.55;

/// Paints per-page furniture.
///
/// Output must depend only on the arguments so repeated passes agree.
pub trait PageDecorator: Send + Sync {
    fn paint(&self, canvas: &mut Canvas, page_number: usize, total: usize);
}

/// Where flow page numbers start and what they count up to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numbering {
    /// Pages preceding the flow pages (the fixed template pages)
    pub offset: usize,
    /// Total pages shown in the footer
    pub total: usize,
}

impl Numbering {
    pub fn page_number(&self, flow_index: usize) -> usize {
        self.offset + flow_index
    }
}

/// Fill `{page}` and `{total}` in a footer template
pub fn format_footer(template: &str, page: usize, total: usize) -> String {
    template
        .replace("{page}", &page.to_string())
        .replace("{total}", &total.to_string())
}

/// Corner ornaments, logo block, footer bar and footer text
pub struct StandardDecorator {
    options: DecoratorOptions,
    layout: LayoutOptions,
    logo: Option<DecodedImage>,
}

impl StandardDecorator {
    pub fn new(options: &RenderOptions) -> Self {
        let logo = options.decorator.logo.as_ref().and_then(|bytes| {
            DecodedImage::decode(bytes)
                .map_err(|e| log::warn!("Logo image unusable, falling back to brand text: {}", e))
                .ok()
        });
        Self {
            options: options.decorator.clone(),
            layout: options.layout.clone(),
            logo,
        }
    }

    fn paint_ornaments(&self, canvas: &mut Canvas) {
        let content = self.layout.content_rect();
        let color = self.options.ornament_color;
        let len = ORNAMENT_LENGTH;
        let left = content.x - ORNAMENT_GAP;
        let right = content.right() + ORNAMENT_GAP;
        let top = content.top() + ORNAMENT_GAP;
        let bottom = content.y - ORNAMENT_GAP;

        // Each corner: one horizontal and one vertical stroke pointing inward
        for (x, y, dx, dy) in [
            (left, top, 1.0, -1.0),
            (right, top, -1.0, -1.0),
            (left, bottom, 1.0, 1.0),
            (right, bottom, -1.0, 1.0),
        ] {
            canvas.line((x, y), (x + dx * len, y), color, ORNAMENT_WIDTH);
            canvas.line((x, y), (x, y + dy * len), color, ORNAMENT_WIDTH);
        }
    }

    fn paint_logo(&self, canvas: &mut Canvas) {
        let page = self.layout.page_size;
        let top_margin = mm_to_pt(self.layout.margin_top_mm);
        let right_margin = mm_to_pt(self.layout.margin_right_mm);
        let height = top_margin * 0.45;
        let width = height * 3.0;
        let slot = Rect::new(
            page.width - right_margin - width,
            page.height - top_margin * 0.25 - height,
            width,
            height,
        );

        if let Some(logo) = &self.logo {
            let target = slot.fit_aspect(logo.width as f32, logo.height as f32);
            // Right-align inside the slot
            let target = Rect::new(slot.right() - target.width, target.y, target.width, target.height);
            canvas.draw_image(logo.clone(), &target);
        } else if let Some(brand) = &self.options.brand_text {
            let size = (height * 0.5).min(16.0);
            let w = text_width(brand, size, true);
            canvas.text(
                slot.right() - w,
                slot.center_y() - size * 0.35,
                FontFace::Bold,
                size,
                self.options.ornament_color,
                brand,
            );
        }
    }

    fn paint_footer(&self, canvas: &mut Canvas, page_number: usize, total: usize) {
        let page = self.layout.page_size;
        let bar_height = mm_to_pt(self.layout.margin_bottom_mm) * FOOTER_BAR_RATIO;
        let bar = Rect::new(0.0, 0.0, page.width, bar_height);
        canvas.fill_rect(&bar, self.options.footer_bar_color);

        let text = format_footer(&self.options.footer_template, page_number, total);
        let size = self.options.footer_font_size;
        let w = text_width(&text, size, false);
        let right_margin = mm_to_pt(self.layout.margin_right_mm);
        canvas.text(
            page.width - right_margin - w,
            bar.center_y() - size * 0.35,
            FontFace::Regular,
            size,
            self.options.footer_text_color,
            &text,
        );
    }
}

impl PageDecorator for StandardDecorator {
    fn paint(&self, canvas: &mut Canvas, page_number: usize, total: usize) {
        if !self.options.enabled {
            return;
        }
        canvas.save();
        self.paint_ornaments(canvas);
        self.paint_logo(canvas);
        self.paint_footer(canvas, page_number, total);
        canvas.restore();
    }
}

/// Paint laid-out pages with furniture, one canvas per page
pub fn decorate(
    pages: &[LaidOutPage],
    numbering: Numbering,
    decorator: &dyn PageDecorator,
    options: &RenderOptions,
) -> Result<Vec<Canvas>> {
    let mut canvases = Vec::with_capacity(pages.len());
    for page in pages {
        let mut canvas = Canvas::new();
        paint_flow_page(&mut canvas, page, options)?;
        decorator.paint(&mut canvas, numbering.page_number(page.index), numbering.total);
        canvases.push(canvas);
    }
    Ok(canvases)
}

/// Extended pages rendered as one PDF
#[derive(Debug, Clone)]
pub struct FlowDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub protection_log: Vec<ProtectionEntry>,
    pub warnings: Vec<ComposeWarning>,
}

/// Lay out, number and paint the flow content.
///
/// `fixed_pages` is the number of template pages that precede the flow
/// pages; numbering continues after them. Returns `None` when there is no
/// flow content.
pub fn render_flow(
    elements: &[FlowElement],
    fixed_pages: usize,
    decorator: &dyn PageDecorator,
    options: &RenderOptions,
    deadline: &Deadline,
) -> Result<Option<FlowDocument>> {
    if elements.is_empty() {
        return Ok(None);
    }
    let composer = FlowComposer::new(options);

    let first = composer.layout(elements, deadline)?;
    if first.page_count == 0 {
        return Ok(None);
    }
    let numbering = Numbering {
        offset: fixed_pages,
        total: fixed_pages + first.page_count,
    };
    log::debug!(
        "Flow pass 1: {} pages, numbering {}..={}",
        first.page_count,
        numbering.page_number(1),
        numbering.total
    );

    let second = composer.layout(elements, deadline)?;
    if second.page_count != first.page_count {
        return Err(ComposeError::Config(format!(
            "flow layout is not deterministic: {} pages then {}",
            first.page_count, second.page_count
        )));
    }

    let canvases = decorate(&second.pages, numbering, decorator, options)?;
    let bytes = write_pages(canvases, options.layout.page_size, &options.title)?;

    Ok(Some(FlowDocument {
        bytes,
        page_count: second.page_count,
        protection_log: second.protection_log,
        warnings: second.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footer_template() {
        assert_eq!(format_footer("Page {page} of {total}", 3, 7), "Page 3 of 7");
        assert_eq!(format_footer("{page}/{total}", 1, 1), "1/1");
    }

    #[test]
    fn test_numbering_continues_after_fixed_pages() {
        let n = Numbering { offset: 3, total: 5 };
        assert_eq!(n.page_number(1), 4);
        assert_eq!(n.page_number(2), 5);
    }

    #[test]
    fn test_decorator_is_idempotent() {
        let options = RenderOptions::default();
        let decorator = StandardDecorator::new(&options);
        let mut a = Canvas::new();
        let mut b = Canvas::new();
        decorator.paint(&mut a, 2, 4);
        decorator.paint(&mut b, 2, 4);
        assert_eq!(a.ops(), b.ops());
        assert!(a.ops().contains("<506167652032206F662034> Tj"));
    }

    #[test]
    fn test_disabled_decorator_paints_nothing() {
        let mut options = RenderOptions::default();
        options.decorator.enabled = false;
        let decorator = StandardDecorator::new(&options);
        let mut canvas = Canvas::new();
        decorator.paint(&mut canvas, 1, 1);
        assert!(canvas.is_empty());
    }
}
