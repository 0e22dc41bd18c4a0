//! Drawing laid-out flow pages

use super::composer::LaidOutPage;
use super::measure::Block;
use crate::options::RenderOptions;
use crate::render::text::text_width;
use crate::render::{Canvas, DecodedImage, FontFace};
use crate::types::{Color, Rect, Result};

const ASCENT_RATIO: f32 = 0.8;
const HEADER_FILL: Color = Color(0.93, 0.93, 0.93);
const RULE_COLOR: Color = Color(0.75, 0.75, 0.75);
const FRAME_COLOR: Color = Color(0.13, 0.37, 0.62);

/// Draw every block of a laid-out page at its placed position
pub fn paint_flow_page(canvas: &mut Canvas, page: &LaidOutPage, options: &RenderOptions) -> Result<()> {
    let content = options.layout.content_rect();
    let color = options.text.color;
    let padding = options.layout.table_row_padding;

    for item in &page.items {
        let top = item.top;
        match &item.block {
            Block::Text {
                lines,
                font_size,
                bold,
                line_height,
            } => {
                let font = FontFace::from_bold(*bold);
                for (i, line) in lines.iter().enumerate() {
                    let baseline = top - font_size * ASCENT_RATIO - line_height * i as f32;
                    canvas.text(content.x, baseline, font, *font_size, color, line);
                }
            }
            Block::Image {
                data,
                width,
                height,
            } => {
                let image = DecodedImage::decode(data)?;
                canvas.draw_image(image, &Rect::new(content.x, top - height, *width, *height));
            }
            Block::Table {
                columns,
                header,
                rows,
                font_size,
                row_height,
            } => {
                let mut y = top;
                if !header.is_empty() {
                    canvas.fill_rect(
                        &Rect::new(content.x, y - row_height, content.width, *row_height),
                        HEADER_FILL,
                    );
                    draw_row(canvas, content.x, y, columns, header, *font_size, padding, FontFace::Bold, color);
                    y -= row_height;
                }
                for row in rows {
                    draw_row(canvas, content.x, y, columns, row, *font_size, padding, FontFace::Regular, color);
                    y -= row_height;
                    canvas.line((content.x, y), (content.right(), y), RULE_COLOR, 0.4);
                }
            }
            Block::Financing {
                title,
                rows,
                note,
                font_size,
                line_height,
                padding,
            } => {
                let height = item.block.height();
                let frame = Rect::new(content.x, top - height, content.width, height);
                canvas.stroke_rect(&frame, FRAME_COLOR, 1.0);

                let left = content.x + padding;
                let right = content.right() - padding;
                let mut y = top - padding;

                if let Some(title) = title {
                    let size = font_size * 1.15;
                    canvas.text(left, y - size * ASCENT_RATIO, FontFace::Bold, size, FRAME_COLOR, title);
                    y -= line_height * 1.4;
                }
                for (label, amount) in rows {
                    let baseline = y - font_size * ASCENT_RATIO;
                    canvas.text(left, baseline, FontFace::Regular, *font_size, color, label);
                    let w = text_width(amount, *font_size, true);
                    canvas.text(right - w, baseline, FontFace::Bold, *font_size, color, amount);
                    y -= line_height;
                }
                let note_size = font_size * 0.85;
                for line in note {
                    canvas.text(left, y - note_size * ASCENT_RATIO, FontFace::Regular, note_size, color, line);
                    y -= line_height * 0.85;
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_row(
    canvas: &mut Canvas,
    x: f32,
    top: f32,
    columns: &[f32],
    cells: &[String],
    font_size: f32,
    padding: f32,
    font: FontFace,
    color: Color,
) {
    let baseline = top - padding - font_size * ASCENT_RATIO;
    let mut cx = x;
    for (width, cell) in columns.iter().zip(cells) {
        canvas.text(cx + padding, baseline, font, font_size, color, cell);
        cx += width;
    }
}
