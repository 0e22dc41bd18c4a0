//! Measuring flow elements into sized, splittable blocks

use super::element::{FlowElement, FlowKind};
use crate::constants::LINE_HEIGHT_FACTOR;
use crate::options::LayoutOptions;
use crate::render::image_dimensions;
use crate::render::text::{truncate_to_width, wrap_lines};
use std::sync::Arc;

/// Notes in financing blocks are set smaller than the rows
const NOTE_SCALE: f32 = 0.85;

/// An element measured against the content width
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text {
        lines: Vec<String>,
        font_size: f32,
        bold: bool,
        line_height: f32,
    },
    Image {
        data: Arc<Vec<u8>>,
        width: f32,
        height: f32,
    },
    Table {
        /// Absolute column widths in points
        columns: Vec<f32>,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        font_size: f32,
        row_height: f32,
    },
    Financing {
        /// `None` on continuation pieces
        title: Option<String>,
        rows: Vec<(String, String)>,
        note: Vec<String>,
        font_size: f32,
        line_height: f32,
        padding: f32,
    },
}

impl Block {
    pub fn height(&self) -> f32 {
        match self {
            Block::Text {
                lines, line_height, ..
            } => lines.len() as f32 * line_height,
            Block::Image { height, .. } => *height,
            Block::Table {
                header,
                rows,
                row_height,
                ..
            } => {
                let header_rows = if header.is_empty() { 0 } else { 1 };
                (header_rows + rows.len()) as f32 * row_height
            }
            Block::Financing {
                title,
                rows,
                note,
                line_height,
                padding,
                ..
            } => {
                let title_h = if title.is_some() { *line_height * 1.4 } else { 0.0 };
                2.0 * padding
                    + title_h
                    + rows.len() as f32 * line_height
                    + note.len() as f32 * line_height * NOTE_SCALE
            }
        }
    }

    /// Height of the smallest first piece [`Block::split`] can produce
    pub fn min_slice(&self) -> f32 {
        match self {
            Block::Text {
                lines, line_height, ..
            } if lines.len() > 1 => *line_height,
            Block::Table {
                header,
                rows,
                row_height,
                ..
            } if rows.len() > 1 => {
                let header_rows = if header.is_empty() { 1.0 } else { 2.0 };
                header_rows * row_height
            }
            Block::Financing {
                title,
                rows,
                line_height,
                padding,
                ..
            } if !rows.is_empty() => {
                let title_h = if title.is_some() { *line_height * 1.4 } else { 0.0 };
                2.0 * padding + title_h + line_height
            }
            _ => self.height(),
        }
    }

    /// Split into a first piece no taller than `available` and the rest.
    ///
    /// Paragraphs split between lines, tables between rows (the header is
    /// repeated on the rest), financing blocks between rows. Returns `None`
    /// when nothing fits or nothing would remain.
    pub fn split(&self, available: f32) -> Option<(Block, Block)> {
        match self {
            Block::Text {
                lines,
                font_size,
                bold,
                line_height,
            } => {
                let n = (available / line_height).floor() as usize;
                if n == 0 || n >= lines.len() {
                    return None;
                }
                let make = |lines: Vec<String>| Block::Text {
                    lines,
                    font_size: *font_size,
                    bold: *bold,
                    line_height: *line_height,
                };
                Some((make(lines[..n].to_vec()), make(lines[n..].to_vec())))
            }
            Block::Table {
                columns,
                header,
                rows,
                font_size,
                row_height,
            } => {
                let header_h = if header.is_empty() { 0.0 } else { *row_height };
                let n = ((available - header_h) / row_height).floor();
                if n < 1.0 || n as usize >= rows.len() {
                    return None;
                }
                let n = n as usize;
                let make = |rows: Vec<Vec<String>>| Block::Table {
                    columns: columns.clone(),
                    header: header.clone(),
                    rows,
                    font_size: *font_size,
                    row_height: *row_height,
                };
                Some((make(rows[..n].to_vec()), make(rows[n..].to_vec())))
            }
            Block::Financing {
                title,
                rows,
                note,
                font_size,
                line_height,
                padding,
            } => {
                let title_h = if title.is_some() { *line_height * 1.4 } else { 0.0 };
                let n = ((available - 2.0 * padding - title_h) / line_height).floor();
                if n < 1.0 {
                    return None;
                }
                let n = (n as usize).min(rows.len());
                if n == 0 || n == rows.len() && note.is_empty() {
                    return None;
                }
                let head = Block::Financing {
                    title: title.clone(),
                    rows: rows[..n].to_vec(),
                    note: Vec::new(),
                    font_size: *font_size,
                    line_height: *line_height,
                    padding: *padding,
                };
                let rest = Block::Financing {
                    title: None,
                    rows: rows[n..].to_vec(),
                    note: note.clone(),
                    font_size: *font_size,
                    line_height: *line_height,
                    padding: *padding,
                };
                Some((head, rest))
            }
            Block::Image { .. } => None,
        }
    }
}

/// Measures elements for one layout configuration
pub struct Measurer<'a> {
    layout: &'a LayoutOptions,
    width: f32,
    max_image_height: f32,
}

impl<'a> Measurer<'a> {
    /// `max_image_height` is the tallest an image may be and still fit a
    /// fresh page
    pub fn new(layout: &'a LayoutOptions, max_image_height: f32) -> Self {
        Self {
            layout,
            width: layout.content_rect().width,
            max_image_height,
        }
    }

    /// Measure one element; `Err` carries the reason it cannot be drawn
    pub fn measure(&self, element: &FlowElement) -> std::result::Result<Block, String> {
        let layout = self.layout;
        match &element.kind {
            FlowKind::Heading { text, level } => {
                let size = layout.heading_font_size(*level);
                Ok(Block::Text {
                    lines: wrap_lines(text, self.width, size, true),
                    font_size: size,
                    bold: true,
                    line_height: size * LINE_HEIGHT_FACTOR,
                })
            }
            FlowKind::Paragraph { text } => {
                let size = layout.body_font_size;
                Ok(Block::Text {
                    lines: wrap_lines(text, self.width, size, false),
                    font_size: size,
                    bold: false,
                    line_height: size * LINE_HEIGHT_FACTOR,
                })
            }
            FlowKind::Image { data, height } => {
                let (px_w, px_h) = image_dimensions(data).map_err(|e| e.to_string())?;
                if px_w == 0 || px_h == 0 || !height.is_finite() || *height <= 0.0 {
                    return Err("image has no area".to_string());
                }
                let aspect = px_w as f32 / px_h as f32;
                let mut h = height.min(self.max_image_height);
                let mut w = h * aspect;
                if w > self.width {
                    w = self.width;
                    h = w / aspect;
                }
                Ok(Block::Image {
                    data: Arc::clone(data),
                    width: w,
                    height: h,
                })
            }
            FlowKind::Table {
                columns,
                header,
                rows,
            } => {
                let size = layout.table_font_size;
                let count = header
                    .len()
                    .max(rows.iter().map(Vec::len).max().unwrap_or(0))
                    .max(1);
                let widths = column_widths(columns, count, self.width);
                let cell = |row: &Vec<String>| -> Vec<String> {
                    (0..count)
                        .map(|i| {
                            let text = row.get(i).map(String::as_str).unwrap_or("");
                            truncate_to_width(text, widths[i] - 2.0 * layout.table_row_padding, size, false)
                        })
                        .collect()
                };
                Ok(Block::Table {
                    header: if header.is_empty() {
                        Vec::new()
                    } else {
                        cell(header)
                    },
                    rows: rows.iter().map(cell).collect(),
                    columns: widths,
                    font_size: size,
                    row_height: size * LINE_HEIGHT_FACTOR + 2.0 * layout.table_row_padding,
                })
            }
            FlowKind::FinancingBlock { title, rows, note } => {
                let size = layout.body_font_size;
                let padding = layout.table_row_padding * 2.0;
                let inner = self.width - 2.0 * padding;
                let note_lines = match note {
                    Some(n) => wrap_lines(n, inner, size * NOTE_SCALE, false),
                    None => Vec::new(),
                };
                Ok(Block::Financing {
                    title: Some(title.clone()),
                    rows: rows.clone(),
                    note: note_lines,
                    font_size: size,
                    line_height: size * LINE_HEIGHT_FACTOR,
                    padding,
                })
            }
        }
    }
}

/// Scale relative column weights to `total` width
fn column_widths(weights: &[f32], count: usize, total: f32) -> Vec<f32> {
    let valid = weights.len() == count && weights.iter().all(|w| w.is_finite() && *w > 0.0);
    if !valid {
        return vec![total / count as f32; count];
    }
    let sum: f32 = weights.iter().sum();
    weights.iter().map(|w| w / sum * total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_block(n: usize) -> Block {
        Block::Text {
            lines: (0..n).map(|i| format!("line {}", i)).collect(),
            font_size: 10.0,
            bold: false,
            line_height: 12.5,
        }
    }

    #[test]
    fn test_paragraph_splits_between_lines() {
        let (head, rest) = text_block(10).split(40.0).unwrap();
        assert_eq!(head.height(), 3.0 * 12.5);
        assert_eq!(rest.height(), 7.0 * 12.5);
        assert!(text_block(2).split(100.0).is_none());
        assert!(text_block(2).split(5.0).is_none());
    }

    #[test]
    fn test_table_split_repeats_header() {
        let table = Block::Table {
            columns: vec![100.0, 100.0],
            header: vec!["A".into(), "B".into()],
            rows: (0..6).map(|i| vec![i.to_string(), "x".into()]).collect(),
            font_size: 9.0,
            row_height: 20.0,
        };
        let (head, rest) = table.split(65.0).unwrap();
        match (&head, &rest) {
            (Block::Table { rows: h, header: hh, .. }, Block::Table { rows: r, header: rh, .. }) => {
                assert_eq!(h.len(), 2);
                assert_eq!(r.len(), 4);
                assert_eq!(hh, rh);
            }
            _ => panic!("expected tables"),
        }
        assert_eq!(table.min_slice(), 40.0);
    }

    #[test]
    fn test_column_widths_fall_back_to_equal() {
        assert_eq!(column_widths(&[1.0, 3.0], 2, 100.0), vec![25.0, 75.0]);
        assert_eq!(column_widths(&[], 4, 100.0), vec![25.0; 4]);
    }
}
