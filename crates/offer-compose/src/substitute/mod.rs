//! Placeholder substitution for fixed template pages
//!
//! Each template page is drawn as its background plus one entry per
//! placeholder. A placeholder never fails the page: anything that cannot be
//! drawn is left blank and reported as an [`ComposeWarning::UnresolvedToken`].

pub mod charts;
mod registry;

pub use registry::{ChartKind, DrawEntry, DrawFn, DrawRegistry};

use crate::collab::ChartRenderer;
use crate::constants::LINE_HEIGHT_FACTOR;
use crate::coords::{Background, Placeholder, ResolvedStyle, TemplatePage};
use crate::options::{RenderOptions, TextOverflow};
use crate::render::text::{fit_text, text_width};
use crate::render::{Canvas, DecodedImage, FontFace, write_pages};
use crate::types::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Share of the font size above the baseline
const ASCENT_RATIO: f32 = 0.8;

/// Baseline offset below the box middle that centers capital letters
const CAP_CENTER_RATIO: f32 = 0.35;

// =============================================================================
// Values
// =============================================================================

/// A display value for one token
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Already formatted text
    Text(String),
    /// PNG or JPEG bytes
    Image(Arc<Vec<u8>>),
    /// Numeric payload for a registered chart routine
    Series(Vec<f64>),
    /// Chart rendered to an image by the chart collaborator
    Chart { key: String, series: Vec<f64> },
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Image(_) => "image",
            Value::Series(_) => "series",
            Value::Chart { .. } => "chart",
        }
    }
}

/// Token to value mapping for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable {
    values: BTreeMap<String, Value>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(token.into(), value)
    }

    pub fn get(&self, token: &str) -> Option<&Value> {
        self.values.get(token)
    }

    /// Insert every entry of `other`, replacing existing tokens
    pub fn merge(&mut self, other: ValueTable) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueTable {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// =============================================================================
// Page Rendering
// =============================================================================

/// A fixed page rendered as a standalone single-page PDF
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub bytes: Vec<u8>,
    pub warnings: Vec<ComposeWarning>,
}

/// Render one template page into a single-page PDF
pub fn render_page(
    page: &TemplatePage,
    registry: &DrawRegistry,
    values: &ValueTable,
    page_size: PageSize,
    options: &RenderOptions,
    charts: &dyn ChartRenderer,
) -> Result<RenderedPage> {
    let (canvas, warnings) = paint_page(page, registry, values, page_size, options, charts)?;
    let bytes = write_pages(vec![canvas], page_size, &options.title)?;
    Ok(RenderedPage { bytes, warnings })
}

/// Draw a template page onto a fresh canvas.
///
/// Only a broken background is an error; backgrounds were validated when the
/// template loaded.
pub fn paint_page(
    page: &TemplatePage,
    registry: &DrawRegistry,
    values: &ValueTable,
    page_size: PageSize,
    options: &RenderOptions,
    charts: &dyn ChartRenderer,
) -> Result<(Canvas, Vec<ComposeWarning>)> {
    let mut canvas = Canvas::new();
    let mut warnings = Vec::new();
    let full_page = Rect::new(0.0, 0.0, page_size.width, page_size.height);

    match &page.background {
        Background::Blank => {}
        Background::Pdf(bytes) => canvas.draw_pdf_page(bytes, &full_page)?,
        Background::Image(bytes) => canvas.draw_image(DecodedImage::decode(bytes)?, &full_page),
    }

    for (token, placeholder) in page.map.iter() {
        let Some(value) = values.get(token) else {
            log::debug!("No value for token '{}' on page {}", token, page.index);
            warnings.push(ComposeWarning::UnresolvedToken {
                page: page.index,
                token: token.to_string(),
                reason: "no value supplied".to_string(),
            });
            continue;
        };

        let mut unresolved = |reason: String| {
            log::warn!(
                "Unresolved token '{}' on page {}: {}",
                token,
                page.index,
                reason
            );
            warnings.push(ComposeWarning::UnresolvedToken {
                page: page.index,
                token: token.to_string(),
                reason,
            });
        };

        let entry = registry.lookup(page.index, token);
        match (value, entry) {
            (Value::Series(series), Some(entry)) => {
                if entry.accepts(series) {
                    canvas.save();
                    (entry.draw)(&mut canvas, &placeholder.rect, series, &options.charts);
                    canvas.restore();
                } else {
                    unresolved(format!(
                        "chart payload of {} values does not fit the slot",
                        series.len()
                    ));
                }
            }
            (Value::Series(_), None) => {
                unresolved("series value for a slot without a chart routine".to_string())
            }
            (Value::Text(_), Some(_)) => {
                unresolved(format!("{} value for a chart slot", value.kind_name()))
            }
            (Value::Text(text), None) => {
                let style = placeholder.style.resolve(&options.text);
                draw_text(&mut canvas, text, placeholder, &style, options.text.overflow);
            }
            (Value::Image(bytes), _) => {
                if let Err(e) = draw_fitted_image(&mut canvas, bytes, &placeholder.rect) {
                    unresolved(format!("image could not be decoded: {}", e));
                }
            }
            (Value::Chart { key, series }, _) => match charts.render(key, series) {
                Ok(bytes) => {
                    if let Err(e) = draw_fitted_image(&mut canvas, &bytes, &placeholder.rect) {
                        unresolved(format!("chart '{}' image could not be decoded: {}", key, e));
                    }
                }
                Err(e) => unresolved(format!("chart '{}' unavailable: {}", key, e)),
            },
        }
    }

    log::debug!(
        "Painted template page {} ({} placeholders, {} unresolved)",
        page.index,
        page.map.len(),
        warnings.len()
    );
    Ok((canvas, warnings))
}

/// Draw text inside a placeholder using the overflow policy
pub fn draw_text(
    canvas: &mut Canvas,
    text: &str,
    placeholder: &Placeholder,
    style: &ResolvedStyle,
    overflow: TextOverflow,
) {
    let rect = &placeholder.rect;
    let size = style.font_size;
    let line_height = size * LINE_HEIGHT_FACTOR;
    let lines = fit_text(text, rect.width, rect.height, size, line_height, style.bold, overflow);
    let font = FontFace::from_bold(style.bold);

    // A single line sits in the vertical middle; wrapped text hangs from the top
    let first_baseline = if lines.len() == 1 {
        rect.center_y() - size * CAP_CENTER_RATIO
    } else {
        rect.top() - size * ASCENT_RATIO
    };

    for (i, line) in lines.iter().enumerate() {
        let width = text_width(line, size, style.bold);
        let x = match style.align {
            Alignment::Left => rect.x,
            Alignment::Center => rect.x + (rect.width - width) / 2.0,
            Alignment::Right => rect.right() - width,
        };
        let baseline = first_baseline - line_height * i as f32;
        canvas.text(x, baseline, font, size, style.color, line);
    }
}

/// Decode an image and place it centered inside `rect`, keeping its aspect
pub fn draw_fitted_image(canvas: &mut Canvas, bytes: &[u8], rect: &Rect) -> Result<()> {
    let image = DecodedImage::decode(bytes)?;
    let target = rect.fit_aspect(image.width as f32, image.height as f32);
    canvas.draw_image(image, &target);
    Ok(())
}
