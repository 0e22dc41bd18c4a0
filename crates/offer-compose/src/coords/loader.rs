//! Template manifest loading and validation

use super::map::{CoordinateMap, Placeholder, StyleHint};
use super::origin::{Origin, to_pdf_space};
use crate::render::image_dimensions;
use crate::substitute::{ChartKind, DrawRegistry};
use crate::types::*;
use lopdf::Document;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the manifest inside a template directory
pub const MANIFEST_FILE: &str = "manifest.json";

// =============================================================================
// Manifest Format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    page_size: PageSize,
    #[serde(default)]
    origin: Origin,
    pages: Vec<ManifestPage>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestPage {
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    placeholders: BTreeMap<String, ManifestPlaceholder>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestPlaceholder {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(default)]
    font_size: Option<f32>,
    #[serde(default)]
    align: Option<Alignment>,
    #[serde(default)]
    bold: Option<bool>,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    chart: Option<ChartKind>,
}

// =============================================================================
// Loaded Template
// =============================================================================

/// What is drawn underneath a template page's placeholders
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Blank,
    /// A PDF whose first page is placed as a Form XObject
    Pdf(Arc<Vec<u8>>),
    /// A PNG or JPEG stretched to the page
    Image(Arc<Vec<u8>>),
}

#[derive(Debug, Clone)]
pub struct TemplatePage {
    /// 1-based page number within the template
    pub index: usize,
    pub background: Background,
    pub map: CoordinateMap,
}

/// A fully validated template, shared read-only across documents
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub id: String,
    pub page_size: PageSize,
    pub origin: Origin,
    pub pages: Vec<TemplatePage>,
    pub registry: DrawRegistry,
}

impl TemplateSet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every (page index, token) pair, in page then token order
    pub fn tokens(&self) -> Vec<(usize, &str)> {
        self.pages
            .iter()
            .flat_map(|page| page.map.tokens().map(move |t| (page.index, t)))
            .collect()
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loads templates from `<root>/<template_id>/manifest.json`
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    root: PathBuf,
}

impl TemplateLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load and validate a template
    pub async fn load(&self, template_id: &str) -> Result<TemplateSet> {
        if template_id.is_empty()
            || template_id.contains(['/', '\\'])
            || template_id.starts_with('.')
        {
            return Err(ComposeError::TemplateNotFound(format!(
                "invalid template id '{}'",
                template_id
            )));
        }

        let dir = self.root.join(template_id);
        let manifest_path = dir.join(MANIFEST_FILE);
        let bytes = tokio::fs::read(&manifest_path).await.map_err(|e| {
            ComposeError::TemplateNotFound(format!(
                "{}: cannot read {}: {}",
                template_id,
                manifest_path.display(),
                e
            ))
        })?;

        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
            ComposeError::MalformedCoordinateMap(format!("{}: {}", template_id, e))
        })?;

        if !manifest.page_size.is_valid() {
            return Err(ComposeError::MalformedCoordinateMap(format!(
                "{}: page size must be positive and finite",
                template_id
            )));
        }
        if manifest.pages.is_empty() {
            return Err(ComposeError::MalformedCoordinateMap(format!(
                "{}: template has no pages",
                template_id
            )));
        }

        let mut pages = Vec::with_capacity(manifest.pages.len());
        let mut registry = DrawRegistry::new();

        for (i, page) in manifest.pages.into_iter().enumerate() {
            let index = i + 1;
            let background = match &page.background {
                Some(name) => load_background(&dir, name, template_id, index).await?,
                None => Background::Blank,
            };

            let mut entries = BTreeMap::new();
            for (token, raw) in page.placeholders {
                let placeholder = validate_placeholder(
                    &token,
                    raw,
                    manifest.origin,
                    manifest.page_size,
                    index,
                )?;
                if let Some(kind) = placeholder.chart {
                    registry.register(index, &token, kind);
                }
                entries.insert(token, placeholder);
            }

            pages.push(TemplatePage {
                index,
                background,
                map: CoordinateMap::new(entries),
            });
        }

        log::debug!(
            "Loaded template '{}': {} pages, {} chart slots",
            template_id,
            pages.len(),
            registry.len()
        );

        Ok(TemplateSet {
            id: template_id.to_string(),
            page_size: manifest.page_size,
            origin: manifest.origin,
            pages,
            registry,
        })
    }
}

fn validate_placeholder(
    token: &str,
    raw: ManifestPlaceholder,
    origin: Origin,
    page_size: PageSize,
    page: usize,
) -> Result<Placeholder> {
    let malformed =
        |what: &str| ComposeError::MalformedCoordinateMap(format!("page {}, token '{}': {}", page, token, what));

    if token.trim().is_empty() {
        return Err(ComposeError::MalformedCoordinateMap(format!(
            "page {}: empty token name",
            page
        )));
    }

    let rect = Rect::new(raw.x, raw.y, raw.width, raw.height);
    if !rect.is_finite() {
        return Err(malformed("coordinates must be finite"));
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(malformed("width and height must be positive"));
    }
    if let Some(size) = raw.font_size {
        if !size.is_finite() || size <= 0.0 {
            return Err(malformed("font size must be positive"));
        }
    }
    if let Some(Color(r, g, b)) = raw.color {
        if [r, g, b].iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
            return Err(malformed("color components must be within 0..1"));
        }
    }

    Ok(Placeholder {
        rect: to_pdf_space(rect, origin, page_size.height),
        style: StyleHint {
            font_size: raw.font_size,
            align: raw.align,
            bold: raw.bold,
            color: raw.color,
        },
        chart: raw.chart,
    })
}

async fn load_background(
    dir: &Path,
    name: &str,
    template_id: &str,
    page: usize,
) -> Result<Background> {
    let path = dir.join(name);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        ComposeError::TemplateNotFound(format!(
            "{}: background for page {} ({}): {}",
            template_id,
            page,
            path.display(),
            e
        ))
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let unreadable = |e: &dyn std::fmt::Display| {
        ComposeError::MalformedCoordinateMap(format!(
            "{}: background '{}' for page {} is unreadable: {}",
            template_id, name, page, e
        ))
    };

    match extension.as_str() {
        "pdf" => {
            let doc = Document::load_mem(&bytes).map_err(|e| unreadable(&e))?;
            if doc.get_pages().is_empty() {
                return Err(unreadable(&"document has no pages"));
            }
            Ok(Background::Pdf(Arc::new(bytes)))
        }
        "png" | "jpg" | "jpeg" => {
            image_dimensions(&bytes).map_err(|e| unreadable(&e))?;
            Ok(Background::Image(Arc::new(bytes)))
        }
        other => Err(unreadable(&format!("unsupported background type '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_width() {
        let raw = ManifestPlaceholder {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 10.0,
            font_size: None,
            align: None,
            bold: None,
            color: None,
            chart: None,
        };
        let err = validate_placeholder("a", raw, Origin::TopLeft, PageSize::A4, 1).unwrap_err();
        assert!(matches!(err, ComposeError::MalformedCoordinateMap(msg) if msg.contains("'a'")));
    }

    #[test]
    fn test_converts_to_pdf_space() {
        let raw = ManifestPlaceholder {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 30.0,
            font_size: Some(12.0),
            align: Some(Alignment::Right),
            bold: None,
            color: None,
            chart: None,
        };
        let page = PageSize {
            width: 200.0,
            height: 300.0,
        };
        let p = validate_placeholder("t", raw, Origin::TopLeft, page, 1).unwrap();
        assert_eq!(p.rect, Rect::new(10.0, 250.0, 100.0, 30.0));
        assert_eq!(p.style.align, Some(Alignment::Right));
    }
}
