use crate::options::TextOptions;
use crate::substitute::ChartKind;
use crate::types::{Alignment, Color, Rect};
use std::collections::BTreeMap;

/// Optional text styling attached to a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleHint {
    pub font_size: Option<f32>,
    pub align: Option<Alignment>,
    pub bold: Option<bool>,
    pub color: Option<Color>,
}

/// A style hint with every field filled in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub font_size: f32,
    pub align: Alignment,
    pub bold: bool,
    pub color: Color,
}

impl StyleHint {
    /// Fill unset fields from the document text defaults
    pub fn resolve(&self, defaults: &TextOptions) -> ResolvedStyle {
        ResolvedStyle {
            font_size: self.font_size.unwrap_or(defaults.default_font_size),
            align: self.align.unwrap_or_default(),
            bold: self.bold.unwrap_or(false),
            color: self.color.unwrap_or(defaults.color),
        }
    }
}

/// Where and how one token is drawn
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    /// Target rectangle in PDF space
    pub rect: Rect,
    pub style: StyleHint,
    /// Set when the slot is drawn by a registered chart routine
    pub chart: Option<ChartKind>,
}

/// Token to placeholder mapping for one template page.
///
/// Iteration is in token order so rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateMap {
    entries: BTreeMap<String, Placeholder>,
}

impl CoordinateMap {
    pub fn new(entries: BTreeMap<String, Placeholder>) -> Self {
        Self { entries }
    }

    pub fn get(&self, token: &str) -> Option<&Placeholder> {
        self.entries.get(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Placeholder)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
