//! Derived chart dispatch
//!
//! Placeholders that carry a `chart` kind in the manifest are drawn by a
//! routine from this registry instead of as text. The registry is built once
//! when the template loads and never changes afterwards.

use super::charts;
use crate::options::ChartOptions;
use crate::render::Canvas;
use crate::types::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Draws a chart from a numeric payload into a PDF-space rectangle
pub type DrawFn = fn(&mut Canvas, &Rect, &[f64], &ChartOptions);

/// Built-in chart routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Two concentric percentage rings
    DualDonut,
    /// Start, two deltas and end amount as floating bars
    Waterfall,
    /// One column stacked from n values
    StackedBars,
    /// n side-by-side bars
    Bars,
}

impl ChartKind {
    pub fn draw_fn(self) -> DrawFn {
        match self {
            ChartKind::DualDonut => charts::draw_dual_donut,
            ChartKind::Waterfall => charts::draw_waterfall,
            ChartKind::StackedBars => charts::draw_stacked_bars,
            ChartKind::Bars => charts::draw_bars,
        }
    }

    /// Number of values the routine needs, if fixed
    pub fn arity(self) -> Option<usize> {
        match self {
            ChartKind::DualDonut => Some(2),
            ChartKind::Waterfall => Some(4),
            ChartKind::StackedBars | ChartKind::Bars => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawEntry {
    pub draw: DrawFn,
    pub arity: Option<usize>,
}

impl DrawEntry {
    /// Whether `values` is a payload this routine can draw
    pub fn accepts(&self, values: &[f64]) -> bool {
        match self.arity {
            Some(n) => values.len() == n,
            None => !values.is_empty(),
        }
    }
}

/// Registry keyed by (1-based page index, token)
#[derive(Debug, Clone, Default)]
pub struct DrawRegistry {
    entries: HashMap<(usize, String), DrawEntry>,
}

impl DrawRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in routine for a slot
    pub fn register(&mut self, page: usize, token: &str, kind: ChartKind) {
        self.entries.insert(
            (page, token.to_string()),
            DrawEntry {
                draw: kind.draw_fn(),
                arity: kind.arity(),
            },
        );
    }

    pub fn lookup(&self, page: usize, token: &str) -> Option<&DrawEntry> {
        self.entries.get(&(page, token.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_per_page() {
        let mut registry = DrawRegistry::new();
        registry.register(2, "savings", ChartKind::DualDonut);
        assert!(registry.lookup(2, "savings").is_some());
        assert!(registry.lookup(1, "savings").is_none());
    }

    #[test]
    fn test_arity_checks_payload() {
        let mut registry = DrawRegistry::new();
        registry.register(1, "w", ChartKind::Waterfall);
        let entry = registry.lookup(1, "w").unwrap();
        assert!(entry.accepts(&[1.0, 2.0, 3.0, 6.0]));
        assert!(!entry.accepts(&[1.0, 2.0]));
    }
}
