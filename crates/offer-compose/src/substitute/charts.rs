//! Derived chart geometry and built-in draw routines
//!
//! Geometry helpers are pure so they can be checked without rendering.

use crate::constants::{DONUT_RING_RATIO, ZERO_EPSILON};
use crate::options::ChartOptions;
use crate::render::text::text_width;
use crate::render::{Canvas, FontFace};
use crate::types::{Color, Rect};

// =============================================================================
// Geometry
// =============================================================================

/// Bar heights scaled against the largest magnitude.
///
/// `|value| / max × rect_height × fill_ratio`; bars whose value is zero, or
/// every bar when the maximum is zero, get `min_visible`. No bar is shorter
/// than `min_visible`.
pub fn bar_heights(values: &[f64], rect_height: f32, fill_ratio: f32, min_visible: f32) -> Vec<f32> {
    let max = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    values
        .iter()
        .map(|v| {
            if max < ZERO_EPSILON || !v.is_finite() || v.abs() < ZERO_EPSILON {
                min_visible
            } else {
                let h = (v.abs() / max) as f32 * rect_height * fill_ratio;
                h.max(min_visible)
            }
        })
        .collect()
}

/// Ring sweep in degrees for a percentage, clamped to [0, 100]
pub fn donut_sweep(percent: f64) -> f32 {
    if !percent.is_finite() {
        return 0.0;
    }
    (percent.clamp(0.0, 100.0) * 3.6) as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterfallStep {
    Start,
    Increase,
    Decrease,
    End,
}

/// One floating bar, spanning `low..high` in value units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallBar {
    pub low: f64,
    pub high: f64,
    pub step: WaterfallStep,
}

/// Floating bars for `[start, delta, ..., end]`.
///
/// Start and end stand on zero; each delta floats from the running total.
/// Returns nothing for fewer than two values.
pub fn waterfall(values: &[f64]) -> Vec<WaterfallBar> {
    if values.len() < 2 {
        return Vec::new();
    }
    let clean = |v: f64| if v.is_finite() { v } else { 0.0 };
    let start = clean(values[0]);
    let end = clean(values[values.len() - 1]);

    let mut bars = vec![WaterfallBar {
        low: start.min(0.0),
        high: start.max(0.0),
        step: WaterfallStep::Start,
    }];

    let mut running = start;
    for delta in &values[1..values.len() - 1] {
        let delta = clean(*delta);
        let next = running + delta;
        bars.push(WaterfallBar {
            low: running.min(next),
            high: running.max(next),
            step: if delta < 0.0 {
                WaterfallStep::Decrease
            } else {
                WaterfallStep::Increase
            },
        });
        running = next;
    }

    bars.push(WaterfallBar {
        low: end.min(0.0),
        high: end.max(0.0),
        step: WaterfallStep::End,
    });
    bars
}

// =============================================================================
// Draw Routines
// =============================================================================

/// Two concentric rings: outer shows `values[0]` %, inner `values[1]` %
pub fn draw_dual_donut(canvas: &mut Canvas, rect: &Rect, values: &[f64], options: &ChartOptions) {
    let outer = rect.width.min(rect.height) / 2.0;
    let thickness = outer * DONUT_RING_RATIO;
    let gap = thickness * 0.3;
    let (cx, cy) = (rect.center_x(), rect.center_y());

    let rings = [
        (outer, values.first().copied().unwrap_or(0.0), options.primary),
        (
            outer - thickness - gap,
            values.get(1).copied().unwrap_or(0.0),
            options.secondary,
        ),
    ];

    for (radius, percent, color) in rings {
        let inner = radius - thickness;
        if inner <= 0.0 {
            continue;
        }
        canvas.fill_ring_segment(cx, cy, radius, inner, 0.0, 360.0, options.track);
        // Clockwise from twelve o'clock
        canvas.fill_ring_segment(cx, cy, radius, inner, 90.0, -donut_sweep(percent), color);
    }

    if options.show_labels {
        if let Some(first) = values.first() {
            let shown = if first.is_finite() { first.clamp(0.0, 100.0) } else { 0.0 };
            let label = format!("{:.0}%", shown);
            let size = options.label_font_size;
            let w = text_width(&label, size, true);
            canvas.text(cx - w / 2.0, cy - size * 0.35, FontFace::Bold, size, options.primary, &label);
        }
    }
}

/// Floating bars for `[start, delta1, delta2, end]`
pub fn draw_waterfall(canvas: &mut Canvas, rect: &Rect, values: &[f64], options: &ChartOptions) {
    let bars = waterfall(values);
    if bars.is_empty() {
        return;
    }

    let lo = bars.iter().fold(0.0_f64, |acc, b| acc.min(b.low));
    let hi = bars.iter().fold(0.0_f64, |acc, b| acc.max(b.high));
    let range = hi - lo;
    let usable = rect.height * options.bar_fill_ratio;
    let to_y = |v: f64| {
        if range < ZERO_EPSILON {
            rect.y
        } else {
            rect.y + ((v - lo) / range) as f32 * usable
        }
    };

    let slot = rect.width / bars.len() as f32;
    let bar_width = slot * 0.6;
    let mut previous_top: Option<(f32, f32)> = None;

    for (i, bar) in bars.iter().enumerate() {
        let x = rect.x + slot * i as f32 + (slot - bar_width) / 2.0;
        let y0 = to_y(bar.low);
        let height = (to_y(bar.high) - y0).max(options.min_bar_height);
        let color = match bar.step {
            WaterfallStep::Start | WaterfallStep::End => options.primary,
            WaterfallStep::Increase => options.positive,
            WaterfallStep::Decrease => options.negative,
        };
        canvas.fill_rect(&Rect::new(x, y0, bar_width, height), color);

        let running_y = match bar.step {
            WaterfallStep::Decrease => y0,
            _ => y0 + height,
        };
        if let Some((px, py)) = previous_top {
            canvas.line((px, py), (x, py), options.track, 0.5);
        }
        previous_top = Some((x + bar_width, running_y));

        if options.show_labels {
            let raw = match bar.step {
                WaterfallStep::Start | WaterfallStep::End => bar.high.max(bar.low.abs()),
                _ => bar.high - bar.low,
            };
            label_above(canvas, x + bar_width / 2.0, y0 + height, raw, options);
        }
    }
}

/// One column stacked from the non-negative values
pub fn draw_stacked_bars(canvas: &mut Canvas, rect: &Rect, values: &[f64], options: &ChartOptions) {
    let total: f64 = values.iter().filter(|v| v.is_finite() && **v > 0.0).sum();
    let width = rect.width * 0.5;
    let x = rect.x + (rect.width - width) / 2.0;
    let usable = rect.height * options.bar_fill_ratio;

    if total < ZERO_EPSILON {
        canvas.fill_rect(&Rect::new(x, rect.y, width, options.min_bar_height), options.track);
        return;
    }

    let palette = [options.primary, options.secondary, options.positive, options.negative];
    let mut y = rect.y;
    for (i, value) in values.iter().enumerate() {
        if !value.is_finite() || *value <= 0.0 {
            continue;
        }
        let h = (value / total) as f32 * usable;
        canvas.fill_rect(&Rect::new(x, y, width, h), palette[i % palette.len()]);
        y += h;
    }

    if options.show_labels {
        label_above(canvas, x + width / 2.0, y, total, options);
    }
}

/// Side-by-side bars sharing one scale
pub fn draw_bars(canvas: &mut Canvas, rect: &Rect, values: &[f64], options: &ChartOptions) {
    if values.is_empty() {
        return;
    }
    let heights = bar_heights(
        values,
        rect.height,
        options.bar_fill_ratio,
        options.min_bar_height,
    );
    let slot = rect.width / values.len() as f32;
    let bar_width = slot * 0.7;

    for (i, (value, height)) in values.iter().zip(&heights).enumerate() {
        let x = rect.x + slot * i as f32 + (slot - bar_width) / 2.0;
        let color = if *value < 0.0 {
            options.negative
        } else if i % 2 == 0 {
            options.primary
        } else {
            options.secondary
        };
        canvas.fill_rect(&Rect::new(x, rect.y, bar_width, *height), color);
        if options.show_labels {
            label_above(canvas, x + bar_width / 2.0, rect.y + height, *value, options);
        }
    }
}

fn label_above(canvas: &mut Canvas, center_x: f32, top: f32, value: f64, options: &ChartOptions) {
    let label = format!("{:.0}", value);
    let size = options.label_font_size;
    let w = text_width(&label, size, false);
    canvas.text(
        center_x - w / 2.0,
        top + size * 0.4,
        FontFace::Regular,
        size,
        Color::BLACK,
        &label,
    );
}
