//! Text measurement, encoding and line fitting for the standard Helvetica faces

use crate::constants::{BOLD_WIDTH_FACTOR, ELLIPSIS};
use crate::options::TextOverflow;

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Width used for glyphs outside the ASCII table
const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(ch: char) -> u16 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        HELVETICA_WIDTHS[(code - 32) as usize]
    } else if ch == ELLIPSIS {
        1000
    } else {
        FALLBACK_WIDTH
    }
}

/// Width of `text` in points at `font_size`
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c) as u32).sum();
    let width = units as f32 / 1000.0 * font_size;
    if bold { width * BOLD_WIDTH_FACTOR } else { width }
}

/// Encode text for a WinAnsiEncoding simple font.
///
/// Latin-1 maps directly; the handful of WinAnsi specials in 0x80..0x9F are
/// translated; anything else becomes '?'.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2030}' => 0x89,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Hex string operand for a content stream: `<48656C6C6F>`
pub fn hex_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2 + 2);
    out.push('<');
    for byte in encode_win_ansi(text) {
        out.push_str(&format!("{:02X}", byte));
    }
    out.push('>');
    out
}

/// Cut `text` so that it, plus an ellipsis, fits `max_width`.
///
/// Returns the text unchanged when it already fits. When not even the
/// ellipsis fits, returns an empty string.
pub fn truncate_to_width(text: &str, max_width: f32, font_size: f32, bold: bool) -> String {
    if text_width(text, font_size, bold) <= max_width {
        return text.to_string();
    }

    let ellipsis_width = text_width(&ELLIPSIS.to_string(), font_size, bold);
    if ellipsis_width > max_width {
        return String::new();
    }

    let mut out = String::new();
    let mut width = ellipsis_width;
    for ch in text.chars() {
        let w = text_width(&ch.to_string(), font_size, bold);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(ch);
    }
    let trimmed = out.trim_end();
    format!("{}{}", trimmed, ELLIPSIS)
}

/// Break `text` into lines no wider than `max_width`, on word boundaries.
///
/// Explicit newlines are kept. A single word wider than the line is truncated
/// with an ellipsis rather than split mid-word.
pub fn wrap_lines(text: &str, max_width: f32, font_size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, font_size, bold) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = truncate_to_width(word, max_width, font_size, bold);
        }
        lines.push(current);
    }

    // A trailing empty line from "text\n" carries no content
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// Fit `text` into a `width` × `height` box.
///
/// With [`TextOverflow::Wrap`], text wraps while whole lines fit the height;
/// the last visible line is truncated with an ellipsis if text remains. With
/// [`TextOverflow::Truncate`], or when the box is only one line tall, the
/// result is a single truncated line. Always returns at least one line.
pub fn fit_text(
    text: &str,
    width: f32,
    height: f32,
    font_size: f32,
    line_height: f32,
    bold: bool,
    overflow: TextOverflow,
) -> Vec<String> {
    let max_lines = if line_height > 0.0 {
        ((height / line_height).floor() as usize).max(1)
    } else {
        1
    };

    if overflow == TextOverflow::Truncate || max_lines == 1 {
        let single = text.split_whitespace().collect::<Vec<_>>().join(" ");
        return vec![truncate_to_width(&single, width, font_size, bold)];
    }

    let mut lines = wrap_lines(text, width, font_size, bold);
    if lines.len() > max_lines {
        let rest = lines.split_off(max_lines - 1);
        let joined = rest.join(" ");
        let forced = format!("{}{}", joined, ELLIPSIS);
        let last = if text_width(&joined, font_size, bold) <= width {
            truncate_to_width(&forced, width, font_size, bold)
        } else {
            truncate_to_width(&joined, width, font_size, bold)
        };
        lines.push(last);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_uses_metrics() {
        // "i" is narrow, "W" is wide
        assert!(text_width("iii", 10.0, false) < text_width("WWW", 10.0, false));
        assert!((text_width("0", 10.0, false) - 5.56).abs() < 1e-4);
    }

    #[test]
    fn test_encode_euro_and_umlaut() {
        assert_eq!(encode_win_ansi("€ü"), vec![0x80, 0xFC]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), vec![b'?']);
    }

    #[test]
    fn test_truncate_fits_width() {
        let out = truncate_to_width("A very long customer name", 60.0, 10.0, false);
        assert!(out.ends_with(ELLIPSIS));
        assert!(text_width(&out, 10.0, false) <= 60.0);
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_to_width("ok", 100.0, 10.0, false), "ok");
    }

    #[test]
    fn test_wrap_on_words() {
        let lines = wrap_lines("alpha beta gamma delta", 60.0, 10.0, false);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 60.0);
        }
    }

    #[test]
    fn test_fit_text_limits_lines() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let lines = fit_text(text, 50.0, 25.0, 10.0, 12.5, false, TextOverflow::Wrap);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(ELLIPSIS));
    }

    #[test]
    fn test_fit_text_single_line_box() {
        let lines = fit_text("wrapped text here", 30.0, 10.0, 10.0, 12.5, false, TextOverflow::Wrap);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(ELLIPSIS));
    }
}
