use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Malformed coordinate map: {0}")]
    MalformedCoordinateMap(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("No pages in document")]
    NoPages,
    #[error("Unreadable document: {0}")]
    Unreadable(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Job error: {0}")]
    Job(String),
    #[error("Document generation timed out")]
    Timeout,
    #[error("Document generation cancelled")]
    Cancelled,
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Recoverable problems collected while composing a document.
///
/// None of these abort the document; they are logged where they occur and
/// reported alongside the finished bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposeWarning {
    /// A placeholder could not be filled and was left blank
    UnresolvedToken {
        page: usize,
        token: String,
        reason: String,
    },
    /// An attachment was missing or not a readable PDF and was skipped
    MissingAttachment { name: String, reason: String },
    /// A protection group taller than a page fell back to natural splitting
    OversizedProtectionGroup {
        group: String,
        height: f32,
        capacity: f32,
    },
}

impl fmt::Display for ComposeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeWarning::UnresolvedToken {
                page,
                token,
                reason,
            } => write!(f, "unresolved token '{}' on page {}: {}", token, page, reason),
            ComposeWarning::MissingAttachment { name, reason } => {
                write!(f, "skipped attachment '{}': {}", name, reason)
            }
            ComposeWarning::OversizedProtectionGroup {
                group,
                height,
                capacity,
            } => write!(
                f,
                "protection group '{}' ({:.1}pt) exceeds page capacity ({:.1}pt), split naturally",
                group, height, capacity
            ),
        }
    }
}

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate (bottom-left origin)
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Largest rect with the given aspect ratio centered inside this one
    pub fn fit_aspect(&self, content_width: f32, content_height: f32) -> Rect {
        if content_width <= 0.0 || content_height <= 0.0 {
            return *self;
        }
        let scale = (self.width / content_width).min(self.height / content_height);
        let w = content_width * scale;
        let h = content_height * scale;
        Rect::new(
            self.x + (self.width - w) / 2.0,
            self.y + (self.height - h) / 2.0,
            w,
            h,
        )
    }
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4 portrait
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Horizontal text alignment inside a placeholder rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// RGB color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const BLACK: Color = Color(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color(1.0, 1.0, 1.0);

    pub fn fill_op(&self) -> String {
        format!("{} {} {} rg\n", fmt_num(self.0), fmt_num(self.1), fmt_num(self.2))
    }

    pub fn stroke_op(&self) -> String {
        format!("{} {} {} RG\n", fmt_num(self.0), fmt_num(self.1), fmt_num(self.2))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Format a number for a content stream: at most three decimals, no
/// trailing zeros, never exponent notation.
pub fn fmt_num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num_trims() {
        assert_eq!(fmt_num(1.5), "1.5");
        assert_eq!(fmt_num(2.0), "2");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(f32::NAN), "0");
        assert_eq!(fmt_num(12.3456), "12.346");
    }

    #[test]
    fn test_fit_aspect_centers() {
        let r = Rect::new(0.0, 0.0, 200.0, 100.0);
        let fitted = r.fit_aspect(50.0, 50.0);
        assert_eq!(fitted, Rect::new(50.0, 0.0, 100.0, 100.0));
    }
}
