use crate::constants::*;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Rendering configuration for one document or one batch run.
///
/// Built once and passed by reference through the whole pipeline; nothing in
/// the engine reads configuration from anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Title written into the output document info dictionary
    pub title: String,
    pub layout: LayoutOptions,
    pub text: TextOptions,
    pub charts: ChartOptions,
    pub decorator: DecoratorOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Offer".to_string(),
            layout: LayoutOptions::default(),
            text: TextOptions::default(),
            charts: ChartOptions::default(),
            decorator: DecoratorOptions::default(),
        }
    }
}

/// Geometry of the flow-composed extended pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub page_size: PageSize,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    /// Free space that must remain below any placed unit
    pub min_bottom_space_mm: f32,
    /// Free space that must remain below a unit holding a financing block
    pub financing_bottom_space_mm: f32,
    /// Gap between consecutive elements (points)
    pub element_spacing: f32,
    pub body_font_size: f32,
    pub heading_font_sizes: [f32; 3],
    pub table_font_size: f32,
    /// Vertical padding inside table rows (points)
    pub table_row_padding: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin_top_mm: 30.0,
            margin_bottom_mm: 15.0,
            margin_left_mm: 20.0,
            margin_right_mm: 20.0,
            min_bottom_space_mm: DEFAULT_MIN_BOTTOM_SPACE_MM,
            financing_bottom_space_mm: DEFAULT_FINANCING_BOTTOM_SPACE_MM,
            element_spacing: DEFAULT_ELEMENT_SPACING,
            body_font_size: 10.0,
            heading_font_sizes: [16.0, 13.0, 11.0],
            table_font_size: 9.0,
            table_row_padding: 4.0,
        }
    }
}

impl LayoutOptions {
    /// Content area of an extended page in PDF space (bottom-left origin)
    pub fn content_rect(&self) -> Rect {
        let left = mm_to_pt(self.margin_left_mm);
        let right = mm_to_pt(self.margin_right_mm);
        let top = mm_to_pt(self.margin_top_mm);
        let bottom = mm_to_pt(self.margin_bottom_mm);
        Rect::new(
            left,
            bottom,
            self.page_size.width - left - right,
            self.page_size.height - top - bottom,
        )
    }

    pub fn heading_font_size(&self, level: u8) -> f32 {
        let idx = (level.max(1) as usize - 1).min(self.heading_font_sizes.len() - 1);
        self.heading_font_sizes[idx]
    }
}

/// How text that does not fit its placeholder is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOverflow {
    /// Wrap on word boundaries while lines fit the rectangle height, then
    /// truncate the last visible line with an ellipsis
    #[default]
    Wrap,
    /// Always a single line, truncated with an ellipsis
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub default_font_size: f32,
    pub color: Color,
    pub overflow: TextOverflow,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            default_font_size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
            overflow: TextOverflow::Wrap,
        }
    }
}

/// Derived chart geometry and palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    /// Share of the rectangle height used by the tallest bar
    pub bar_fill_ratio: f32,
    /// Height drawn for zero-valued bars so they stay visible (points)
    pub min_bar_height: f32,
    pub primary: Color,
    pub secondary: Color,
    pub positive: Color,
    pub negative: Color,
    /// Background ring of donut gauges
    pub track: Color,
    pub label_font_size: f32,
    pub show_labels: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            bar_fill_ratio: DEFAULT_BAR_FILL_RATIO,
            min_bar_height: DEFAULT_MIN_BAR_HEIGHT,
            primary: Color(0.96, 0.62, 0.04),
            secondary: Color(0.13, 0.37, 0.62),
            positive: Color(0.22, 0.62, 0.29),
            negative: Color(0.80, 0.22, 0.18),
            track: Color(0.90, 0.90, 0.90),
            label_font_size: 8.0,
            show_labels: true,
        }
    }
}

/// Furniture painted on every extended page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoratorOptions {
    pub enabled: bool,
    /// Footer text; `{page}` and `{total}` are substituted
    pub footer_template: String,
    pub footer_font_size: f32,
    pub footer_bar_color: Color,
    pub footer_text_color: Color,
    pub ornament_color: Color,
    /// Text shown in the logo block when no logo image is configured
    pub brand_text: Option<String>,
    pub logo_path: Option<PathBuf>,
    /// Logo image bytes, read from `logo_path` by [`RenderOptions::load`]
    #[serde(skip)]
    pub logo: Option<Arc<Vec<u8>>>,
}

impl Default for DecoratorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            footer_template: DEFAULT_FOOTER_TEMPLATE.to_string(),
            footer_font_size: 8.0,
            footer_bar_color: Color(0.13, 0.37, 0.62),
            footer_text_color: Color::WHITE,
            ornament_color: Color(0.96, 0.62, 0.04),
            brand_text: None,
            logo_path: None,
            logo: None,
        }
    }
}

impl RenderOptions {
    /// Load options from a JSON file, reading the logo image if one is named.
    ///
    /// A relative `logo_path` is resolved against the options file directory.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mut options: RenderOptions = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse options: {}", e)))?;

        if let Some(logo_path) = options.decorator.logo_path.clone() {
            let logo_path = if logo_path.is_relative() {
                path.parent()
                    .map(|dir| dir.join(&logo_path))
                    .unwrap_or(logo_path)
            } else {
                logo_path
            };
            let logo = tokio::fs::read(&logo_path).await?;
            options.decorator.logo = Some(Arc::new(logo));
        }

        options.validate()?;
        Ok(options)
    }

    /// Save options to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComposeError::Config(format!("Failed to serialize options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if !layout.page_size.is_valid() {
            return Err(ComposeError::Config(
                "Page size must be positive and finite".to_string(),
            ));
        }

        let margins = [
            layout.margin_top_mm,
            layout.margin_bottom_mm,
            layout.margin_left_mm,
            layout.margin_right_mm,
            layout.min_bottom_space_mm,
            layout.financing_bottom_space_mm,
        ];
        if margins.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(ComposeError::Config(
                "Margins must be non-negative".to_string(),
            ));
        }

        let content = layout.content_rect();
        if content.width <= 0.0 || content.height <= 0.0 {
            return Err(ComposeError::Config(
                "Margins leave no content area on the page".to_string(),
            ));
        }

        let sizes = [
            layout.body_font_size,
            layout.table_font_size,
            self.text.default_font_size,
            self.charts.label_font_size,
            self.decorator.footer_font_size,
        ];
        if sizes
            .iter()
            .chain(layout.heading_font_sizes.iter())
            .any(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(ComposeError::Config(
                "Font sizes must be positive".to_string(),
            ));
        }

        let ratio = self.charts.bar_fill_ratio;
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(ComposeError::Config(format!(
                "Bar fill ratio must be in (0, 1], got {}",
                ratio
            )));
        }

        if !self.charts.min_bar_height.is_finite() || self.charts.min_bar_height < 0.0 {
            return Err(ComposeError::Config(
                "Minimum bar height must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parameters of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Rotation step applied to categories without their own step
    pub rotation_step: usize,
    /// Per-category rotation steps
    pub category_steps: BTreeMap<String, usize>,
    /// Price increment per recipient position (0.05 = +5% per recipient)
    pub escalation_rate: f64,
    /// Number of recipients processed concurrently.
    ///
    /// A timed-out recipient frees its slot at once, while its blocking
    /// thread keeps running until the next deadline check. For that short
    /// window more than `workers` documents may be using the CPU.
    pub workers: usize,
    /// Upper bound for generating one recipient's document
    pub timeout_secs: f64,
    /// Prefix of the file names inside the archive
    pub file_prefix: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            rotation_step: 1,
            category_steps: BTreeMap::new(),
            escalation_rate: 0.0,
            workers: 4,
            timeout_secs: 120.0,
            file_prefix: "offer".to_string(),
        }
    }
}

impl BatchOptions {
    /// Load options from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: BatchOptions = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse batch options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ComposeError::Config(format!("Failed to serialize batch options: {}", e))
        })?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Rotation step for a product category
    pub fn step_for(&self, category: &str) -> usize {
        self.category_steps
            .get(category)
            .copied()
            .unwrap_or(self.rotation_step)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ComposeError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }
        if self.workers > Semaphore::MAX_PERMITS {
            return Err(ComposeError::Config(format!(
                "Worker count must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.workers
            )));
        }
        if !self.timeout_secs.is_finite()
            || self.timeout_secs <= 0.0
            || Duration::try_from_secs_f64(self.timeout_secs).is_err()
        {
            return Err(ComposeError::Config(format!(
                "Timeout must be a positive number of seconds, got {}",
                self.timeout_secs
            )));
        }
        if !self.escalation_rate.is_finite() || self.escalation_rate <= -1.0 {
            return Err(ComposeError::Config(format!(
                "Escalation rate must be finite and greater than -1, got {}",
                self.escalation_rate
            )));
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(ComposeError::Config(
                "File prefix must not contain path separators".to_string(),
            ));
        }
        Ok(())
    }
}
