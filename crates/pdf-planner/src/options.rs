use crate::constants::*;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Text stamped over every page
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatermarkOptions {
    pub text: String,
    pub font_size: f32,
    /// RGB components in `0.0..=1.0`
    pub color: (f32, f32, f32),
    /// `0.0` is invisible, `1.0` fully opaque
    pub opacity: f32,
    /// Counter-clockwise angle in degrees
    pub angle_degrees: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            font_size: DEFAULT_WATERMARK_FONT_SIZE,
            color: DEFAULT_WATERMARK_COLOR,
            opacity: DEFAULT_WATERMARK_OPACITY,
            angle_degrees: DEFAULT_WATERMARK_ANGLE,
        }
    }
}

impl WatermarkOptions {
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(PlannerError::InvalidInput(
                "Watermark text is empty".to_string(),
            ));
        }
        if !(self.font_size > 0.0) {
            return Err(PlannerError::InvalidInput(format!(
                "Watermark font size must be positive, got {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(PlannerError::InvalidInput(format!(
                "Watermark opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        let (r, g, b) = self.color;
        if [r, g, b].iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(PlannerError::InvalidInput(
                "Watermark color components must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse `#RRGGBB` (leading `#` optional) into colour components
    pub fn parse_hex_color(color: &str) -> Result<(f32, f32, f32)> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(PlannerError::InvalidInput(format!(
                "Expected a #RRGGBB colour, got {}",
                color
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| PlannerError::InvalidInput(format!("Invalid colour: {}", color)))
        };
        Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Signature image placed on one page
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureOptions {
    /// Zero-based page to sign
    pub page: usize,
    /// Lower-left corner in points
    pub x: f32,
    pub y: f32,
    /// Drawn size in points
    pub width: f32,
    pub height: f32,
    /// Encoded PNG or JPEG bytes
    pub image: Vec<u8>,
}

impl SignatureOptions {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            page: 0,
            x: DEFAULT_SIGNATURE_X,
            y: DEFAULT_SIGNATURE_Y,
            width: DEFAULT_SIGNATURE_WIDTH,
            height: DEFAULT_SIGNATURE_HEIGHT,
            image,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.image.is_empty() {
            return Err(PlannerError::InvalidInput(
                "Signature image is empty".to_string(),
            ));
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(PlannerError::InvalidInput(format!(
                "Signature size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(PlannerError::InvalidInput(
                "Signature position must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-user tool configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ToolOptions {
    /// File stem of produced documents; the extension is always `pdf`
    pub output_name: String,
    /// Default for the split tool's "merge all ranges in one PDF" switch
    pub merge_ranges: bool,
    pub watermark: WatermarkOptions,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            merge_ranges: false,
            watermark: WatermarkOptions::default(),
        }
    }
}

impl ToolOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: ToolOptions = serde_json::from_slice(&bytes)
            .map_err(|e| PlannerError::Config(format!("Failed to parse config: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PlannerError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(PlannerError::Config("Output name is empty".to_string()));
        }
        if name.contains(['/', '\\']) {
            return Err(PlannerError::Config(format!(
                "Output name must not contain path separators: {}",
                name
            )));
        }
        self.watermark
            .validate()
            .map_err(|e| PlannerError::Config(e.to_string()))
    }

    /// File name for output `index` of `count`
    pub fn output_file_name(&self, index: usize, count: usize) -> String {
        let stem = self.output_name.trim();
        if count <= 1 {
            format!("{}.{}", stem, OUTPUT_EXTENSION)
        } else {
            format!("{}_{}.{}", stem, index + 1, OUTPUT_EXTENSION)
        }
    }
}
