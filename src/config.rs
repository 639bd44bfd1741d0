//! Page configuration.
//!
//! A [`PageConfig`] describes a fresh page: size, unit, margins, bands,
//! crop insets, rotation and text defaults. Lengths are in `unit`. Configs
//! can be built in code or loaded from JSON.

use crate::error::Result;
use crate::geometry::Insets;
use crate::writer::{FontFamily, Unit};
use serde::{Deserialize, Serialize};

/// Geometry and defaults of a new page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Page width in `unit`
    pub width: f64,
    /// Page height in `unit`
    pub height: f64,
    /// Unit of every length in this config, and the page's initial unit
    pub unit: Unit,
    /// Margins around the writable area
    pub margins: Insets,
    /// Height of the header band below the top margin
    pub header_height: f64,
    /// Height of the footer band above the bottom margin
    pub footer_height: f64,
    /// Crop box insets from the media box edges
    pub crop: Insets,
    /// Page rotation in degrees (0, 90, 180 or 270)
    pub rotation: u16,
    /// Stretch the last line of justified paragraphs
    pub justify_last_line: bool,
    /// Default font family
    pub font_family: FontFamily,
    /// Default font size in points
    pub font_size: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::letter()
    }
}

impl PageConfig {
    /// US Letter, 612×792 points, no margins.
    pub fn letter() -> Self {
        Self::with_size(612.0, 792.0, Unit::Point)
    }

    /// ISO A4, 210×297 millimeters, no margins.
    pub fn a4() -> Self {
        Self::with_size(210.0, 297.0, Unit::Millimeter)
    }

    /// Page of the given size, no margins.
    pub fn with_size(width: f64, height: f64, unit: Unit) -> Self {
        Self {
            width,
            height,
            unit,
            margins: Insets::default(),
            header_height: 0.0,
            footer_height: 0.0,
            crop: Insets::default(),
            rotation: 0,
            justify_last_line: false,
            font_family: FontFamily::Helvetica,
            font_size: 12.0,
        }
    }

    /// Set all four margins.
    pub fn with_margins(mut self, margins: Insets) -> Self {
        self.margins = margins;
        self
    }

    /// Set the header and footer band heights.
    pub fn with_bands(mut self, header_height: f64, footer_height: f64) -> Self {
        self.header_height = header_height;
        self.footer_height = footer_height;
        self
    }

    /// Set the crop insets.
    pub fn with_crop(mut self, crop: Insets) -> Self {
        self.crop = crop;
        self
    }

    /// Set the rotation in degrees.
    pub fn with_rotation(mut self, degrees: u16) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the default font.
    pub fn with_font(mut self, family: FontFamily, size: f64) -> Self {
        self.font_family = family;
        self.font_size = size;
        self
    }

    /// Stretch the last line of justified paragraphs.
    pub fn with_justify_last_line(mut self, justify: bool) -> Self {
        self.justify_last_line = justify;
        self
    }

    /// Parse a config from JSON; missing fields take the Letter defaults.
    ///
    /// ```
    /// use pdf_pagesmith::config::PageConfig;
    /// use pdf_pagesmith::writer::Unit;
    ///
    /// let config = PageConfig::from_json(r#"{"unit": "inch", "width": 8.5, "height": 11}"#).unwrap();
    /// assert_eq!(config.unit, Unit::Inch);
    /// assert_eq!(config.font_size, 12.0);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
