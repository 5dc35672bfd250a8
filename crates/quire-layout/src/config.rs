//! Engine configuration.
//!
//! Every knob has a default, so an empty TOML document (or no file at all)
//! gives the standard behaviour.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{EdgeSizes, Rect};

/// [§ 3 Page Size](https://www.w3.org/TR/css-page-3/#page-size-prop)
///
/// Page geometry: size and the four page margins, in CSS px.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PageSetup {
    /// Page width.
    pub width: f32,
    /// Page height.
    pub height: f32,
    /// Top page margin.
    pub margin_top: f32,
    /// Right page margin.
    pub margin_right: f32,
    /// Bottom page margin.
    pub margin_bottom: f32,
    /// Left page margin.
    pub margin_left: f32,
    /// Cap on the footnote area height, `None` for the whole page area.
    pub footnote_max_height: Option<f32>,
}

impl Default for PageSetup {
    /// US Letter at 96 dpi with one-inch margins.
    fn default() -> Self {
        Self {
            width: 816.0,
            height: 1056.0,
            margin_top: 96.0,
            margin_right: 96.0,
            margin_bottom: 96.0,
            margin_left: 96.0,
            footnote_max_height: None,
        }
    }
}

impl PageSetup {
    /// Page margins as edges.
    #[must_use]
    pub const fn margins(&self) -> EdgeSizes {
        EdgeSizes {
            top: self.margin_top,
            right: self.margin_right,
            bottom: self.margin_bottom,
            left: self.margin_left,
        }
    }

    /// The page area: the page box minus its margins.
    #[must_use]
    pub fn content_area(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height).shrunk_by(self.margins())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let area = self.content_area();
        if !(self.width.is_finite() && self.height.is_finite()) || area.width <= 0.0 || area.height <= 0.0 {
            return Err(ConfigError::Value(format!(
                "page {}x{} leaves no room inside its margins",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayoutConfig {
    /// Upper bound on repagination passes.
    pub max_repagination_loops: usize,
    /// Page geometry used when a document does not give one.
    pub page: PageSetup,
    /// Truncate the bottom margin of broken `box-decoration-break: clone`
    /// blocks like sliced ones.
    pub clone_decoration_margins: bool,
    /// Scale from CSS px to device pixels for gradient geometry.
    pub device_pixel_ratio: f32,
    /// Most implicit rows (or columns) auto-placement may create.
    pub dense_placement_limit: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_repagination_loops: 8,
            page: PageSetup::default(),
            clone_decoration_margins: false,
            device_pixel_ratio: 1.0,
            dense_placement_limit: 10_000,
        }
    }
}

impl LayoutConfig {
    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed TOML and
    /// [`ConfigError::Value`] when a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if config.max_repagination_loops == 0 {
            return Err(ConfigError::Value(
                "max-repagination-loops must be at least 1".to_owned(),
            ));
        }
        if !(config.device_pixel_ratio > 0.0) {
            return Err(ConfigError::Value(format!(
                "device-pixel-ratio must be positive, got {}",
                config.device_pixel_ratio
            )));
        }
        config.page.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_the_default() {
        let config = LayoutConfig::from_toml_str("").unwrap();
        assert_eq!(config, LayoutConfig::default());
        assert_eq!(config.page.content_area(), Rect::new(96.0, 96.0, 624.0, 864.0));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = LayoutConfig::from_toml_str(
            "max-repagination-loops = 3\n[page]\nwidth = 400\nheight = 300\nmargin-top = 10\n",
        )
        .unwrap();
        assert_eq!(config.max_repagination_loops, 3);
        assert_eq!(config.page.margin_top, 10.0);
        assert_eq!(config.page.margin_left, 96.0);
    }

    #[test]
    fn rejects_zero_loops_and_tiny_pages() {
        assert!(matches!(
            LayoutConfig::from_toml_str("max-repagination-loops = 0"),
            Err(ConfigError::Value(_))
        ));
        assert!(matches!(
            LayoutConfig::from_toml_str("[page]\nwidth = 100\n"),
            Err(ConfigError::Value(_))
        ));
        assert!(matches!(
            LayoutConfig::from_toml_str("max-repagination-loops = \"x\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
