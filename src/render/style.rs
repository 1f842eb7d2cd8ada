//! Cosmetic rendering parameters
//!
//! Everything here is read from the `[render]` table of the configuration
//! file. Colours stay as `#rrggbb` strings until a scene resolves them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{MapError, MapResult};

/// An opaque RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor { r: 0, g: 0, b: 0 };
    pub const WHITE: RgbColor = RgbColor { r: 255, g: 255, b: 255 };

    /// Parse `#rrggbb` (or the short `#rgb` form)
    ///
    /// # Arguments
    ///
    /// * `hex` - Colour string with a leading `#`
    ///
    /// # Returns
    ///
    /// The colour, or a configuration error naming the bad value
    pub fn parse(hex: &str) -> MapResult<Self> {
        let re = Regex::new(r"^#([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$")
            .map_err(|e| MapError::GenericError(format!("Invalid colour pattern: {}", e)))?;
        let digits = re.captures(hex.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| MapError::ConfigError(format!("Invalid colour '{}', expected #rrggbb", hex)))?;

        let expanded: String = if digits.len() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits.to_string()
        };

        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| MapError::ConfigError(format!("Invalid colour '{}'", hex)));
        Ok(RgbColor { r: channel(0)?, g: channel(2)?, b: channel(4)? })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    #[default]
    Circle,
    Square,
    Triangle,
}

/// Image corner used to anchor decorations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    M,
    #[default]
    Km,
}

impl DistanceUnit {
    pub fn metres(&self) -> f64 {
        match self {
            DistanceUnit::M => 1.0,
            DistanceUnit::Km => 1000.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            DistanceUnit::M => "m",
            DistanceUnit::Km => "km",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NorthArrowStyle {
    pub enabled: bool,
    pub corner: Corner,
    /// Height in pixels
    pub size: u32,
}

impl Default for NorthArrowStyle {
    fn default() -> Self {
        NorthArrowStyle { enabled: true, corner: Corner::TopLeft, size: 40 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleBarStyle {
    pub enabled: bool,
    /// Bar length in `unit`s
    pub distance: f64,
    pub unit: DistanceUnit,
    pub corner: Corner,
}

impl Default for ScaleBarStyle {
    fn default() -> Self {
        ScaleBarStyle { enabled: true, distance: 2.0, unit: DistanceUnit::Km, corner: Corner::BottomLeft }
    }
}

impl ScaleBarStyle {
    pub fn length_metres(&self) -> f64 {
        self.distance * self.unit.metres()
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.distance, self.unit.symbol())
    }
}

/// Look of the rendered map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub width: u32,
    pub height: u32,
    /// Blank border around the map frame, in pixels
    pub margin: u32,
    pub title: Option<String>,
    pub water_color: String,
    pub land_color: String,
    pub outline_color: String,
    pub outline_width: f64,
    pub marker: MarkerShape,
    pub marker_size: f64,
    pub marker_color: String,
    /// Colours cycled over the sorted categories
    pub palette: Vec<String>,
    /// Label offset from the marker, in pixels
    pub label_offset: (f64, f64),
    pub label_size: f64,
    pub legend: bool,
    pub north_arrow: NorthArrowStyle,
    pub scale_bar: ScaleBarStyle,
}

impl Default for RenderStyle {
    fn default() -> Self {
        RenderStyle {
            width: 1200,
            height: 900,
            margin: 20,
            title: None,
            water_color: "#dcecf5".to_string(),
            land_color: "#d9c9a3".to_string(),
            outline_color: "#4d4d4d".to_string(),
            outline_width: 1.0,
            marker: MarkerShape::Circle,
            marker_size: 8.0,
            marker_color: "#c0392b".to_string(),
            palette: vec![
                "#1b9e77".to_string(), "#d95f02".to_string(), "#7570b3".to_string(),
                "#e7298a".to_string(), "#66a61e".to_string(), "#e6ab02".to_string(),
            ],
            label_offset: (8.0, -8.0),
            label_size: 12.0,
            legend: true,
            north_arrow: NorthArrowStyle::default(),
            scale_bar: ScaleBarStyle::default(),
        }
    }
}

impl RenderStyle {
    /// Check sizes and colours without drawing anything
    pub fn validate(&self) -> MapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::ConfigError(format!(
                "Render size must be non-zero, got {}x{}", self.width, self.height
            )));
        }
        if 2 * self.margin >= self.width.min(self.height) {
            return Err(MapError::ConfigError(format!(
                "Margin {} leaves no room in a {}x{} image", self.margin, self.width, self.height
            )));
        }
        if !(self.marker_size > 0.0 && self.marker_size.is_finite()) {
            return Err(MapError::ConfigError(format!("Invalid marker size {}", self.marker_size)));
        }
        if !(self.outline_width >= 0.0 && self.outline_width.is_finite()) {
            return Err(MapError::ConfigError(format!("Invalid outline width {}", self.outline_width)));
        }
        if self.scale_bar.enabled && !(self.scale_bar.distance > 0.0 && self.scale_bar.distance.is_finite()) {
            return Err(MapError::ConfigError(format!("Invalid scale bar distance {}", self.scale_bar.distance)));
        }
        self.colors().map(|_| ())
    }

    /// Resolve every colour string
    pub fn colors(&self) -> MapResult<StyleColors> {
        let palette = self.palette.iter()
            .map(|c| RgbColor::parse(c))
            .collect::<MapResult<Vec<_>>>()?;
        Ok(StyleColors {
            water: RgbColor::parse(&self.water_color)?,
            land: RgbColor::parse(&self.land_color)?,
            outline: RgbColor::parse(&self.outline_color)?,
            marker: RgbColor::parse(&self.marker_color)?,
            palette,
        })
    }
}

/// Parsed colours of a `RenderStyle`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleColors {
    pub water: RgbColor,
    pub land: RgbColor,
    pub outline: RgbColor,
    pub marker: RgbColor,
    pub palette: Vec<RgbColor>,
}

impl StyleColors {
    /// Colour for the category at `index` of the sorted category list
    pub fn category(&self, index: usize) -> RgbColor {
        if self.palette.is_empty() {
            self.marker
        } else {
            self.palette[index % self.palette.len()]
        }
    }
}
