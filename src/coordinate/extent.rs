//! Geographic extent of the area of interest

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, MapResult};

/// Four bounds in decimal degrees
///
/// West is the more negative longitude in the western hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Extent {
    /// Create a validated extent
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> MapResult<Self> {
        let extent = Extent { north, south, east, west };
        extent.validate()?;
        Ok(extent)
    }

    /// Parse an extent from a bbox-ordered string (format: "west,south,east,north")
    pub fn from_string(bbox_str: &str) -> MapResult<Self> {
        let parts: Vec<&str> = bbox_str.split(',').collect();
        if parts.len() != 4 {
            return Err(MapError::ConfigError(
                "Extent must have 4 comma-separated values: west,south,east,north".to_string()
            ));
        }

        let parse = |value: &str, name: &str| -> MapResult<f64> {
            value.trim().parse::<f64>()
                .map_err(|_| MapError::ConfigError(format!("Invalid {} value: {}", name, value.trim())))
        };

        let west = parse(parts[0], "west")?;
        let south = parse(parts[1], "south")?;
        let east = parse(parts[2], "east")?;
        let north = parse(parts[3], "north")?;

        Extent::new(north, south, east, west)
    }

    /// Check bound ordering and ranges
    pub fn validate(&self) -> MapResult<()> {
        let values = [self.north, self.south, self.east, self.west];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MapError::ConfigError(format!("Extent bounds must be finite: {:?}", self)));
        }
        if self.north <= self.south {
            return Err(MapError::ConfigError(format!(
                "Extent north ({}) must be greater than south ({})", self.north, self.south
            )));
        }
        if self.east <= self.west {
            return Err(MapError::ConfigError(format!(
                "Extent east ({}) must be greater than west ({})", self.east, self.west
            )));
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(MapError::ConfigError(format!(
                "Extent latitudes must lie within [-90, 90]: south={}, north={}", self.south, self.north
            )));
        }
        if self.west < -180.0 || self.east > 180.0 {
            return Err(MapError::ConfigError(format!(
                "Extent longitudes must lie within [-180, 180]: west={}, east={}", self.west, self.east
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

impl Default for Extent {
    /// The Barkley Sound study area
    fn default() -> Self {
        Extent { north: 48.922, south: 48.80, east: -125.05, west: -125.26 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_extent() {
        let extent = Extent::new(48.922, 48.80, -125.05, -125.26).unwrap();
        assert!((extent.width() - 0.21).abs() < 1e-9);
        assert!((extent.height() - 0.122).abs() < 1e-9);
    }

    #[test]
    fn test_non_monotonic_bounds_fail_fast() {
        assert!(matches!(Extent::new(48.80, 48.922, -125.05, -125.26), Err(MapError::ConfigError(_))));
        assert!(matches!(Extent::new(48.922, 48.80, -125.26, -125.05), Err(MapError::ConfigError(_))));
        assert!(Extent::new(48.8, 48.8, -125.05, -125.26).is_err());
    }

    #[test]
    fn test_out_of_range_and_nan() {
        assert!(Extent::new(91.0, 48.0, -125.0, -126.0).is_err());
        assert!(Extent::new(49.0, 48.0, -125.0, -181.0).is_err());
        assert!(Extent::new(f64::NAN, 48.0, -125.0, -126.0).is_err());
    }

    #[test]
    fn test_from_string_bbox_order() {
        let extent = Extent::from_string("-125.26, 48.80, -125.05, 48.922").unwrap();
        assert_eq!(extent, Extent::default());
        assert!(Extent::from_string("1,2,3").is_err());
        assert!(Extent::from_string("a,2,3,4").is_err());
    }
}
