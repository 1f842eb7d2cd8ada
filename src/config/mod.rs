//! Run configuration
//!
//! One TOML file describes a whole map: coordinate systems, extent, input
//! locations, point columns, cache and output settings and the render
//! style. Every check that needs no I/O happens in `validate`.

use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory, Extent, GEOGRAPHIC_CRS, PROJECTED_CRS};
use crate::errors::{MapError, MapResult};
use crate::layer::InvalidRowPolicy;
use crate::render::{RenderStyle, RendererFactory};

/// EPSG codes for the two systems of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsConfig {
    /// System the site coordinates are recorded in
    pub geographic: u32,
    /// System the map is drawn in
    pub projected: u32,
}

impl Default for CrsConfig {
    fn default() -> Self {
        CrsConfig { geographic: GEOGRAPHIC_CRS, projected: PROJECTED_CRS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Coastline `.shp` (sidecars alongside)
    pub shapefile: PathBuf,
    /// Site table: local path or http(s) URL
    pub sites: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointConfig {
    pub longitude_column: String,
    pub latitude_column: String,
    pub label_column: Option<String>,
    pub category_column: Option<String>,
    pub invalid_rows: InvalidRowPolicy,
    /// Drop sites outside the crop region
    pub clip_to_region: bool,
}

impl Default for PointConfig {
    fn default() -> Self {
        PointConfig {
            longitude_column: "Longitude".to_string(),
            latitude_column: "Latitude".to_string(),
            label_column: None,
            category_column: None,
            invalid_rows: InvalidRowPolicy::Reject,
            clip_to_region: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { enabled: false, directory: PathBuf::from(".mapkit-cache") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Map image; the extension picks the format
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { path: PathBuf::from("site_map.png") }
    }
}

/// The whole run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub crs: CrsConfig,
    #[serde(default)]
    pub extent: Extent,
    pub inputs: InputConfig,
    #[serde(default)]
    pub points: PointConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderStyle,
}

impl MapConfig {
    /// Configuration with defaults for everything but the inputs
    pub fn new<P: AsRef<Path>>(shapefile: P, sites: &str) -> Self {
        MapConfig {
            crs: CrsConfig::default(),
            extent: Extent::default(),
            inputs: InputConfig { shapefile: shapefile.as_ref().to_path_buf(), sites: sites.to_string() },
            points: PointConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
            render: RenderStyle::default(),
        }
    }

    /// Load from a TOML file
    ///
    /// Relative input, cache and output paths are resolved against the
    /// directory holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> MapResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MapError::ConfigError(format!(
            "Cannot read configuration {}: {}", path.display(), e
        )))?;
        let mut config = Self::from_str(&text)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.resolve_paths(base);
        }
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_str(text: &str) -> MapResult<Self> {
        Ok(toml::from_str(text)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &PathBuf| if p.is_relative() { base.join(p) } else { p.clone() };
        self.inputs.shapefile = resolve(&self.inputs.shapefile);
        self.cache.directory = resolve(&self.cache.directory);
        self.output.path = resolve(&self.output.path);
        if !self.inputs.sites.contains("://") {
            let sites = PathBuf::from(&self.inputs.sites);
            if sites.is_relative() {
                self.inputs.sites = base.join(sites).display().to_string();
            }
        }
    }

    /// The geographic system, which must be geographic
    pub fn geographic_crs(&self) -> MapResult<CoordinateSystem> {
        let crs = CoordinateSystemFactory::from_epsg(self.crs.geographic)?;
        if !crs.is_geographic() {
            return Err(MapError::ConfigError(format!(
                "crs.geographic must be a geographic system, EPSG:{} is projected", self.crs.geographic
            )));
        }
        Ok(crs)
    }

    pub fn projected_crs(&self) -> MapResult<CoordinateSystem> {
        CoordinateSystemFactory::from_epsg(self.crs.projected)
    }

    /// Check everything that can be checked before touching any input
    pub fn validate(&self) -> MapResult<()> {
        self.geographic_crs()?;
        self.projected_crs()?;
        self.extent.validate()?;

        if self.inputs.shapefile.as_os_str().is_empty() {
            return Err(MapError::ConfigError("inputs.shapefile is empty".to_string()));
        }
        if self.inputs.sites.trim().is_empty() {
            return Err(MapError::ConfigError("inputs.sites is empty".to_string()));
        }

        let columns = [
            ("points.longitude_column", Some(&self.points.longitude_column)),
            ("points.latitude_column", Some(&self.points.latitude_column)),
            ("points.label_column", self.points.label_column.as_ref()),
            ("points.category_column", self.points.category_column.as_ref()),
        ];
        for (name, column) in columns {
            if column.map(|c| c.trim().is_empty()).unwrap_or(false) {
                return Err(MapError::ConfigError(format!("{} is empty", name)));
            }
        }

        self.render.validate()?;
        RendererFactory::for_path(&self.output.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [inputs]
        shapefile = "data/coast.shp"
        sites = "data/sites.csv"
    "#;

    #[test]
    fn test_defaults_reproduce_walkthrough() {
        let config = MapConfig::from_str(MINIMAL).unwrap();
        assert_eq!(config.crs.geographic, 4326);
        assert_eq!(config.crs.projected, 3005);
        assert_eq!(config.extent, Extent::default());
        assert_eq!(config.points.longitude_column, "Longitude");
        assert_eq!(config.points.invalid_rows, InvalidRowPolicy::Reject);
        assert!(!config.points.clip_to_region);
        assert!(!config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_file() {
        let config = MapConfig::from_str(r##"
            [crs]
            geographic = 4269
            projected = 32610

            [extent]
            north = 49.0
            south = 48.5
            east = -124.5
            west = -125.5

            [inputs]
            shapefile = "coast.shp"
            sites = "https://example.org/sites.csv"

            [points]
            longitude_column = "lon"
            latitude_column = "lat"
            label_column = "Site"
            invalid_rows = "abort"
            clip_to_region = true

            [output]
            path = "map.svg"

            [render]
            land_color = "#ccbb99"
        "##).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.projected_crs().unwrap(), CoordinateSystem::Utm(10, true));
        assert_eq!(config.points.invalid_rows, InvalidRowPolicy::Abort);
        assert_eq!(config.render.land_color, "#ccbb99");
    }

    #[test]
    fn test_unknown_crs_is_config_error() {
        let mut config = MapConfig::from_str(MINIMAL).unwrap();
        config.crs.projected = 9999;
        assert!(matches!(config.validate(), Err(MapError::ConfigError(_))));

        config.crs.projected = 3005;
        config.crs.geographic = 3857;
        assert!(matches!(config.validate(), Err(MapError::ConfigError(_))));
    }

    #[test]
    fn test_inverted_extent_rejected() {
        let mut config = MapConfig::from_str(MINIMAL).unwrap();
        config.extent = Extent { north: 48.0, south: 49.0, east: -125.0, west: -126.0 };
        assert!(matches!(config.validate(), Err(MapError::ConfigError(_))));
    }

    #[test]
    fn test_bad_output_and_colour() {
        let mut config = MapConfig::from_str(MINIMAL).unwrap();
        config.output.path = PathBuf::from("map.jpg");
        assert!(config.validate().is_err());

        let mut config = MapConfig::from_str(MINIMAL).unwrap();
        config.render.water_color = "blue".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_inputs_table() {
        assert!(matches!(MapConfig::from_str("[crs]\ngeographic = 4326\n"), Err(MapError::ConfigError(_))));
    }

    #[test]
    fn test_relative_paths_follow_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = MapConfig::from_file(&path).unwrap();
        assert_eq!(config.inputs.shapefile, dir.path().join("data/coast.shp"));
        assert_eq!(config.output.path, dir.path().join("site_map.png"));
    }
}
