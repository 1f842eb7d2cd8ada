use std::path::Path;
use log::info;

use crate::config::MapConfig;
use crate::errors::MapResult;
use crate::layer::{PointLayer, VectorLayer};
use crate::pipeline::{Coastline, MapPipeline, MapRegion, MapSummary, Sites};
use crate::utils::logger::Logger;

/// Main interface to the MapKit library
pub struct MapKit {
    config: MapConfig,
    logger: Logger,
    use_cache: bool,
}

impl MapKit {
    /// Create a new MapKit instance
    ///
    /// # Arguments
    /// * `config` - Run configuration, validated here before any I/O
    /// * `log_file` - Optional path to the run log, defaults to "mapkit.log"
    ///
    /// # Returns
    /// A MapKit instance or an error if the configuration is invalid
    pub fn new(config: MapConfig, log_file: Option<&str>) -> MapResult<Self> {
        config.validate()?;
        let logger = Logger::new(log_file.unwrap_or("mapkit.log"))?;
        let use_cache = config.cache.enabled;
        Ok(MapKit { config, logger, use_cache })
    }

    /// Create a MapKit instance from a TOML configuration file
    pub fn from_config_file<P: AsRef<Path>>(path: P, log_file: Option<&str>) -> MapResult<Self> {
        Self::new(MapConfig::from_file(path)?, log_file)
    }

    /// Skip the crop cache for this instance
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    fn pipeline(&self) -> MapPipeline<'_> {
        let pipeline = MapPipeline::new(&self.config, &self.logger);
        if self.use_cache { pipeline } else { pipeline.without_cache() }
    }

    /// Build the crop region in the geographic and projected systems
    pub fn build_region(&self) -> MapResult<MapRegion> {
        self.pipeline().build_region()
    }

    /// Load the coastline shapefile, reproject it and crop it to `region`
    pub fn load_coastline(&self, region: &MapRegion) -> MapResult<Coastline> {
        self.pipeline().load_coastline(region)
    }

    /// Read the site table into projected points
    pub fn build_sites(&self, region: &MapRegion) -> MapResult<Sites> {
        self.pipeline().build_sites(region)
    }

    /// Render layers to an image file; the extension picks PNG or SVG
    pub fn render<P: AsRef<Path>>(&self, region: &MapRegion, coastline: &VectorLayer, sites: &PointLayer, output: P) -> MapResult<()> {
        self.pipeline().render(region, coastline, sites, output.as_ref())
    }

    /// Run the whole pipeline to the configured output path
    pub fn run(&self) -> MapResult<MapSummary> {
        let summary = self.pipeline().run(&self.config.output.path)?;
        info!("{}", summary);
        Ok(summary)
    }
}
