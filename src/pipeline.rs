//! The site-map pipeline
//!
//! Region, coastline, sites, render: each stage is callable on its own so
//! the commands can stop early (crop only, inspect) and the facade can run
//! the whole chain.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use geo::Rect;
use log::{info, warn};

use crate::cache::{CropCache, CropCacheKey};
use crate::config::MapConfig;
use crate::coordinate::BoundingRegion;
use crate::errors::MapResult;
use crate::io::{ShapefileReader, SiteSource};
use crate::layer::{CropReport, PointBuildReport, PointLayer, PointLayerBuilder, VectorLayer};
use crate::render::{MapScene, RendererFactory};
use crate::utils::logger::Logger;

/// The crop region in both systems
#[derive(Debug, Clone, PartialEq)]
pub struct MapRegion {
    pub geographic: BoundingRegion,
    pub projected: BoundingRegion,
}

impl MapRegion {
    /// Crop rectangle in projected units
    pub fn envelope(&self) -> Rect<f64> {
        self.projected.envelope()
    }
}

/// Cropped coastline and where it came from
#[derive(Debug, Clone)]
pub struct Coastline {
    pub layer: VectorLayer,
    /// `None` when the layer came from the crop cache
    pub crop: Option<CropReport>,
}

impl Coastline {
    pub fn from_cache(&self) -> bool {
        self.crop.is_none()
    }
}

/// Projected site points and the build report
#[derive(Debug, Clone)]
pub struct Sites {
    pub layer: PointLayer,
    pub report: PointBuildReport,
}

/// What a full run produced
#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub projected_crs: u32,
    /// Region area in square metres
    pub region_area: f64,
    pub coastline_features: usize,
    pub crop: Option<CropReport>,
    pub site_rows: usize,
    pub sites_drawn: usize,
    pub sites_rejected: usize,
    pub output: PathBuf,
}

impl fmt::Display for MapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Map written to {}", self.output.display())?;
        writeln!(f, "  Projection: EPSG:{}", self.projected_crs)?;
        writeln!(f, "  Region area: {:.2} km²", self.region_area / 1.0e6)?;
        match &self.crop {
            Some(report) => writeln!(f, "  Coastline: {} features ({} kept, {} clipped into {} pieces, {} dropped)",
                                     self.coastline_features, report.kept, report.clipped, report.pieces, report.dropped)?,
            None => writeln!(f, "  Coastline: {} features (from crop cache)", self.coastline_features)?,
        }
        write!(f, "  Sites: {} drawn from {} rows ({} rejected)", self.sites_drawn, self.site_rows, self.sites_rejected)
    }
}

/// Pipeline stages over one configuration
pub struct MapPipeline<'a> {
    config: &'a MapConfig,
    logger: &'a Logger,
    use_cache: bool,
}

impl<'a> MapPipeline<'a> {
    /// Create a pipeline; the configuration must already be validated
    pub fn new(config: &'a MapConfig, logger: &'a Logger) -> Self {
        MapPipeline { config, logger, use_cache: config.cache.enabled }
    }

    /// Bypass the crop cache even when the configuration enables it
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn config(&self) -> &MapConfig {
        self.config
    }

    /// Build the region from the extent and project it
    pub fn build_region(&self) -> MapResult<MapRegion> {
        let geographic = BoundingRegion::from_extent(&self.config.extent, self.config.geographic_crs()?)?;
        let projected = geographic.reproject(self.config.projected_crs()?)?;

        let envelope = projected.envelope();
        info!("Region in {}: x {:.1}..{:.1}, y {:.1}..{:.1}",
              projected.crs(), envelope.min().x, envelope.max().x, envelope.min().y, envelope.max().y);
        self.logger.log_section("Region", &[
            ("extent", format!("{:?}", self.config.extent)),
            ("projected", projected.crs().to_string()),
            ("area_m2", format!("{:.1}", projected.area())),
        ])?;

        Ok(MapRegion { geographic, projected })
    }

    /// Load, reproject and crop the coastline, through the cache if enabled
    pub fn load_coastline(&self, region: &MapRegion) -> MapResult<Coastline> {
        let key = CropCacheKey::new(
            &self.config.inputs.shapefile,
            self.config.crs.geographic,
            self.config.crs.projected,
            self.config.extent,
        );
        let cache = CropCache::new(&self.config.cache.directory);

        if self.use_cache {
            if let Some(layer) = cache.load(&key)? {
                self.logger.log(&format!("Coastline: {} features from cache", layer.len()))?;
                return Ok(Coastline { layer, crop: None });
            }
        }

        let source = ShapefileReader::new(&self.config.inputs.shapefile).read()?;
        let projected = source.reproject(region.projected.crs())?;
        let (layer, report) = projected.crop_with_report(&region.projected)?;
        info!("Crop result: {} kept, {} clipped into {} pieces, {} dropped",
              report.kept, report.clipped, report.pieces, report.dropped);
        if layer.is_empty() {
            warn!("No coastline inside the region; the map will show water only");
        }

        if self.use_cache {
            cache.store(&key, &layer)?;
        }

        self.logger.log_section("Coastline", &[
            ("source", self.config.inputs.shapefile.display().to_string()),
            ("source_crs", source.crs().to_string()),
            ("features_in", source.len().to_string()),
            ("features_out", layer.len().to_string()),
        ])?;
        Ok(Coastline { layer, crop: Some(report) })
    }

    /// Read the site table and project the points
    pub fn build_sites(&self, region: &MapRegion) -> MapResult<Sites> {
        let points = &self.config.points;
        let table = SiteSource::from_location(&self.config.inputs.sites)?.read_table()?;

        let (layer, report) = PointLayerBuilder::new(&points.longitude_column, &points.latitude_column)
            .with_policy(points.invalid_rows)
            .build(&table)?;
        let layer = layer
            .assign_crs(region.geographic.crs())?
            .reproject(region.projected.crs())?;

        let layer = if points.clip_to_region {
            layer.retain_within(&region.envelope())
        } else {
            layer
        };

        self.logger.log_section("Sites", &[
            ("source", self.config.inputs.sites.clone()),
            ("rows", report.total_rows.to_string()),
            ("accepted", report.accepted.to_string()),
            ("rejected", report.rejected.len().to_string()),
        ])?;
        for rejected in &report.rejected {
            self.logger.log(&format!("  rejected line {}: {}", rejected.line, rejected.reason))?;
        }

        Ok(Sites { layer, report })
    }

    /// Draw the map to `output`
    pub fn render(&self, region: &MapRegion, coastline: &VectorLayer, sites: &PointLayer, output: &Path) -> MapResult<()> {
        let renderer = RendererFactory::for_path(output)?;
        let points = &self.config.points;

        let scene = MapScene::new(coastline, sites, region.envelope(), &self.config.render)?
            .with_labels(points.label_column.as_deref())?
            .with_categories(points.category_column.as_deref())?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        info!("Rendering {} map to {}", renderer.name(), output.display());
        renderer.render(&scene, output)?;
        self.logger.log(&format!("Rendered {}", output.display()))?;
        Ok(())
    }

    /// Run every stage, writing the map to `output`
    pub fn run(&self, output: &Path) -> MapResult<MapSummary> {
        let region = self.build_region()?;
        let coastline = self.load_coastline(&region)?;
        let sites = self.build_sites(&region)?;
        self.render(&region, &coastline.layer, &sites.layer, output)?;

        Ok(MapSummary {
            projected_crs: region.projected.crs().epsg_code(),
            region_area: region.projected.area(),
            coastline_features: coastline.layer.len(),
            crop: coastline.crop,
            site_rows: sites.report.total_rows,
            sites_drawn: sites.layer.len(),
            sites_rejected: sites.report.rejected.len(),
            output: output.to_path_buf(),
        })
    }
}
