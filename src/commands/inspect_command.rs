//! Configuration and input inspection command
//!
//! Reports what a render would work with (systems, region, coastline,
//! site table) without cropping or drawing anything.

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::load_config;
use crate::config::MapConfig;
use crate::errors::MapResult;
use crate::io::{ShapefileReader, SiteSource};
use crate::layer::PointLayerBuilder;
use crate::pipeline::{MapPipeline, MapRegion};
use crate::utils::logger::Logger;

/// Command printing a summary of the configured inputs
pub struct InspectCommand<'a> {
    config: MapConfig,
    logger: &'a Logger,
}

impl<'a> InspectCommand<'a> {
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> MapResult<Self> {
        Ok(InspectCommand {
            config: load_config(args)?,
            logger,
        })
    }

    /// Print a line and keep it in the run log
    fn report(&self, line: &str) -> MapResult<()> {
        println!("{}", line);
        self.logger.log(line)?;
        Ok(())
    }

    fn report_region(&self, region: &MapRegion) -> MapResult<()> {
        self.report(&format!("Coordinate systems: {} -> {}", region.geographic.crs(), region.projected.crs()))?;
        let extent = &self.config.extent;
        self.report(&format!("Extent: north {}, south {}, east {}, west {}",
                             extent.north, extent.south, extent.east, extent.west))?;

        let names = ["SW", "SE", "NE", "NW"];
        for (name, (geo, proj)) in names.iter().zip(region.geographic.corners().iter().zip(region.projected.corners().iter())) {
            self.report(&format!("  {} ({:.5}, {:.5}) -> ({:.2}, {:.2})", name, geo.x, geo.y, proj.x, proj.y))?;
        }
        let envelope = region.envelope();
        self.report(&format!("Crop envelope: x {:.2}..{:.2}, y {:.2}..{:.2}",
                             envelope.min().x, envelope.max().x, envelope.min().y, envelope.max().y))?;
        self.report(&format!("Region area: {:.3} km²", region.projected.area() / 1.0e6))
    }

    fn report_coastline(&self) -> MapResult<()> {
        let layer = ShapefileReader::new(&self.config.inputs.shapefile).read()?;
        self.report(&format!("Coastline: {} ({} features in {})",
                             self.config.inputs.shapefile.display(), layer.len(), layer.crs()))?;
        self.report(&format!("  Fields: {}", layer.fields().join(", ")))?;
        if let Some(bounds) = layer.bounding_rect() {
            self.report(&format!("  Bounds: x {:.2}..{:.2}, y {:.2}..{:.2}",
                                 bounds.min().x, bounds.max().x, bounds.min().y, bounds.max().y))?;
        }
        Ok(())
    }

    fn report_sites(&self) -> MapResult<()> {
        let points = &self.config.points;
        let table = SiteSource::from_location(&self.config.inputs.sites)?.read_table()?;
        self.report(&format!("Sites: {} ({} rows)", self.config.inputs.sites, table.rows.len()))?;
        self.report(&format!("  Columns: {}", table.headers.join(", ")))?;

        let (layer, report) = PointLayerBuilder::new(&points.longitude_column, &points.latitude_column)
            .build(&table)?;
        self.report(&format!("  Valid coordinates: {} of {}", report.accepted, report.total_rows))?;
        for rejected in &report.rejected {
            self.report(&format!("  Line {}: {}", rejected.line, rejected.reason))?;
        }
        if let Some(column) = &points.category_column {
            self.report(&format!("  Categories in '{}': {}", column, layer.categories(column).join(", ")))?;
        }
        Ok(())
    }
}

impl<'a> Command for InspectCommand<'a> {
    fn execute(&self) -> MapResult<()> {
        info!("Inspecting configuration");
        let region = MapPipeline::new(&self.config, self.logger).build_region()?;

        self.report_region(&region)?;
        self.report_coastline()?;
        self.report_sites()?;
        self.report(&format!("Output: {}", self.config.output.path.display()))
    }
}
