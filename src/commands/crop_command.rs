//! Crop-only command
//!
//! Stops after the coastline stage and writes the cropped layer out as a
//! shapefile bundle for reuse.

use std::path::PathBuf;
use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::{load_config, output_override};
use crate::config::MapConfig;
use crate::errors::MapResult;
use crate::io::ShapefileWriter;
use crate::pipeline::MapPipeline;
use crate::utils::logger::Logger;

/// Command writing the cropped, projected coastline
pub struct CropCommand<'a> {
    config: MapConfig,
    output: PathBuf,
    use_cache: bool,
    logger: &'a Logger,
}

impl<'a> CropCommand<'a> {
    /// Create a new crop command
    ///
    /// Without `--output` the bundle lands next to the configured map
    /// output, as `<map name>.shp`.
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> MapResult<Self> {
        let config = load_config(args)?;
        let output = output_override(args)
            .unwrap_or_else(|| config.output.path.clone())
            .with_extension("shp");

        Ok(CropCommand {
            config,
            output,
            use_cache: !args.get_flag("no-cache"),
            logger,
        })
    }
}

impl<'a> Command for CropCommand<'a> {
    fn execute(&self) -> MapResult<()> {
        let pipeline = MapPipeline::new(&self.config, self.logger);
        let pipeline = if self.use_cache { pipeline } else { pipeline.without_cache() };

        let region = pipeline.build_region()?;
        let coastline = pipeline.load_coastline(&region)?;
        ShapefileWriter::new(&self.output).write(&coastline.layer)?;

        let message = match &coastline.crop {
            Some(report) => format!(
                "Cropped coastline written to {}: {} features ({} kept, {} clipped into {} pieces, {} dropped)",
                self.output.display(), coastline.layer.len(), report.kept, report.clipped, report.pieces, report.dropped
            ),
            None => format!(
                "Cropped coastline written to {}: {} features (from crop cache)",
                self.output.display(), coastline.layer.len()
            ),
        };
        info!("{}", message);
        self.logger.log(&message)?;
        println!("{}", message);
        Ok(())
    }
}
