//! Full map rendering command

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::{load_config, output_override};
use crate::config::MapConfig;
use crate::errors::MapResult;
use crate::pipeline::MapPipeline;
use crate::render::RendererFactory;
use crate::utils::logger::Logger;

/// Command running the whole pipeline to a map image
pub struct RenderCommand<'a> {
    config: MapConfig,
    use_cache: bool,
    logger: &'a Logger,
}

impl<'a> RenderCommand<'a> {
    /// Create a new render command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> MapResult<Self> {
        let mut config = load_config(args)?;
        if let Some(output) = output_override(args) {
            RendererFactory::for_path(&output)?;
            config.output.path = output;
        }

        Ok(RenderCommand {
            config,
            use_cache: !args.get_flag("no-cache"),
            logger,
        })
    }
}

impl<'a> Command for RenderCommand<'a> {
    fn execute(&self) -> MapResult<()> {
        info!("Rendering site map to {}", self.config.output.path.display());

        let pipeline = MapPipeline::new(&self.config, self.logger);
        let pipeline = if self.use_cache { pipeline } else { pipeline.without_cache() };
        let summary = pipeline.run(&self.config.output.path)?;

        self.logger.log(&summary.to_string())?;
        println!("{}", summary);
        Ok(())
    }
}
