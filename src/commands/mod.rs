//! CLI command implementations
//!
//! This module contains implementations of the commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod crop_command;
pub mod inspect_command;
pub mod render_command;

pub use command_traits::{Command, CommandFactory};
pub use crop_command::CropCommand;
pub use inspect_command::InspectCommand;
pub use render_command::RenderCommand;

use std::path::PathBuf;
use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use log::debug;

use crate::config::MapConfig;
use crate::coordinate::{CoordinateSystemFactory, Extent};
use crate::errors::{MapError, MapResult};
use crate::utils::logger::Logger;

/// Command-line definition shared by the binary and the command tests
pub fn build_cli() -> ClapCommand {
    ClapCommand::new("MapKit")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Maurice Schilpp")
        .about("Render site-location maps from a coastline shapefile and a CSV of sites")
        .arg(
            Arg::new("config")
                .help("Map configuration file (TOML)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("crop-only")
                .long("crop-only")
                .help("Write the cropped coastline shapefile instead of a map")
                .action(ArgAction::SetTrue)
                .conflicts_with("inspect"),
        )
        .arg(
            Arg::new("inspect")
                .long("inspect")
                .help("Summarise the configuration and inputs without rendering")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file (map image, or .shp with --crop-only)")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("extent")
                .long("extent")
                .help("Override the extent (format: west,south,east,north in degrees)")
                .value_name("BBOX")
                .allow_hyphen_values(true)
                .required(false),
        )
        .arg(
            Arg::new("crs")
                .long("crs")
                .help("Override the projected system (e.g. EPSG:3005)")
                .value_name("CRS")
                .required(false),
        )
        .arg(
            Arg::new("no-cache")
                .long("no-cache")
                .help("Ignore the crop cache for this run")
                .action(ArgAction::SetTrue),
        )
}

/// Factory for creating command instances based on CLI arguments
pub struct MapkitCommandFactory;

impl MapkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        MapkitCommandFactory
    }
}

impl Default for MapkitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for MapkitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> MapResult<Box<dyn Command + 'a>> {
        if args.get_flag("inspect") {
            Ok(Box::new(InspectCommand::new(args, logger)?))
        } else if args.get_flag("crop-only") {
            Ok(Box::new(CropCommand::new(args, logger)?))
        } else {
            // Default to the full render
            Ok(Box::new(RenderCommand::new(args, logger)?))
        }
    }
}

/// Load the configuration named on the command line, apply the
/// `--extent` and `--crs` overrides and validate the result
pub(crate) fn load_config(args: &ArgMatches) -> MapResult<MapConfig> {
    let path = args.get_one::<String>("config")
        .ok_or_else(|| MapError::ConfigError("Missing configuration file".to_string()))?;
    let mut config = MapConfig::from_file(path)?;

    if let Some(bbox) = args.get_one::<String>("extent") {
        config.extent = Extent::from_string(bbox)?;
        debug!("Extent overridden from the command line: {:?}", config.extent);
    }
    if let Some(crs) = args.get_one::<String>("crs") {
        config.crs.projected = CoordinateSystemFactory::from_string(crs)?.epsg_code();
        debug!("Projected system overridden from the command line: EPSG:{}", config.crs.projected);
    }

    config.validate()?;
    debug!("Configuration {} is valid", path);
    Ok(config)
}

/// The `--output` override, if given
pub(crate) fn output_override(args: &ArgMatches) -> Option<PathBuf> {
    args.get_one::<String>("output").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use geo::{polygon, MultiPolygon};
    use crate::coordinate::CoordinateSystem;
    use crate::io::{write_shapefile, ShapefileReader};
    use crate::layer::{AttributeRow, AttributeValue, PolygonFeature, VectorLayer};

    /// Coastline, site table and a config enabling the cache, all in `dir`
    fn write_inputs(dir: &Path) -> PathBuf {
        let mut attributes = AttributeRow::new();
        attributes.push("NAME", AttributeValue::Text("Diana Island".to_string()));
        let island = polygon![
            (x: -125.20, y: 48.85), (x: -125.20, y: 48.88), (x: -125.15, y: 48.88),
            (x: -125.15, y: 48.85), (x: -125.20, y: 48.85),
        ];
        let coast = VectorLayer::new(
            CoordinateSystem::Wgs84,
            vec!["NAME".to_string()],
            vec![PolygonFeature { geometry: MultiPolygon::new(vec![island]), attributes }],
        );
        write_shapefile(dir.join("coast.shp"), &coast).unwrap();
        fs::write(dir.join("sites.csv"), "Site,Latitude,Longitude\nAguilar Point,48.835,-125.136\n").unwrap();

        let config = dir.join("map.toml");
        fs::write(&config, r#"
            [inputs]
            shapefile = "coast.shp"
            sites = "sites.csv"

            [cache]
            enabled = true
            directory = "cache"

            [output]
            path = "map.png"

            [render]
            width = 200
            height = 150
        "#).unwrap();
        config
    }

    fn matches(config: &Path, extra: &[&str]) -> ArgMatches {
        let mut argv = vec!["mapkit".to_string(), config.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        build_cli().try_get_matches_from(argv).unwrap()
    }

    fn execute(args: &ArgMatches, logger: &Logger) -> MapResult<()> {
        MapkitCommandFactory::new().create_command(args, logger)?.execute()
    }

    #[test]
    fn test_crop_only_writes_shapefile_next_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let logger = Logger::new(dir.path().join("run.log")).unwrap();

        let out = dir.path().join("cropped.png");
        execute(&matches(&config, &["--crop-only", "-o", out.to_str().unwrap()]), &logger).unwrap();

        let cropped = dir.path().join("cropped.shp");
        for ext in ["shp", "shx", "dbf", "prj"] {
            assert!(cropped.with_extension(ext).is_file(), "missing .{}", ext);
        }
        let layer = ShapefileReader::new(&cropped).read().unwrap();
        assert_eq!(layer.crs(), CoordinateSystem::BcAlbers);
        assert_eq!(layer.len(), 1);
        assert!(!out.exists());
    }

    #[test]
    fn test_crop_only_defaults_to_configured_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let logger = Logger::new(dir.path().join("run.log")).unwrap();

        execute(&matches(&config, &["--crop-only"]), &logger).unwrap();
        assert!(dir.path().join("map.shp").is_file());
        assert!(!dir.path().join("map.png").exists());
    }

    #[test]
    fn test_inspect_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let logger = Logger::new(dir.path().join("run.log")).unwrap();

        execute(&matches(&config, &["--inspect"]), &logger).unwrap();
        assert!(!dir.path().join("map.png").exists());
        assert!(!dir.path().join("cache").exists());
        assert!(fs::read_to_string(dir.path().join("run.log")).unwrap().contains("Coastline"));
    }

    #[test]
    fn test_render_output_override_checked_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let logger = Logger::new(dir.path().join("run.log")).unwrap();

        let bad = matches(&config, &["-o", "map.gif"]);
        let err = MapkitCommandFactory::new().create_command(&bad, &logger).err().unwrap();
        assert!(matches!(err, MapError::ConfigError(_)));

        let svg = dir.path().join("out.svg");
        execute(&matches(&config, &["-o", svg.to_str().unwrap()]), &logger).unwrap();
        assert!(svg.is_file());
        assert!(!dir.path().join("map.png").exists());
    }

    #[test]
    fn test_no_cache_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        let logger = Logger::new(dir.path().join("run.log")).unwrap();

        execute(&matches(&config, &["--no-cache"]), &logger).unwrap();
        assert!(dir.path().join("map.png").is_file());
        assert!(!dir.path().join("cache").exists());

        execute(&matches(&config, &[]), &logger).unwrap();
        let entries = fs::read_dir(dir.path().join("cache")).unwrap().count();
        assert!(entries > 0);
    }

    #[test]
    fn test_extent_and_crs_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());

        let args = matches(&config, &["--extent", "-125.3,48.7,-125.0,49.0", "--crs", "EPSG:3857"]);
        let loaded = load_config(&args).unwrap();
        assert_eq!(loaded.extent, Extent::new(49.0, 48.7, -125.0, -125.3).unwrap());
        assert_eq!(loaded.crs.projected, 3857);

        let unknown = matches(&config, &["--crs", "EPSG:2056"]);
        assert!(matches!(load_config(&unknown), Err(MapError::ConfigError(_))));

        let inverted = matches(&config, &["--extent", "-125.0,48.7,-125.3,49.0"]);
        assert!(matches!(load_config(&inverted), Err(MapError::ConfigError(_))));
    }
}
