//! Coordinate reference system definition table
//!
//! The table is embedded from `crs_definitions.toml` and parsed once on
//! first use.

use std::collections::HashMap;
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::errors::{MapError, MapResult};

lazy_static! {
    // Parse the TOML file at startup
    static ref CRS_DEFINITIONS: CrsDefinitions = {
        let content = include_str!("../../crs_definitions.toml");
        CrsDefinitions::from_str(content).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse CRS definitions: {}", e);
            CrsDefinitions::default()
        })
    };
}

/// Whether a system measures angles or distances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    /// Longitude/latitude in degrees
    Geographic,
    /// Eastings/northings in metres
    Projected,
}

/// Map projection method for projected systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMethod {
    Albers,
    WebMercator,
    TransverseMercator,
}

/// Reference ellipsoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EllipsoidDefinition {
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
}

/// One entry of the definition table
#[derive(Debug, Clone, Deserialize)]
pub struct CrsDefinition {
    pub name: String,
    pub kind: CrsKind,
    pub projection: Option<ProjectionMethod>,
    pub ellipsoid: String,
    pub latitude_of_origin: Option<f64>,
    pub central_meridian: Option<f64>,
    pub standard_parallel_1: Option<f64>,
    pub standard_parallel_2: Option<f64>,
    pub scale_factor: Option<f64>,
    pub false_easting: Option<f64>,
    pub false_northing: Option<f64>,
    /// ESRI flavoured WKT, as written to `.prj` files
    pub wkt: String,
}

/// Template for the UTM zone family
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtmTemplate {
    pub ellipsoid: String,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing_south: f64,
    pub wkt_template: String,
}

/// The whole definition table
#[derive(Debug, Default, Deserialize)]
pub struct CrsDefinitions {
    #[serde(default)]
    pub ellipsoid: HashMap<String, EllipsoidDefinition>,
    #[serde(default)]
    pub crs: HashMap<String, CrsDefinition>,
    #[serde(default)]
    pub utm: UtmTemplate,
}

impl CrsDefinitions {
    /// Parse CRS definitions from a TOML string
    pub fn from_str(content: &str) -> MapResult<Self> {
        toml::from_str(content)
            .map_err(|e| MapError::ConfigError(format!("Failed to parse CRS definitions: {}", e)))
    }
}

/// Look up a fixed definition by EPSG code
pub fn lookup(epsg: u32) -> Option<&'static CrsDefinition> {
    CRS_DEFINITIONS.crs.get(&epsg.to_string())
}

/// Every fixed definition with its EPSG code, in ascending code order
pub fn all() -> Vec<(u32, &'static CrsDefinition)> {
    let mut entries: Vec<(u32, &'static CrsDefinition)> = CRS_DEFINITIONS.crs.iter()
        .filter_map(|(code, def)| code.parse::<u32>().ok().map(|c| (c, def)))
        .collect();
    entries.sort_by_key(|(code, _)| *code);
    entries
}

/// Look up an ellipsoid by name
pub fn ellipsoid(name: &str) -> MapResult<EllipsoidDefinition> {
    CRS_DEFINITIONS.ellipsoid.get(name).copied().ok_or_else(|| {
        MapError::ConfigError(format!("Unknown ellipsoid '{}' in CRS definitions", name))
    })
}

/// Expand the UTM template for one zone
pub fn utm_definition(zone: u8, north: bool) -> CrsDefinition {
    let template = &CRS_DEFINITIONS.utm;
    let central_meridian = -183.0 + 6.0 * zone as f64;
    let false_northing = if north { 0.0 } else { template.false_northing_south };
    let hemisphere = if north { "N" } else { "S" };

    let wkt = template.wkt_template
        .replace("{ZONE}", &zone.to_string())
        .replace("{HEMISPHERE}", hemisphere)
        .replace("{FALSE_NORTHING}", &format!("{:.1}", false_northing))
        .replace("{CENTRAL_MERIDIAN}", &format!("{:.1}", central_meridian));

    CrsDefinition {
        name: format!("WGS 84 / UTM zone {}{}", zone, hemisphere),
        kind: CrsKind::Projected,
        projection: Some(ProjectionMethod::TransverseMercator),
        ellipsoid: template.ellipsoid.clone(),
        latitude_of_origin: Some(0.0),
        central_meridian: Some(central_meridian),
        standard_parallel_1: None,
        standard_parallel_2: None,
        scale_factor: Some(template.scale_factor),
        false_easting: Some(template.false_easting),
        false_northing: Some(false_northing),
        wkt,
    }
}
