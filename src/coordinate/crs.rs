//! Coordinate Reference System handling

use std::fmt;

use super::definitions::{self, CrsDefinition, CrsKind};
use crate::errors::{MapError, MapResult};

/// Geographic system the survey coordinates are recorded in (WGS 84)
pub const GEOGRAPHIC_CRS: u32 = 4326;

/// Projected system the map is drawn in (NAD83 / BC Albers)
pub const PROJECTED_CRS: u32 = 3005;

/// Linear or angular units of a system's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Degrees,
    Metres,
}

/// Identifier for the supported coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    Wgs84,
    /// NAD83 geographic (EPSG:4269)
    Nad83,
    /// NAD83 / BC Albers (EPSG:3005)
    BcAlbers,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM Zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    Utm(u8, bool),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::Wgs84 => 4326,
            CoordinateSystem::Nad83 => 4269,
            CoordinateSystem::BcAlbers => 3005,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::Utm(zone, is_northern) => {
                if *is_northern {
                    32600 + *zone as u32
                } else {
                    32700 + *zone as u32
                }
            },
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self.definition() {
            Ok(def) => format!("{} (EPSG:{})", def.name, self.epsg_code()),
            Err(_) => format!("EPSG:{}", self.epsg_code()),
        }
    }

    /// Whether coordinates are angles or planar distances
    pub fn kind(&self) -> CrsKind {
        match self {
            CoordinateSystem::Wgs84 | CoordinateSystem::Nad83 => CrsKind::Geographic,
            _ => CrsKind::Projected,
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.kind() == CrsKind::Geographic
    }

    /// Units of the x/y values
    pub fn units(&self) -> Units {
        match self.kind() {
            CrsKind::Geographic => Units::Degrees,
            CrsKind::Projected => Units::Metres,
        }
    }

    /// Full definition from the embedded table
    pub fn definition(&self) -> MapResult<CrsDefinition> {
        match self {
            CoordinateSystem::Utm(zone, is_northern) => {
                Ok(definitions::utm_definition(*zone, *is_northern))
            },
            _ => definitions::lookup(self.epsg_code()).cloned().ok_or_else(|| {
                MapError::ConfigError(format!("No definition for EPSG:{}", self.epsg_code()))
            }),
        }
    }

    /// WKT text for `.prj` files
    pub fn wkt(&self) -> MapResult<String> {
        Ok(self.definition()?.wkt)
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    ///
    /// Unknown codes are a configuration error; there is no fallback system.
    pub fn from_epsg(epsg: u32) -> MapResult<CoordinateSystem> {
        let crs = match epsg {
            4326 => CoordinateSystem::Wgs84,
            4269 => CoordinateSystem::Nad83,
            3005 => CoordinateSystem::BcAlbers,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::Utm((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::Utm((epsg - 32700) as u8, false),
            _ => return Err(MapError::ConfigError(format!("Unknown CRS code: EPSG:{}", epsg))),
        };

        // Make sure the table actually carries it
        crs.definition()?;
        Ok(crs)
    }

    /// Parse a coordinate system from a string (e.g. "EPSG:4326")
    pub fn from_string(crs_str: &str) -> MapResult<CoordinateSystem> {
        let crs_str = crs_str.trim().to_uppercase();

        if let Some(epsg_str) = crs_str.strip_prefix("EPSG:") {
            match epsg_str.trim().parse::<u32>() {
                Ok(epsg) => Self::from_epsg(epsg),
                Err(_) => Err(MapError::ConfigError(format!("Invalid EPSG code: {}", epsg_str))),
            }
        } else if let Ok(epsg) = crs_str.parse::<u32>() {
            Self::from_epsg(epsg)
        } else {
            Err(MapError::ConfigError(format!("Unsupported CRS format: {}", crs_str)))
        }
    }

    /// The geographic system survey points are recorded in
    pub fn geographic() -> MapResult<CoordinateSystem> {
        Self::from_epsg(GEOGRAPHIC_CRS)
    }

    /// The projected system maps are drawn in
    pub fn projected() -> MapResult<CoordinateSystem> {
        Self::from_epsg(PROJECTED_CRS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_constants() {
        let geo = CoordinateSystemFactory::geographic().unwrap();
        let proj = CoordinateSystemFactory::projected().unwrap();
        assert_eq!(geo, CoordinateSystem::Wgs84);
        assert_eq!(proj, CoordinateSystem::BcAlbers);
        assert_eq!(geo.units(), Units::Degrees);
        assert_eq!(proj.units(), Units::Metres);
    }

    #[test]
    fn test_unknown_code_is_config_error() {
        let err = CoordinateSystemFactory::from_epsg(9999).unwrap_err();
        assert!(matches!(err, MapError::ConfigError(_)));
    }

    #[test]
    fn test_from_string_variants() {
        assert_eq!(CoordinateSystemFactory::from_string("epsg:3005").unwrap(), CoordinateSystem::BcAlbers);
        assert_eq!(CoordinateSystemFactory::from_string(" 4269 ").unwrap(), CoordinateSystem::Nad83);
        assert_eq!(CoordinateSystemFactory::from_string("EPSG:32610").unwrap(), CoordinateSystem::Utm(10, true));
        assert!(CoordinateSystemFactory::from_string("albers").is_err());
        assert!(CoordinateSystemFactory::from_string("EPSG:abc").is_err());
    }

    #[test]
    fn test_utm_codes_round_trip() {
        let south = CoordinateSystemFactory::from_epsg(32733).unwrap();
        assert_eq!(south, CoordinateSystem::Utm(33, false));
        assert_eq!(south.epsg_code(), 32733);
        assert!(south.description().contains("UTM zone 33S"));
    }
}
