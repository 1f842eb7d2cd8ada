//! `.prj` (WKT) projection files
//!
//! Recognises the systems in the definition table from either an EPSG
//! authority code or the projection name and parameters. A `.prj` that
//! matches nothing is an error; there is no assumed default.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use log::debug;
use regex::Regex;

use crate::coordinate::definitions::{self, CrsKind, ProjectionMethod};
use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory};
use crate::errors::{MapError, MapResult};

/// Tolerance when comparing projection parameters
const PARAMETER_TOLERANCE: f64 = 1e-6;

/// Reader/writer for `.prj` files
pub struct PrjParser;

impl PrjParser {
    /// Read and identify the system in a `.prj` file
    pub fn read(path: &Path) -> MapResult<CoordinateSystem> {
        let wkt = fs::read_to_string(path).map_err(|e| MapError::LoadError(format!(
            "Cannot read projection file {}: {}", path.display(), e
        )))?;
        Self::parse(&wkt).map_err(|e| match e {
            MapError::LoadError(msg) => MapError::LoadError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Write the WKT for a system
    pub fn write(path: &Path, crs: &CoordinateSystem) -> MapResult<()> {
        fs::write(path, crs.wkt()?)?;
        Ok(())
    }

    /// Identify the coordinate system described by WKT text
    pub fn parse(wkt: &str) -> MapResult<CoordinateSystem> {
        let wkt = wkt.trim();
        if wkt.is_empty() {
            return Err(MapError::LoadError("Projection definition is empty".to_string()));
        }

        let upper = wkt.to_uppercase();
        let projected_root = upper.starts_with("PROJCS") || upper.starts_with("PROJCRS");

        let authority = Self::authority_code(wkt)?;
        if let Some(code) = authority {
            match CoordinateSystemFactory::from_epsg(code) {
                Ok(crs) if crs.is_geographic() != projected_root => {
                    debug!("Identified EPSG:{} from authority code", code);
                    return Ok(crs);
                },
                Ok(crs) => debug!("Authority code EPSG:{} ({}) does not match the root node, matching parameters", code, crs),
                Err(_) => debug!("Authority code EPSG:{} not in registry, matching parameters", code),
            }
        }

        let identified = if projected_root {
            Self::match_projected(wkt)?
        } else if upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS") || upper.starts_with("GEODCRS") {
            Self::match_geographic(&upper)
        } else {
            None
        };

        identified.ok_or_else(|| {
            let head: String = wkt.chars().take(60).collect();
            match authority {
                Some(code) => MapError::LoadError(format!("Unsupported coordinate system EPSG:{}", code)),
                None => MapError::LoadError(format!("Unrecognised projection definition: {}...", head)),
            }
        })
    }

    /// EPSG authority of the root node; nested authorities are ignored
    fn authority_code(wkt: &str) -> MapResult<Option<u32>> {
        let re = regex(r#"(?i)(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#)?;
        let depths = bracket_depths(wkt);
        Ok(re.captures_iter(wkt)
            .filter(|caps| caps.get(0).map(|m| depths[m.start()] == 1).unwrap_or(false))
            .last()
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok()))
    }

    fn match_geographic(upper: &str) -> Option<CoordinateSystem> {
        if upper.contains("WGS_1984") || upper.contains("WGS 84") || upper.contains("WGS84") {
            Some(CoordinateSystem::Wgs84)
        } else if upper.contains("NORTH_AMERICAN_1983") || upper.contains("NAD83") || upper.contains("NORTH AMERICAN DATUM 1983") {
            Some(CoordinateSystem::Nad83)
        } else {
            None
        }
    }

    fn match_projected(wkt: &str) -> MapResult<Option<CoordinateSystem>> {
        let method_re = regex(r#"(?i)(?:PROJECTION|METHOD)\[\s*"([^"]+)""#)?;
        let method = method_re.captures(wkt)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase().replace(' ', "_"))
            .unwrap_or_default();
        let params = Self::parameters(wkt)?;
        let name = wkt.to_uppercase();

        debug!("Matching projected WKT: method='{}', {} parameters", method, params.len());

        if method.contains("albers") {
            return Ok(Self::match_albers(&params));
        }
        if method.contains("auxiliary_sphere") || method.contains("popular_visualisation")
            || name.contains("WEB_MERCATOR") || name.contains("PSEUDO-MERCATOR") {
            return Ok(Some(CoordinateSystem::WebMercator));
        }
        if method.contains("transverse_mercator") {
            return Ok(Self::match_utm(&name, &params));
        }
        Ok(None)
    }

    /// Parameter name (lower case) to value
    fn parameters(wkt: &str) -> MapResult<HashMap<String, f64>> {
        let re = regex(r#"(?i)PARAMETER\[\s*"([^"]+)"\s*,\s*(-?[0-9.]+(?:[eE][-+]?[0-9]+)?)"#)?;
        Ok(re.captures_iter(wkt)
            .filter_map(|caps| {
                let name = caps.get(1)?.as_str().to_lowercase().replace(' ', "_");
                let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
                Some((name, value))
            })
            .collect())
    }

    fn match_albers(params: &HashMap<String, f64>) -> Option<CoordinateSystem> {
        let get = |keys: &[&str]| keys.iter().find_map(|k| params.get(*k).copied());

        let lat1 = get(&["standard_parallel_1", "latitude_of_1st_standard_parallel"])?;
        let lat2 = get(&["standard_parallel_2", "latitude_of_2nd_standard_parallel"])?;
        let lon0 = get(&["central_meridian", "longitude_of_center", "longitude_of_false_origin"])?;
        let lat0 = get(&["latitude_of_origin", "latitude_of_center", "latitude_of_false_origin"]).unwrap_or(0.0);
        let false_easting = get(&["false_easting", "easting_at_false_origin"]).unwrap_or(0.0);

        definitions::all().into_iter()
            .filter(|(_, def)| def.kind == CrsKind::Projected && def.projection == Some(ProjectionMethod::Albers))
            .find(|(_, def)| {
                close(def.standard_parallel_1, lat1)
                    && close(def.standard_parallel_2, lat2)
                    && close(def.central_meridian, lon0)
                    && close(def.latitude_of_origin, lat0)
                    && close(def.false_easting, false_easting)
            })
            .and_then(|(code, _)| CoordinateSystemFactory::from_epsg(code).ok())
    }

    fn match_utm(upper_name: &str, params: &HashMap<String, f64>) -> Option<CoordinateSystem> {
        // Name first: "UTM_Zone_10N", "UTM zone 10N"
        if let Ok(re) = regex(r"UTM[_ ]ZONE[_ ](\d{1,2})([NS])") {
            if let Some(caps) = re.captures(upper_name) {
                let zone = caps.get(1).and_then(|m| m.as_str().parse::<u8>().ok());
                let north = caps.get(2).map(|m| m.as_str() == "N");
                if let (Some(zone), Some(north)) = (zone, north) {
                    if (1..=60).contains(&zone) {
                        return Some(CoordinateSystem::Utm(zone, north));
                    }
                }
            }
        }

        // Otherwise infer the zone from the parameters
        let scale = params.get("scale_factor").copied()?;
        let lon0 = params.get("central_meridian").copied()?;
        let false_easting = params.get("false_easting").copied()?;
        let false_northing = params.get("false_northing").copied().unwrap_or(0.0);
        if (scale - 0.9996).abs() > PARAMETER_TOLERANCE || (false_easting - 500_000.0).abs() > PARAMETER_TOLERANCE {
            return None;
        }
        let zone = (lon0 + 183.0) / 6.0;
        if (zone - zone.round()).abs() > PARAMETER_TOLERANCE || !(1.0..=60.0).contains(&zone) {
            return None;
        }
        let north = false_northing.abs() < PARAMETER_TOLERANCE;
        Some(CoordinateSystem::Utm(zone.round() as u8, north))
    }
}

/// Bracket nesting depth before each byte; quoted text is skipped
fn bracket_depths(wkt: &str) -> Vec<usize> {
    let mut depths = Vec::with_capacity(wkt.len());
    let mut depth = 0usize;
    let mut quoted = false;
    for byte in wkt.bytes() {
        depths.push(depth);
        match byte {
            b'"' => quoted = !quoted,
            b'[' | b'(' if !quoted => depth += 1,
            b']' | b')' if !quoted => depth = depth.saturating_sub(1),
            _ => {},
        }
    }
    depths
}

fn close(expected: Option<f64>, actual: f64) -> bool {
    expected.map(|e| (e - actual).abs() < PARAMETER_TOLERANCE).unwrap_or(false)
}

fn regex(pattern: &str) -> MapResult<Regex> {
    Regex::new(pattern).map_err(|e| MapError::GenericError(format!("Invalid pattern {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESRI_BC_ALBERS: &str = r#"PROJCS["NAD_1983_BC_Environment_Albers",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Albers"],PARAMETER["False_Easting",1000000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-126.0],PARAMETER["Standard_Parallel_1",50.0],PARAMETER["Standard_Parallel_2",58.5],PARAMETER["Latitude_Of_Origin",45.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_esri_albers_by_parameters() {
        assert_eq!(PrjParser::parse(ESRI_BC_ALBERS).unwrap(), CoordinateSystem::BcAlbers);
    }

    #[test]
    fn test_ogc_wkt_with_authority() {
        let wkt = r#"PROJCS["NAD83 / BC Albers",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],AUTHORITY["EPSG","4269"]],PROJECTION["Albers_Conic_Equal_Area"],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","3005"]]"#;
        assert_eq!(PrjParser::parse(wkt).unwrap(), CoordinateSystem::BcAlbers);
    }

    #[test]
    fn test_nested_geographic_authority_ignored() {
        let wkt = r#"PROJCS["NAD83 / BC Albers",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4269"]],PROJECTION["Albers_Conic_Equal_Area"],PARAMETER["standard_parallel_1",50],PARAMETER["standard_parallel_2",58.5],PARAMETER["latitude_of_center",45],PARAMETER["longitude_of_center",-126],PARAMETER["false_easting",1000000],PARAMETER["false_northing",0],UNIT["metre",1]]"#;
        assert_eq!(PrjParser::parse(wkt).unwrap(), CoordinateSystem::BcAlbers);

        let lambert = r#"PROJCS["Lambert",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],AUTHORITY["EPSG","4326"]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["central_meridian",-95],UNIT["metre",1]]"#;
        assert!(matches!(PrjParser::parse(lambert), Err(MapError::LoadError(_))));
    }

    #[test]
    fn test_geographic_authority_on_projected_root_ignored() {
        let wkt = r#"PROJCS["mislabelled",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]],PROJECTION["Lambert_Conformal_Conic_2SP"],UNIT["metre",1],AUTHORITY["EPSG","4326"]]"#;
        assert!(matches!(PrjParser::parse(wkt), Err(MapError::LoadError(_))));
    }

    #[test]
    fn test_bracket_depths_skip_quotes() {
        let depths = bracket_depths(r#"A["x[",B[1]]"#);
        assert_eq!(depths[2], 1);
        assert_eq!(depths[9], 2);
    }

    #[test]
    fn test_geographic_datums() {
        let wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(PrjParser::parse(wgs84).unwrap(), CoordinateSystem::Wgs84);

        let nad83 = CoordinateSystem::Nad83.wkt().unwrap();
        assert_eq!(PrjParser::parse(&nad83).unwrap(), CoordinateSystem::Nad83);
    }

    #[test]
    fn test_utm_by_name_and_by_parameters() {
        let named = CoordinateSystem::Utm(9, true).wkt().unwrap();
        assert_eq!(PrjParser::parse(&named).unwrap(), CoordinateSystem::Utm(9, true));

        let anonymous = r#"PROJCS["custom",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        assert_eq!(PrjParser::parse(anonymous).unwrap(), CoordinateSystem::Utm(33, false));
    }

    #[test]
    fn test_registry_wkt_round_trips() {
        for crs in [CoordinateSystem::Wgs84, CoordinateSystem::BcAlbers, CoordinateSystem::WebMercator] {
            assert_eq!(PrjParser::parse(&crs.wkt().unwrap()).unwrap(), crs);
        }
    }

    #[test]
    fn test_unrecognised_is_load_error() {
        let lambert = r#"PROJCS["Lambert",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["Central_Meridian",-95.0],UNIT["Meter",1.0]]"#;
        assert!(matches!(PrjParser::parse(lambert), Err(MapError::LoadError(_))));
        assert!(matches!(PrjParser::parse("   "), Err(MapError::LoadError(_))));
        assert!(PrjParser::parse(r#"GEOGCS["Tokyo",DATUM["Tokyo"]]"#).is_err());
    }
}
