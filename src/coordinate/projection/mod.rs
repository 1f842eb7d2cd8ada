//! Map projection strategies
//!
//! Each projected system is backed by a `Projection` that converts between
//! geographic degrees and planar metres. Geographic systems use the identity
//! strategy so the transformer can always pivot through longitude/latitude.

mod albers;
mod geographic;
mod mercator;
mod transverse_mercator;

pub use self::albers::AlbersEqualArea;
pub use self::geographic::GeographicIdentity;
pub use self::mercator::WebMercator;
pub use self::transverse_mercator::TransverseMercator;

use super::crs::CoordinateSystem;
use super::definitions::{CrsDefinition, CrsKind, ProjectionMethod};
use super::ellipsoid::Ellipsoid;
use crate::errors::{MapError, MapResult};

/// Strategy trait for forward/inverse projection
pub trait Projection: Send + Sync {
    /// Project longitude/latitude in degrees to planar x/y
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64);

    /// Recover longitude/latitude in degrees from planar x/y
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);

    /// Get the name of this projection method
    fn name(&self) -> &'static str;
}

/// Factory for creating projection strategies
pub struct ProjectionFactory;

impl ProjectionFactory {
    /// Create the projection strategy for a coordinate system
    pub fn create(crs: &CoordinateSystem) -> MapResult<Box<dyn Projection>> {
        let def = crs.definition()?;

        if def.kind == CrsKind::Geographic {
            return Ok(Box::new(GeographicIdentity));
        }

        let ellipsoid = Ellipsoid::named(&def.ellipsoid)?;
        match def.projection {
            Some(ProjectionMethod::Albers) => Ok(Box::new(AlbersEqualArea::new(
                ellipsoid,
                param(&def, "latitude_of_origin", def.latitude_of_origin)?,
                param(&def, "central_meridian", def.central_meridian)?,
                param(&def, "standard_parallel_1", def.standard_parallel_1)?,
                param(&def, "standard_parallel_2", def.standard_parallel_2)?,
                def.false_easting.unwrap_or(0.0),
                def.false_northing.unwrap_or(0.0),
            )?)),
            Some(ProjectionMethod::WebMercator) => Ok(Box::new(WebMercator::new(
                ellipsoid.a,
                def.false_easting.unwrap_or(0.0),
                def.false_northing.unwrap_or(0.0),
            ))),
            Some(ProjectionMethod::TransverseMercator) => Ok(Box::new(TransverseMercator::new(
                ellipsoid,
                def.latitude_of_origin.unwrap_or(0.0),
                param(&def, "central_meridian", def.central_meridian)?,
                param(&def, "scale_factor", def.scale_factor)?,
                def.false_easting.unwrap_or(0.0),
                def.false_northing.unwrap_or(0.0),
            ))),
            None => Err(MapError::ConfigError(format!(
                "Projected system {} has no projection method", def.name
            ))),
        }
    }
}

fn param(def: &CrsDefinition, name: &str, value: Option<f64>) -> MapResult<f64> {
    value.ok_or_else(|| MapError::ConfigError(format!(
        "Projection parameter '{}' missing for {}", name, def.name
    )))
}
