//! Reference ellipsoid derived quantities

use super::definitions::{self, EllipsoidDefinition};
use crate::errors::MapResult;

/// Ellipsoid with the eccentricity terms the projections need
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres
    pub a: f64,
    /// First eccentricity squared
    pub e2: f64,
    /// First eccentricity
    pub e: f64,
}

impl Ellipsoid {
    pub fn from_definition(def: EllipsoidDefinition) -> Self {
        let f = 1.0 / def.inverse_flattening;
        let e2 = 2.0 * f - f * f;
        Ellipsoid { a: def.semi_major_axis, e2, e: e2.sqrt() }
    }

    /// Look up a named ellipsoid in the definition table
    pub fn named(name: &str) -> MapResult<Self> {
        Ok(Self::from_definition(definitions::ellipsoid(name)?))
    }

    /// Second eccentricity squared
    pub fn ep2(&self) -> f64 {
        self.e2 / (1.0 - self.e2)
    }
}
