//! Coordinate handling for geospatial data
//!
//! This module provides the coordinate system registry, the projection
//! strategies and the extent/region types the pipeline crops with.

mod crs;
pub mod definitions;
mod ellipsoid;
mod extent;
pub mod projection;
mod region;
mod transform;

// Re-export key types
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory, Units, GEOGRAPHIC_CRS, PROJECTED_CRS};
pub use self::definitions::CrsKind;
pub use self::ellipsoid::Ellipsoid;
pub use self::extent::Extent;
pub use self::region::{BoundingRegion, DEFAULT_SEGMENTS_PER_EDGE};
pub use self::transform::CoordinateTransformer;
