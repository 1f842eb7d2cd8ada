//! Coordinate transformation functionality

use geo::{Coord, MapCoords, MultiPolygon, Point};
use log::debug;

use super::crs::CoordinateSystem;
use super::projection::{Projection, ProjectionFactory};
use crate::errors::{MapError, MapResult};

/// Transformer for converting between two coordinate systems
///
/// Coordinates pivot through longitude/latitude: the source projection is
/// inverted, then the target projection applied. The geographic datums
/// supported (WGS 84, NAD83) are treated as coincident.
pub struct CoordinateTransformer {
    from: CoordinateSystem,
    to: CoordinateSystem,
    source: Box<dyn Projection>,
    target: Box<dyn Projection>,
}

impl CoordinateTransformer {
    /// Create a transformer for a CRS pair
    pub fn new(from: CoordinateSystem, to: CoordinateSystem) -> MapResult<Self> {
        let source = ProjectionFactory::create(&from).map_err(|e| MapError::TransformError(format!(
            "Cannot transform from {}: {}", from, e
        )))?;
        let target = ProjectionFactory::create(&to).map_err(|e| MapError::TransformError(format!(
            "Cannot transform to {}: {}", to, e
        )))?;

        debug!("Created transformer {} ({}) -> {} ({})",
               from.epsg_code(), source.name(), to.epsg_code(), target.name());

        Ok(CoordinateTransformer { from, to, source, target })
    }

    pub fn from(&self) -> CoordinateSystem {
        self.from
    }

    pub fn to(&self) -> CoordinateSystem {
        self.to
    }

    /// Whether the transformation leaves coordinates untouched
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Transform a single x/y pair
    pub fn transform_xy(&self, x: f64, y: f64) -> MapResult<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(MapError::TransformError(format!("Non-finite input coordinate ({}, {})", x, y)));
        }
        if self.is_identity() {
            return Ok((x, y));
        }

        let (lon, lat) = self.source.inverse(x, y);
        let (tx, ty) = self.target.forward(lon, lat);

        if !tx.is_finite() || !ty.is_finite() {
            return Err(MapError::TransformError(format!(
                "Coordinate ({}, {}) has no image in {}", x, y, self.to
            )));
        }
        Ok((tx, ty))
    }

    /// Transform a coordinate
    pub fn transform_coord(&self, coord: Coord<f64>) -> MapResult<Coord<f64>> {
        let (x, y) = self.transform_xy(coord.x, coord.y)?;
        Ok(Coord { x, y })
    }

    /// Transform a point
    pub fn transform_point(&self, point: &Point<f64>) -> MapResult<Point<f64>> {
        let (x, y) = self.transform_xy(point.x(), point.y())?;
        Ok(Point::new(x, y))
    }

    /// Transform every vertex of a multipolygon
    pub fn transform_multi_polygon(&self, geometry: &MultiPolygon<f64>) -> MapResult<MultiPolygon<f64>> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_identity_transform() {
        let t = CoordinateTransformer::new(CoordinateSystem::BcAlbers, CoordinateSystem::BcAlbers).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform_xy(1.5, 2.5).unwrap(), (1.5, 2.5));
    }

    #[test]
    fn test_wgs84_to_albers_round_trip() {
        let forward = CoordinateTransformer::new(CoordinateSystem::Wgs84, CoordinateSystem::BcAlbers).unwrap();
        let back = CoordinateTransformer::new(CoordinateSystem::BcAlbers, CoordinateSystem::Wgs84).unwrap();

        let p = Point::new(-125.1375, 48.8342);
        let projected = forward.transform_point(&p).unwrap();
        assert!(projected.x() > 1_000_000.0);

        let recovered = back.transform_point(&projected).unwrap();
        assert!((recovered.x() - p.x()).abs() < 1e-9);
        assert!((recovered.y() - p.y()).abs() < 1e-9);
    }

    #[test]
    fn test_projected_to_projected_pivots_through_geographic() {
        let t = CoordinateTransformer::new(CoordinateSystem::BcAlbers, CoordinateSystem::Utm(10, true)).unwrap();
        let to_albers = CoordinateTransformer::new(CoordinateSystem::Wgs84, CoordinateSystem::BcAlbers).unwrap();
        let to_utm = CoordinateTransformer::new(CoordinateSystem::Wgs84, CoordinateSystem::Utm(10, true)).unwrap();

        let albers = to_albers.transform_xy(-123.1139, 49.2609).unwrap();
        let direct = to_utm.transform_xy(-123.1139, 49.2609).unwrap();
        let via = t.transform_xy(albers.0, albers.1).unwrap();
        assert!((via.0 - direct.0).abs() < 1e-3);
        assert!((via.1 - direct.1).abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let t = CoordinateTransformer::new(CoordinateSystem::Wgs84, CoordinateSystem::BcAlbers).unwrap();
        assert!(matches!(t.transform_xy(f64::NAN, 48.0), Err(MapError::TransformError(_))));
    }

    #[test]
    fn test_multi_polygon_vertices_all_moved() {
        let t = CoordinateTransformer::new(CoordinateSystem::Wgs84, CoordinateSystem::BcAlbers).unwrap();
        let mp = MultiPolygon::new(vec![polygon![
            (x: -125.2, y: 48.85),
            (x: -125.1, y: 48.85),
            (x: -125.1, y: 48.90),
            (x: -125.2, y: 48.85),
        ]]);
        let projected = t.transform_multi_polygon(&mp).unwrap();
        for coord in projected.0[0].exterior().coords() {
            assert!(coord.x > 1_000_000.0);
            assert!(coord.y > 400_000.0);
        }
    }
}
