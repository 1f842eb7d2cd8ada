//! Bounding region used to crop layers

use geo::{Area, BoundingRect, Coord, LineString, Polygon, Rect};
use log::debug;

use super::crs::CoordinateSystem;
use super::extent::Extent;
use super::transform::CoordinateTransformer;
use crate::errors::{MapError, MapResult};

/// Vertices inserted along each edge so curved projected edges are followed
pub const DEFAULT_SEGMENTS_PER_EDGE: usize = 16;

/// A closed rectangular region tagged with its coordinate system
///
/// The ring runs SW, SE, NE, NW; the four corners are always vertices.
/// Reprojection returns a new region and leaves this one untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingRegion {
    crs: CoordinateSystem,
    ring: LineString<f64>,
    segments_per_edge: usize,
}

impl BoundingRegion {
    /// Build a region from an extent expressed in a geographic system
    pub fn from_extent(extent: &Extent, crs: CoordinateSystem) -> MapResult<Self> {
        Self::from_extent_with_segments(extent, crs, DEFAULT_SEGMENTS_PER_EDGE)
    }

    /// Build a region with a custom densification
    pub fn from_extent_with_segments(extent: &Extent, crs: CoordinateSystem, segments_per_edge: usize) -> MapResult<Self> {
        extent.validate()?;
        if !crs.is_geographic() {
            return Err(MapError::ConfigError(format!(
                "Extent is in degrees but {} is not a geographic system", crs
            )));
        }
        let segments = segments_per_edge.max(1);

        let corners = [
            Coord { x: extent.west, y: extent.south },
            Coord { x: extent.east, y: extent.south },
            Coord { x: extent.east, y: extent.north },
            Coord { x: extent.west, y: extent.north },
        ];

        let mut coords = Vec::with_capacity(4 * segments + 1);
        for i in 0..4 {
            let start = corners[i];
            let end = corners[(i + 1) % 4];
            for step in 0..segments {
                let t = step as f64 / segments as f64;
                coords.push(Coord {
                    x: start.x + (end.x - start.x) * t,
                    y: start.y + (end.y - start.y) * t,
                });
            }
        }
        coords.push(corners[0]);

        Ok(BoundingRegion { crs, ring: LineString::new(coords), segments_per_edge: segments })
    }

    /// Reproject into another system, returning a new region
    pub fn reproject(&self, target: CoordinateSystem) -> MapResult<BoundingRegion> {
        let transformer = CoordinateTransformer::new(self.crs, target)?;
        let coords = self.ring.coords()
            .map(|c| transformer.transform_coord(*c))
            .collect::<MapResult<Vec<_>>>()?;

        let region = BoundingRegion {
            crs: target,
            ring: LineString::new(coords),
            segments_per_edge: self.segments_per_edge,
        };

        if region.area() <= 0.0 {
            return Err(MapError::TransformError(format!(
                "Region collapsed to zero area in {}", target
            )));
        }

        debug!("Reprojected region {} -> {}, envelope {:?}", self.crs.epsg_code(), target.epsg_code(), region.envelope());
        Ok(region)
    }

    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    /// Corner vertices in SW, SE, NE, NW order
    pub fn corners(&self) -> [Coord<f64>; 4] {
        let s = self.segments_per_edge;
        let c = &self.ring.0;
        [c[0], c[s], c[2 * s], c[3 * s]]
    }

    /// The region as a polygon
    pub fn polygon(&self) -> Polygon<f64> {
        Polygon::new(self.ring.clone(), vec![])
    }

    /// Axis-aligned envelope; layers are cropped to this rectangle
    pub fn envelope(&self) -> Rect<f64> {
        // Ring always holds at least five coordinates, so a rect exists
        self.ring.bounding_rect().unwrap_or_else(|| Rect::new(self.ring.0[0], self.ring.0[0]))
    }

    /// Area in squared units of the region's system
    pub fn area(&self) -> f64 {
        self.polygon().unsigned_area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study_extent() -> Extent {
        Extent::new(48.922, 48.80, -125.05, -125.26).unwrap()
    }

    #[test]
    fn test_corners_match_extent() {
        let region = BoundingRegion::from_extent(&study_extent(), CoordinateSystem::Wgs84).unwrap();
        let [sw, se, ne, nw] = region.corners();
        assert_eq!((sw.x, sw.y), (-125.26, 48.80));
        assert_eq!((se.x, se.y), (-125.05, 48.80));
        assert_eq!((ne.x, ne.y), (-125.05, 48.922));
        assert_eq!((nw.x, nw.y), (-125.26, 48.922));
    }

    #[test]
    fn test_reprojected_region_has_positive_area() {
        let region = BoundingRegion::from_extent(&study_extent(), CoordinateSystem::Wgs84).unwrap();
        let projected = region.reproject(CoordinateSystem::BcAlbers).unwrap();

        assert_eq!(projected.crs(), CoordinateSystem::BcAlbers);
        // Roughly 15 km by 13.5 km
        assert!(projected.area() > 1.5e8 && projected.area() < 2.5e8);
        let env = projected.envelope();
        assert!(env.width() > 14_000.0 && env.height() > 13_000.0);

        // Source untouched
        assert_eq!(region.crs(), CoordinateSystem::Wgs84);
    }

    #[test]
    fn test_corner_round_trip() {
        let extent = study_extent();
        let region = BoundingRegion::from_extent(&extent, CoordinateSystem::Wgs84).unwrap();
        let back = region.reproject(CoordinateSystem::BcAlbers).unwrap()
            .reproject(CoordinateSystem::Wgs84).unwrap();

        let [sw, _, ne, _] = back.corners();
        assert!((sw.x - extent.west).abs() < 1e-6);
        assert!((sw.y - extent.south).abs() < 1e-6);
        assert!((ne.x - extent.east).abs() < 1e-6);
        assert!((ne.y - extent.north).abs() < 1e-6);
    }

    #[test]
    fn test_projected_extent_system_rejected() {
        assert!(BoundingRegion::from_extent(&study_extent(), CoordinateSystem::BcAlbers).is_err());
    }

    #[test]
    fn test_single_segment_ring() {
        let region = BoundingRegion::from_extent_with_segments(&study_extent(), CoordinateSystem::Wgs84, 1).unwrap();
        assert_eq!(region.polygon().exterior().0.len(), 5);
    }
}
