//! Polygon layer: reprojection and cropping
//!
//! A `VectorLayer` is loaded once and then only changed by whole-layer
//! operations, each of which returns a new layer.

use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Polygon, Rect};
use log::{debug, info};

use super::attributes::AttributeRow;
use crate::coordinate::{BoundingRegion, CoordinateSystem, CoordinateTransformer};
use crate::errors::{MapError, MapResult};
use crate::utils::progress::ProgressTracker;

/// One polygon feature and its attribute row
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub geometry: MultiPolygon<f64>,
    pub attributes: AttributeRow,
}

/// What a crop did to each feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropReport {
    /// Features entirely inside, kept unchanged
    pub kept: usize,
    /// Features straddling the boundary
    pub clipped: usize,
    /// Features entirely outside
    pub dropped: usize,
    /// Output features produced from clipped features
    pub pieces: usize,
}

/// A collection of polygon features tagged with one coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    crs: CoordinateSystem,
    fields: Vec<String>,
    features: Vec<PolygonFeature>,
}

impl VectorLayer {
    pub fn new(crs: CoordinateSystem, fields: Vec<String>, features: Vec<PolygonFeature>) -> Self {
        VectorLayer { crs, fields, features }
    }

    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    /// Attribute column names in source order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn features(&self) -> &[PolygonFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Envelope of every feature
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features.iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .reduce(|a, b| union_rect(&a, &b))
    }

    /// Total polygon area in squared layer units
    pub fn total_area(&self) -> f64 {
        self.features.iter().map(|f| f.geometry.unsigned_area()).sum()
    }

    /// Transform every coordinate into `target`; attributes are untouched
    pub fn reproject(&self, target: CoordinateSystem) -> MapResult<VectorLayer> {
        info!("Reprojecting {} polygon features from EPSG:{} to EPSG:{}",
              self.features.len(), self.crs.epsg_code(), target.epsg_code());

        let transformer = CoordinateTransformer::new(self.crs, target)?;
        let progress = ProgressTracker::new(self.features.len() as u64, "Reprojecting polygons");

        let mut features = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            features.push(PolygonFeature {
                geometry: transformer.transform_multi_polygon(&feature.geometry)?,
                attributes: feature.attributes.clone(),
            });
            progress.increment(1);
        }
        progress.finish();

        Ok(VectorLayer { crs: target, fields: self.fields.clone(), features })
    }

    /// Crop to a region sharing this layer's coordinate system
    pub fn crop(&self, region: &BoundingRegion) -> MapResult<VectorLayer> {
        let (layer, report) = self.crop_with_report(region)?;
        info!("Crop result: {} kept, {} clipped into {} pieces, {} dropped",
              report.kept, report.clipped, report.pieces, report.dropped);
        Ok(layer)
    }

    /// Crop and return a summary of what happened per feature
    pub fn crop_with_report(&self, region: &BoundingRegion) -> MapResult<(VectorLayer, CropReport)> {
        if region.crs() != self.crs {
            return Err(MapError::TransformError(format!(
                "Cannot crop layer in {} with region in {}; reproject first", self.crs, region.crs()
            )));
        }
        Ok(self.crop_to_rect(&region.envelope()))
    }

    /// Crop to an axis-aligned rectangle in layer units
    ///
    /// Features inside are kept as they are, features outside are dropped,
    /// and straddling features are clipped. Every piece a clip produces
    /// becomes its own feature with a copy of the source attribute row.
    pub fn crop_to_rect(&self, rect: &Rect<f64>) -> (VectorLayer, CropReport) {
        let clip = rect.to_polygon();
        let mut report = CropReport::default();
        let mut features = Vec::new();
        let progress = ProgressTracker::new(self.features.len() as u64, "Cropping polygons");

        for (index, feature) in self.features.iter().enumerate() {
            progress.increment(1);

            let Some(bbox) = feature.geometry.bounding_rect() else {
                report.dropped += 1;
                continue;
            };

            if rect_contains(rect, &bbox) {
                report.kept += 1;
                features.push(feature.clone());
                continue;
            }

            if !rects_overlap(rect, &bbox) {
                report.dropped += 1;
                continue;
            }

            let pieces: Vec<Polygon<f64>> = feature.geometry.intersection(&clip)
                .0
                .into_iter()
                .filter(|piece| piece.unsigned_area() > 0.0)
                .collect();

            if pieces.is_empty() {
                // Envelopes overlap but the shapes only touch or miss
                report.dropped += 1;
                continue;
            }

            debug!("Feature {} clipped into {} piece(s)", index, pieces.len());
            report.clipped += 1;
            report.pieces += pieces.len();
            for piece in pieces {
                features.push(PolygonFeature {
                    geometry: MultiPolygon::new(vec![piece]),
                    attributes: feature.attributes.clone(),
                });
            }
        }
        progress.finish();

        (VectorLayer { crs: self.crs, fields: self.fields.clone(), features }, report)
    }
}

fn rect_contains(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x && inner.max().x <= outer.max().x
        && inner.min().y >= outer.min().y && inner.max().y <= outer.max().y
}

fn rects_overlap(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x < b.max().x && b.min().x < a.max().x
        && a.min().y < b.max().y && b.min().y < a.max().y
}

fn union_rect(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo::Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        geo::Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Extent;
    use crate::layer::AttributeValue;
    use geo::{coord, polygon};

    fn feature(poly: Polygon<f64>, name: &str) -> PolygonFeature {
        let mut attributes = AttributeRow::new();
        attributes.push("NAME", AttributeValue::Text(name.to_string()));
        PolygonFeature { geometry: MultiPolygon::new(vec![poly]), attributes }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]
    }

    fn layer(features: Vec<PolygonFeature>) -> VectorLayer {
        VectorLayer::new(CoordinateSystem::BcAlbers, vec!["NAME".to_string()], features)
    }

    fn crop_rect() -> Rect<f64> {
        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 100.0, y: 100.0 })
    }

    #[test]
    fn test_interior_feature_is_identity() {
        let inside = feature(square(10.0, 10.0, 20.0, 20.0), "inside");
        let (cropped, report) = layer(vec![inside.clone()]).crop_to_rect(&crop_rect());
        assert_eq!(cropped.features(), &[inside]);
        assert_eq!(report.kept, 1);
    }

    #[test]
    fn test_exterior_feature_is_dropped() {
        let outside = feature(square(200.0, 200.0, 300.0, 300.0), "outside");
        let (cropped, report) = layer(vec![outside]).crop_to_rect(&crop_rect());
        assert!(cropped.is_empty());
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_straddling_feature_clipped_with_attributes() {
        let inside = feature(square(10.0, 10.0, 20.0, 20.0), "inside");
        let straddle = feature(square(50.0, 50.0, 150.0, 80.0), "straddle");
        let (cropped, report) = layer(vec![inside.clone(), straddle]).crop_to_rect(&crop_rect());

        assert_eq!(cropped.len(), 2);
        assert_eq!(cropped.features()[0], inside);

        let clipped = &cropped.features()[1];
        assert_eq!(clipped.attributes.get("NAME"), Some(&AttributeValue::Text("straddle".to_string())));
        assert!((clipped.geometry.unsigned_area() - 50.0 * 30.0).abs() < 1e-6);
        let bbox = clipped.geometry.bounding_rect().unwrap();
        assert!((bbox.max().x - 100.0).abs() < 1e-9);
        assert_eq!(report, CropReport { kept: 1, clipped: 1, dropped: 0, pieces: 1 });
    }

    #[test]
    fn test_split_pieces_duplicate_attributes() {
        // A U shape whose base lies outside the crop: two prongs survive
        let u_shape = polygon![
            (x: 10.0, y: -50.0), (x: 90.0, y: -50.0), (x: 90.0, y: 50.0),
            (x: 70.0, y: 50.0), (x: 70.0, y: -20.0), (x: 30.0, y: -20.0),
            (x: 30.0, y: 50.0), (x: 10.0, y: 50.0), (x: 10.0, y: -50.0),
        ];
        let rect = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 100.0, y: 100.0 });
        let (cropped, report) = layer(vec![feature(u_shape, "bay")]).crop_to_rect(&rect);

        assert_eq!(report.clipped, 1);
        assert_eq!(report.pieces, 2);
        assert_eq!(cropped.len(), 2);
        for piece in cropped.features() {
            assert_eq!(piece.attributes.get("NAME"), Some(&AttributeValue::Text("bay".to_string())));
            assert!((piece.geometry.unsigned_area() - 20.0 * 50.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_crop_requires_matching_crs() {
        let region = crate::coordinate::BoundingRegion::from_extent(&Extent::default(), CoordinateSystem::Wgs84).unwrap();
        let err = layer(vec![]).crop(&region).unwrap_err();
        assert!(matches!(err, MapError::TransformError(_)));
    }

    #[test]
    fn test_reproject_keeps_attributes() {
        let geographic = VectorLayer::new(
            CoordinateSystem::Wgs84,
            vec!["NAME".to_string()],
            vec![feature(square(-125.2, 48.85, -125.1, 48.9), "island")],
        );
        let projected = geographic.reproject(CoordinateSystem::BcAlbers).unwrap();

        assert_eq!(projected.crs(), CoordinateSystem::BcAlbers);
        assert_eq!(projected.features()[0].attributes, geographic.features()[0].attributes);
        assert!(projected.total_area() > 1.0e7);
        // Source untouched
        assert_eq!(geographic.crs(), CoordinateSystem::Wgs84);
    }
}
