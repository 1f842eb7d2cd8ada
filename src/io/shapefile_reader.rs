//! Polygon shapefile loading
//!
//! A shapefile is a bundle of four files sharing a stem: `.shp` geometry,
//! `.shx` index, `.dbf` attributes and `.prj` projection. All four must be
//! present before any of them is read.

use std::path::{Path, PathBuf};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use shapefile::dbase::{self, FieldValue};
use shapefile::{PolygonRing, Shape};

use super::prj::PrjParser;
use crate::errors::{MapError, MapResult};
use crate::layer::{AttributeRow, AttributeValue, PolygonFeature, VectorLayer};
use crate::utils::progress::ProgressTracker;

/// Extensions that make up a complete shapefile
pub const REQUIRED_SIDECARS: [&str; 4] = ["shp", "shx", "dbf", "prj"];

/// Reads polygon shapefiles into `VectorLayer`s
pub struct ShapefileReader {
    path: PathBuf,
}

impl ShapefileReader {
    /// Create a reader for the `.shp` at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.shp` file (or any member of the bundle)
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ShapefileReader { path: path.as_ref().with_extension("shp") }
    }

    /// Path of one bundle member
    pub fn sidecar(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }

    /// Fail with the names of any missing bundle members
    pub fn check_sidecars(&self) -> MapResult<()> {
        let missing: Vec<String> = REQUIRED_SIDECARS.iter()
            .map(|ext| self.sidecar(ext))
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MapError::LoadError(format!(
                "Incomplete shapefile {}: missing {}", self.path.display(), missing.join(", ")
            )))
        }
    }

    /// Load every polygon feature with its attribute row
    ///
    /// The layer is tagged with the system named by the `.prj`. Null
    /// shapes are skipped; any non-polygon shape is an error.
    pub fn read(&self) -> MapResult<VectorLayer> {
        self.check_sidecars()?;
        info!("Loading shapefile {}", self.path.display());

        let crs = PrjParser::read(&self.sidecar("prj"))?;
        debug!("Shapefile coordinate system: {}", crs);

        let fields = self.field_names()?;
        let mut reader = shapefile::Reader::from_path(&self.path)
            .map_err(|e| MapError::LoadError(format!("Cannot open {}: {}", self.path.display(), e)))?;

        let progress = ProgressTracker::spinner("Reading shapes");
        let mut features = Vec::new();
        let mut skipped = 0usize;

        for (index, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = result
                .map_err(|e| MapError::LoadError(format!("Corrupt record {} in {}: {}", index, self.path.display(), e)))?;
            progress.increment(1);

            let Some(geometry) = shape_to_multi_polygon(&shape, index)? else {
                skipped += 1;
                continue;
            };

            let attributes: AttributeRow = fields.iter()
                .map(|name| (name.clone(), record.get(name).map(field_value).unwrap_or(AttributeValue::Null)))
                .collect();

            features.push(PolygonFeature { geometry, attributes });
        }
        progress.finish();

        if skipped > 0 {
            warn!("Skipped {} empty shapes in {}", skipped, self.path.display());
        }
        info!("Loaded {} polygon features ({} fields) in {}", features.len(), fields.len(), crs);

        Ok(VectorLayer::new(crs, fields, features))
    }

    /// Column names in `.dbf` order
    fn field_names(&self) -> MapResult<Vec<String>> {
        let dbf = self.sidecar("dbf");
        let reader = dbase::Reader::from_path(&dbf)
            .map_err(|e| MapError::LoadError(format!("Cannot read attribute table {}: {}", dbf.display(), e)))?;
        Ok(reader.fields().iter()
            .map(|f| f.name().to_string())
            .filter(|name| name != "DeletionFlag")
            .collect())
    }
}

/// Load a shapefile, checking the bundle first
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> MapResult<VectorLayer> {
    ShapefileReader::new(path).read()
}

/// Convert one shape; `None` for null shapes
fn shape_to_multi_polygon(shape: &Shape, index: usize) -> MapResult<Option<MultiPolygon<f64>>> {
    let rings: Vec<(bool, Vec<Coord<f64>>)> = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(p) => p.rings().iter()
            .map(|r| (is_outer(r), r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()))
            .collect(),
        Shape::PolygonM(p) => p.rings().iter()
            .map(|r| (is_outer(r), r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()))
            .collect(),
        Shape::PolygonZ(p) => p.rings().iter()
            .map(|r| (is_outer(r), r.points().iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()))
            .collect(),
        other => {
            return Err(MapError::LoadError(format!(
                "Record {} is a {:?} shape; only polygon layers are supported", index, other.shapetype()
            )));
        },
    };

    let polygons = assemble_polygons(rings);
    if polygons.is_empty() {
        return Ok(None);
    }
    Ok(Some(MultiPolygon::new(polygons)))
}

fn is_outer<P>(ring: &PolygonRing<P>) -> bool {
    matches!(ring, PolygonRing::Outer(_))
}

/// Group rings into polygons; holes belong to the outer ring before them
fn assemble_polygons(rings: Vec<(bool, Vec<Coord<f64>>)>) -> Vec<Polygon<f64>> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for (outer, coords) in rings {
        if coords.len() < 3 {
            continue;
        }
        let ring = LineString::from(coords);
        if outer {
            polygons.push((ring, Vec::new()));
        } else if let Some((_, holes)) = polygons.last_mut() {
            holes.push(ring);
        } else {
            // Hole with no preceding shell: treat as a shell
            polygons.push((ring, Vec::new()));
        }
    }

    polygons.into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect()
}

fn field_value(value: &FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::from_raw(s.trim()),
        FieldValue::Memo(s) => AttributeValue::from_raw(s.trim()),
        FieldValue::Numeric(Some(n)) => AttributeValue::Number(*n),
        FieldValue::Float(Some(n)) => AttributeValue::Number(*n as f64),
        FieldValue::Integer(n) => AttributeValue::Number(*n as f64),
        FieldValue::Double(n) => AttributeValue::Number(*n),
        FieldValue::Currency(n) => AttributeValue::Number(*n),
        FieldValue::Logical(Some(b)) => AttributeValue::Logical(*b),
        FieldValue::Date(Some(d)) => AttributeValue::Date { year: d.year(), month: d.month(), day: d.day() },
        FieldValue::DateTime(dt) => {
            let (date, time) = (dt.date(), dt.time());
            AttributeValue::Text(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                date.year(), date.month(), date.day(), time.hours(), time.minutes(), time.seconds()
            ))
        },
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => AttributeValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_missing_sidecars_named() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("coast.shp");
        std::fs::write(&shp, b"").unwrap();
        std::fs::write(dir.path().join("coast.dbf"), b"").unwrap();

        let err = ShapefileReader::new(&shp).read().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, MapError::LoadError(_)));
        assert!(msg.contains("coast.shx"));
        assert!(msg.contains("coast.prj"));
        assert!(!msg.contains("coast.dbf"));
    }

    #[test]
    fn test_holes_attach_to_previous_shell() {
        let square = |x0: f64, y0: f64, s: f64| vec![
            Coord { x: x0, y: y0 }, Coord { x: x0, y: y0 + s },
            Coord { x: x0 + s, y: y0 + s }, Coord { x: x0 + s, y: y0 },
            Coord { x: x0, y: y0 },
        ];
        let polygons = assemble_polygons(vec![
            (true, square(0.0, 0.0, 10.0)),
            (false, square(2.0, 2.0, 2.0)),
            (true, square(20.0, 0.0, 5.0)),
        ]);

        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert!((polygons[0].unsigned_area() - 96.0).abs() < 1e-9);
        assert!(polygons[1].interiors().is_empty());
    }

    #[test]
    fn test_field_value_mapping() {
        assert_eq!(field_value(&FieldValue::Character(Some("Bamfield  ".to_string()))),
                   AttributeValue::Text("Bamfield".to_string()));
        assert_eq!(field_value(&FieldValue::Numeric(Some(4.5))), AttributeValue::Number(4.5));
        assert_eq!(field_value(&FieldValue::Numeric(None)), AttributeValue::Null);
        assert_eq!(field_value(&FieldValue::Logical(Some(true))), AttributeValue::Logical(true));
        assert_eq!(field_value(&FieldValue::Date(None)), AttributeValue::Null);
    }

    #[test]
    fn test_date_fields_read_as_dates() {
        use shapefile::dbase::{Date, DateTime, Time};

        assert_eq!(field_value(&FieldValue::Date(Some(Date::new(14, 6, 2019)))),
                   AttributeValue::Date { year: 2019, month: 6, day: 14 });
        let stamp = DateTime::new(Date::new(14, 6, 2019), Time::new(9, 5, 30));
        assert_eq!(field_value(&FieldValue::DateTime(stamp)),
                   AttributeValue::Text("2019-06-14T09:05:30".to_string()));
    }
}
