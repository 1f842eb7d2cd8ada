//! Polygon shapefile writing
//!
//! Writes the full bundle, `.prj` included, so that anything written here
//! reads back through `ShapefileReader` unchanged.

use std::path::{Path, PathBuf};
use geo::orient::{Direction, Orient};
use geo::{LineString, Polygon};
use log::info;
use shapefile::dbase::{self, FieldName, FieldValue, TableWriterBuilder};
use shapefile::{Point, PolygonRing};

use super::prj::PrjParser;
use crate::errors::{MapError, MapResult};
use crate::layer::{AttributeValue, VectorLayer};

/// Widest character column a `.dbf` allows
const MAX_CHARACTER_WIDTH: usize = 254;
const NUMERIC_WIDTH: u8 = 19;
const NUMERIC_DECIMALS: u8 = 8;

/// Column type chosen from the values a layer actually holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Character(u8),
    Numeric,
    Logical,
    Date,
}

/// Writes `VectorLayer`s as polygon shapefiles
pub struct ShapefileWriter {
    path: PathBuf,
}

impl ShapefileWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ShapefileWriter { path: path.as_ref().with_extension("shp") }
    }

    /// Write geometry, index, attributes and projection
    pub fn write(&self, layer: &VectorLayer) -> MapResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let kinds: Vec<ColumnKind> = layer.fields().iter()
            .map(|name| column_kind(layer, name))
            .collect();

        let mut builder = TableWriterBuilder::new();
        for (name, kind) in layer.fields().iter().zip(&kinds) {
            let field_name = FieldName::try_from(name.as_str())
                .map_err(|_| MapError::GenericError(format!("Invalid attribute column name '{}' for a .dbf", name)))?;
            builder = match kind {
                ColumnKind::Character(width) => builder.add_character_field(field_name, *width),
                ColumnKind::Numeric => builder.add_numeric_field(field_name, NUMERIC_WIDTH, NUMERIC_DECIMALS),
                ColumnKind::Logical => builder.add_logical_field(field_name),
                ColumnKind::Date => builder.add_date_field(field_name),
            };
        }

        let mut shapes = Vec::with_capacity(layer.len());
        for feature in layer.features() {
            let mut rings = Vec::new();
            for polygon in &feature.geometry.0 {
                rings.extend(polygon_rings(polygon));
            }
            if rings.is_empty() {
                continue;
            }

            let mut record = dbase::Record::default();
            for (name, kind) in layer.fields().iter().zip(&kinds) {
                let value = feature.attributes.get(name).unwrap_or(&AttributeValue::Null);
                record.insert(name.clone(), to_field_value(value, *kind));
            }
            shapes.push((shapefile::Polygon::with_rings(rings), record));
        }

        let writer = shapefile::Writer::from_path(&self.path, builder)
            .map_err(|e| MapError::GenericError(format!("Cannot create {}: {}", self.path.display(), e)))?;
        writer.write_shapes_and_records(shapes.iter().map(|(shape, record)| (shape, record)))
            .map_err(|e| MapError::GenericError(format!("Failed writing {}: {}", self.path.display(), e)))?;

        PrjParser::write(&self.path.with_extension("prj"), &layer.crs())?;

        info!("Wrote {} features to {}", shapes.len(), self.path.display());
        Ok(())
    }
}

/// Write a layer as a shapefile bundle
pub fn write_shapefile<P: AsRef<Path>>(path: P, layer: &VectorLayer) -> MapResult<()> {
    ShapefileWriter::new(path).write(layer)
}

/// Shells clockwise, holes counter-clockwise
fn polygon_rings(polygon: &Polygon<f64>) -> Vec<PolygonRing<Point>> {
    let polygon = polygon.orient(Direction::Reversed);
    let to_points = |ring: &LineString<f64>| -> Vec<Point> {
        ring.coords().map(|c| Point::new(c.x, c.y)).collect()
    };

    if polygon.exterior().0.len() < 4 {
        return Vec::new();
    }
    let mut rings = vec![PolygonRing::Outer(to_points(polygon.exterior()))];
    rings.extend(polygon.interiors().iter()
        .filter(|hole| hole.0.len() >= 4)
        .map(|hole| PolygonRing::Inner(to_points(hole))));
    rings
}

fn column_kind(layer: &VectorLayer, name: &str) -> ColumnKind {
    let values: Vec<&AttributeValue> = layer.features().iter()
        .filter_map(|f| f.attributes.get(name))
        .filter(|v| !v.is_null())
        .collect();

    if !values.is_empty() && values.iter().all(|v| matches!(v, AttributeValue::Number(_))) {
        return ColumnKind::Numeric;
    }
    if !values.is_empty() && values.iter().all(|v| matches!(v, AttributeValue::Logical(_))) {
        return ColumnKind::Logical;
    }
    if !values.is_empty() && values.iter().all(|v| matches!(v, AttributeValue::Date { .. })) {
        return ColumnKind::Date;
    }

    let width = values.iter()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(1)
        .clamp(1, MAX_CHARACTER_WIDTH);
    ColumnKind::Character(width as u8)
}

fn to_field_value(value: &AttributeValue, kind: ColumnKind) -> FieldValue {
    match (kind, value) {
        (ColumnKind::Numeric, AttributeValue::Number(n)) => FieldValue::Numeric(Some(*n)),
        (ColumnKind::Numeric, _) => FieldValue::Numeric(None),
        (ColumnKind::Logical, AttributeValue::Logical(b)) => FieldValue::Logical(Some(*b)),
        (ColumnKind::Logical, _) => FieldValue::Logical(None),
        (ColumnKind::Date, AttributeValue::Date { year, month, day }) if valid_date(*year, *month, *day) => {
            FieldValue::Date(Some(dbase::Date::new(*day, *month, *year)))
        },
        (ColumnKind::Date, _) => FieldValue::Date(None),
        (ColumnKind::Character(_), AttributeValue::Null) => FieldValue::Character(None),
        (ColumnKind::Character(width), other) => {
            FieldValue::Character(Some(truncate_bytes(&other.to_string(), width as usize).to_string()))
        },
    }
}

/// Values a `.dbf` date field can hold
fn valid_date(year: u32, month: u32, day: u32) -> bool {
    year <= 9999 && (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Longest prefix of `text` within `max_bytes`, cut on a char boundary
fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::io::ShapefileReader;
    use crate::layer::{AttributeRow, PolygonFeature};
    use geo::{polygon, Area, MultiPolygon};

    fn sample_layer() -> VectorLayer {
        let mut first = AttributeRow::new();
        first.push("NAME", AttributeValue::Text("Diana Island".to_string()));
        first.push("AREA_HA", AttributeValue::Number(12.5));
        let mut second = AttributeRow::new();
        second.push("NAME", AttributeValue::Null);
        second.push("AREA_HA", AttributeValue::Number(3.0));

        let island = polygon![
            (x: 1_000_000.0, y: 400_000.0), (x: 1_000_000.0, y: 401_000.0),
            (x: 1_001_000.0, y: 401_000.0), (x: 1_001_000.0, y: 400_000.0),
            (x: 1_000_000.0, y: 400_000.0),
        ];
        let islet = polygon![
            (x: 1_002_000.0, y: 400_000.0), (x: 1_002_000.0, y: 400_500.0),
            (x: 1_002_500.0, y: 400_500.0), (x: 1_002_500.0, y: 400_000.0),
            (x: 1_002_000.0, y: 400_000.0),
        ];

        VectorLayer::new(
            CoordinateSystem::BcAlbers,
            vec!["NAME".to_string(), "AREA_HA".to_string()],
            vec![
                PolygonFeature { geometry: MultiPolygon::new(vec![island]), attributes: first },
                PolygonFeature { geometry: MultiPolygon::new(vec![islet]), attributes: second },
            ],
        )
    }

    #[test]
    fn test_written_bundle_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("islands.shp");
        let layer = sample_layer();

        write_shapefile(&path, &layer).unwrap();
        for ext in ["shp", "shx", "dbf", "prj"] {
            assert!(path.with_extension(ext).is_file(), "missing .{}", ext);
        }

        let loaded = ShapefileReader::new(&path).read().unwrap();
        assert_eq!(loaded.crs(), CoordinateSystem::BcAlbers);
        assert_eq!(loaded.fields(), layer.fields());
        assert_eq!(loaded.len(), 2);
        assert!((loaded.total_area() - layer.total_area()).abs() < 1e-3);

        let first = &loaded.features()[0].attributes;
        assert_eq!(first.get("NAME"), Some(&AttributeValue::Text("Diana Island".to_string())));
        assert_eq!(first.get("AREA_HA"), Some(&AttributeValue::Number(12.5)));
        assert!(loaded.features()[1].attributes.get("NAME").unwrap().is_null());
        assert!((loaded.features()[1].geometry.unsigned_area() - 250_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_column_kinds() {
        let layer = sample_layer();
        assert_eq!(column_kind(&layer, "NAME"), ColumnKind::Character(12));
        assert_eq!(column_kind(&layer, "AREA_HA"), ColumnKind::Numeric);
    }

    #[test]
    fn test_date_column_reads_back_as_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surveys.shp");
        let mut layer = sample_layer();
        let mut surveyed = vec![
            AttributeValue::Date { year: 2019, month: 6, day: 14 },
            AttributeValue::Null,
        ].into_iter();
        layer = VectorLayer::new(
            layer.crs(),
            vec!["NAME".to_string(), "AREA_HA".to_string(), "SURVEYED".to_string()],
            layer.features().iter().cloned().map(|mut f| {
                f.attributes.push("SURVEYED", surveyed.next().unwrap());
                f
            }).collect(),
        );
        assert_eq!(column_kind(&layer, "SURVEYED"), ColumnKind::Date);

        write_shapefile(&path, &layer).unwrap();
        let loaded = ShapefileReader::new(&path).read().unwrap();
        assert_eq!(loaded.features()[0].attributes.get("SURVEYED"),
                   Some(&AttributeValue::Date { year: 2019, month: 6, day: 14 }));
        assert!(loaded.features()[1].attributes.get("SURVEYED").unwrap().is_null());
    }

    #[test]
    fn test_character_values_fit_field_width_in_bytes() {
        let long = "é".repeat(200);
        assert_eq!(long.len(), 400);
        let FieldValue::Character(Some(text)) = to_field_value(&AttributeValue::Text(long), ColumnKind::Character(254)) else {
            panic!("expected a character value");
        };
        assert_eq!(text.len(), 254);
        assert_eq!(text.chars().count(), 127);
    }
}
