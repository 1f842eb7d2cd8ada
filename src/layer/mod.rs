//! Spatial layers
//!
//! Polygon and point layers, each tagged with a coordinate system, plus
//! the attribute rows that travel with every feature.

mod attributes;
mod points;
mod vector;

pub use self::attributes::{AttributeRow, AttributeValue, RecordTable, TableRow};
pub use self::points::{InvalidRowPolicy, PointBuildReport, PointFeature, PointLayer, PointLayerBuilder, RejectedRow};
pub use self::vector::{CropReport, PolygonFeature, VectorLayer};
