//! Point layer built from tabular site records

use geo::{Point, Rect};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::attributes::{AttributeRow, AttributeValue, RecordTable};
use crate::coordinate::{CoordinateSystem, CoordinateTransformer};
use crate::errors::{MapError, MapResult};
use crate::utils::progress::ProgressTracker;

/// What to do with a row whose coordinates cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRowPolicy {
    /// Skip the row, log it and record it in the build report
    #[default]
    Reject,
    /// Fail the whole batch on the first bad row
    Abort,
}

/// A point feature with its attribute row and source line
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub geometry: Point<f64>,
    pub attributes: AttributeRow,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

/// Outcome of building points from a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointBuildReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: Vec<RejectedRow>,
}

/// A collection of point features
///
/// Freshly built layers carry no coordinate system until `assign_crs`
/// declares which system the coordinates were recorded in.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    crs: Option<CoordinateSystem>,
    fields: Vec<String>,
    features: Vec<PointFeature>,
}

impl PointLayer {
    pub fn new(crs: Option<CoordinateSystem>, fields: Vec<String>, features: Vec<PointFeature>) -> Self {
        PointLayer { crs, fields, features }
    }

    pub fn crs(&self) -> Option<CoordinateSystem> {
        self.crs
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn features(&self) -> &[PointFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Declare the system the coordinates are already expressed in
    ///
    /// Only metadata changes; no coordinate is touched. A layer already
    /// tagged with a different system must be reprojected instead.
    pub fn assign_crs(self, crs: CoordinateSystem) -> MapResult<PointLayer> {
        match self.crs {
            Some(existing) if existing != crs => Err(MapError::TransformError(format!(
                "Point layer is already in {}; use reproject to move it to {}", existing, crs
            ))),
            _ => {
                debug!("Assigned {} to {} points", crs, self.features.len());
                Ok(PointLayer { crs: Some(crs), ..self })
            },
        }
    }

    /// Transform every point into `target`
    pub fn reproject(&self, target: CoordinateSystem) -> MapResult<PointLayer> {
        let source = self.crs.ok_or_else(|| MapError::TransformError(
            "Point layer has no coordinate system; assign one before reprojecting".to_string()
        ))?;

        info!("Reprojecting {} points from EPSG:{} to EPSG:{}",
              self.features.len(), source.epsg_code(), target.epsg_code());

        let transformer = CoordinateTransformer::new(source, target)?;
        let features = self.features.iter()
            .map(|f| Ok(PointFeature {
                geometry: transformer.transform_point(&f.geometry)?,
                attributes: f.attributes.clone(),
                line: f.line,
            }))
            .collect::<MapResult<Vec<_>>>()?;

        Ok(PointLayer { crs: Some(target), fields: self.fields.clone(), features })
    }

    /// Keep only points inside a rectangle in layer units
    pub fn retain_within(&self, rect: &Rect<f64>) -> PointLayer {
        let features: Vec<PointFeature> = self.features.iter()
            .filter(|f| {
                let p = f.geometry;
                p.x() >= rect.min().x && p.x() <= rect.max().x
                    && p.y() >= rect.min().y && p.y() <= rect.max().y
            })
            .cloned()
            .collect();

        if features.len() < self.features.len() {
            info!("Filtered {} points outside the region", self.features.len() - features.len());
        }
        PointLayer { crs: self.crs, fields: self.fields.clone(), features }
    }

    /// Sorted distinct non-empty values of a column
    pub fn categories(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self.features.iter()
            .filter_map(|f| f.attributes.get(column))
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        values.sort();
        values.dedup();
        values
    }
}

/// Builds points from named longitude/latitude columns
///
/// Columns are addressed by name, never by position. Each point is
/// `(x = longitude, y = latitude)`.
pub struct PointLayerBuilder {
    longitude_column: String,
    latitude_column: String,
    policy: InvalidRowPolicy,
}

impl PointLayerBuilder {
    pub fn new(longitude_column: &str, latitude_column: &str) -> Self {
        PointLayerBuilder {
            longitude_column: longitude_column.to_string(),
            latitude_column: latitude_column.to_string(),
            policy: InvalidRowPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: InvalidRowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build an untagged point layer, one point per valid row
    pub fn build(&self, table: &RecordTable) -> MapResult<(PointLayer, PointBuildReport)> {
        let lon_index = self.require_column(table, &self.longitude_column)?;
        let lat_index = self.require_column(table, &self.latitude_column)?;

        let mut report = PointBuildReport { total_rows: table.rows.len(), ..Default::default() };
        let mut features = Vec::with_capacity(table.rows.len());
        let progress = ProgressTracker::new(table.rows.len() as u64, "Building site points");

        for row in &table.rows {
            progress.increment(1);

            let coords = parse_coordinate(row.values.get(lon_index), "longitude", 180.0)
                .and_then(|lon| parse_coordinate(row.values.get(lat_index), "latitude", 90.0).map(|lat| (lon, lat)));

            let (lon, lat) = match coords {
                Ok(pair) => pair,
                Err(reason) => match self.policy {
                    InvalidRowPolicy::Abort => {
                        return Err(MapError::DataQualityError { line: row.line, reason });
                    },
                    InvalidRowPolicy::Reject => {
                        warn!("Rejecting row on line {}: {}", row.line, reason);
                        report.rejected.push(RejectedRow { line: row.line, reason });
                        continue;
                    },
                },
            };

            let attributes: AttributeRow = table.headers.iter()
                .enumerate()
                .map(|(i, name)| {
                    let raw = row.values.get(i).map(String::as_str).unwrap_or("");
                    (name.clone(), AttributeValue::from_raw(raw))
                })
                .collect();

            features.push(PointFeature { geometry: Point::new(lon, lat), attributes, line: row.line });
        }
        progress.finish();

        report.accepted = features.len();
        info!("Built {} points from {} rows ({} rejected)",
              report.accepted, report.total_rows, report.rejected.len());

        Ok((PointLayer::new(None, table.headers.clone(), features), report))
    }

    fn require_column(&self, table: &RecordTable, name: &str) -> MapResult<usize> {
        table.column_index(name).ok_or_else(|| MapError::LoadError(format!(
            "Column '{}' not found; available columns: {}", name, table.headers.join(", ")
        )))
    }
}

/// Parse one coordinate cell, returning a reason on failure
fn parse_coordinate(raw: Option<&String>, name: &str, limit: f64) -> Result<f64, String> {
    let raw = raw.map(|s| s.trim()).unwrap_or("");
    if raw.is_empty() {
        return Err(format!("missing {}", name));
    }
    let value = raw.parse::<f64>().map_err(|_| format!("non-numeric {} '{}'", name, raw))?;
    if !value.is_finite() {
        return Err(format!("non-finite {} '{}'", name, raw));
    }
    if value.abs() > limit {
        return Err(format!("{} {} outside [-{}, {}]", name, value, limit, limit));
    }
    Ok(value)
}
