//! Everything a renderer needs to draw one map

use geo::Rect;
use log::{debug, warn};

use super::style::{Corner, RenderStyle, RgbColor, StyleColors};
use super::viewport::Viewport;
use crate::errors::{MapError, MapResult};
use crate::layer::{PointFeature, PointLayer, VectorLayer};

/// Gap between the frame edge and a decoration, in pixels
const DECORATION_PADDING: f64 = 12.0;

/// Coastline, sites and style, checked to share one coordinate system
pub struct MapScene<'a> {
    coastline: &'a VectorLayer,
    sites: &'a PointLayer,
    frame: Rect<f64>,
    style: &'a RenderStyle,
    colors: StyleColors,
    label_column: Option<String>,
    category_column: Option<String>,
    categories: Vec<String>,
}

/// Pixel placement of the scale bar
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBarLayout {
    pub left: f64,
    pub baseline: f64,
    pub length: f64,
    pub label: String,
}

/// Pixel placement of the north arrow; `centre_x` is the shaft
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NorthArrowLayout {
    pub centre_x: f64,
    pub top: f64,
    pub size: f64,
}

impl<'a> MapScene<'a> {
    /// Build a scene; the site layer must already be in the coastline's system
    ///
    /// # Arguments
    ///
    /// * `coastline` - Cropped polygon layer
    /// * `sites` - Point layer
    /// * `frame` - Map area in layer units, normally the crop envelope
    /// * `style` - Cosmetic parameters
    pub fn new(coastline: &'a VectorLayer, sites: &'a PointLayer, frame: Rect<f64>, style: &'a RenderStyle) -> MapResult<Self> {
        match sites.crs() {
            Some(crs) if crs == coastline.crs() => {},
            Some(crs) => {
                return Err(MapError::TransformError(format!(
                    "Cannot draw sites in {} over a coastline in {}", crs, coastline.crs()
                )));
            },
            None => {
                return Err(MapError::TransformError(
                    "Site layer has no coordinate system; assign and reproject it before rendering".to_string()
                ));
            },
        }

        Ok(MapScene {
            coastline,
            sites,
            frame,
            style,
            colors: style.colors()?,
            label_column: None,
            category_column: None,
            categories: Vec::new(),
        })
    }

    /// Label each site with the value of `column`
    pub fn with_labels(mut self, column: Option<&str>) -> MapResult<Self> {
        if let Some(column) = column {
            self.require_column(column)?;
            self.label_column = Some(column.to_string());
        }
        Ok(self)
    }

    /// Colour each site by the value of `column`
    pub fn with_categories(mut self, column: Option<&str>) -> MapResult<Self> {
        if let Some(column) = column {
            self.require_column(column)?;
            self.categories = self.sites.categories(column);
            debug!("{} categories in column '{}'", self.categories.len(), column);
            if self.categories.len() > self.colors.palette.len() && !self.colors.palette.is_empty() {
                warn!("{} categories but only {} palette colours; colours will repeat",
                      self.categories.len(), self.colors.palette.len());
            }
            self.category_column = Some(column.to_string());
        }
        Ok(self)
    }

    fn require_column(&self, column: &str) -> MapResult<()> {
        if self.sites.fields().iter().any(|f| f == column) {
            Ok(())
        } else {
            Err(MapError::LoadError(format!(
                "Column '{}' not found; available columns: {}", column, self.sites.fields().join(", ")
            )))
        }
    }

    pub fn coastline(&self) -> &VectorLayer {
        self.coastline
    }

    pub fn sites(&self) -> &PointLayer {
        self.sites
    }

    pub fn style(&self) -> &RenderStyle {
        self.style
    }

    pub fn colors(&self) -> &StyleColors {
        &self.colors
    }

    pub fn frame(&self) -> Rect<f64> {
        self.frame
    }

    pub fn viewport(&self) -> MapResult<Viewport> {
        Viewport::new(self.frame, self.style.width, self.style.height, self.style.margin)
    }

    /// Marker colour of a site
    pub fn marker_color(&self, site: &PointFeature) -> RgbColor {
        let Some(column) = &self.category_column else {
            return self.colors.marker;
        };
        site.attributes.get(column)
            .filter(|v| !v.is_null())
            .and_then(|v| self.categories.iter().position(|c| *c == v.to_string()))
            .map(|index| self.colors.category(index))
            .unwrap_or(self.colors.marker)
    }

    /// Label text of a site, if labelling is on and the cell is not blank
    pub fn label(&self, site: &PointFeature) -> Option<String> {
        let column = self.label_column.as_ref()?;
        site.attributes.get(column)
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
    }

    /// Category names with their colours, in sorted order
    pub fn legend_entries(&self) -> Vec<(String, RgbColor)> {
        if !self.style.legend {
            return Vec::new();
        }
        self.categories.iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), self.colors.category(i)))
            .collect()
    }

    pub fn north_arrow(&self, viewport: &Viewport) -> Option<NorthArrowLayout> {
        let arrow = &self.style.north_arrow;
        if !arrow.enabled {
            return None;
        }
        let size = arrow.size as f64;
        let (x, y) = anchor(viewport, arrow.corner, size / 2.0, size);
        Some(NorthArrowLayout { centre_x: x + size / 4.0, top: y, size })
    }

    /// Scale bar placement; `None` when disabled, when the layer is not in
    /// metres or when the bar is wider than the frame
    pub fn scale_bar(&self, viewport: &Viewport) -> Option<ScaleBarLayout> {
        let bar = &self.style.scale_bar;
        if !bar.enabled {
            return None;
        }
        if self.coastline.crs().is_geographic() {
            warn!("Scale bar skipped: {} is not measured in metres", self.coastline.crs());
            return None;
        }

        let length = bar.length_metres() * viewport.scale();
        let (frame_left, _, frame_right, _) = viewport.frame_pixels();
        let room = frame_right - frame_left - 2.0 * DECORATION_PADDING;
        if length > room {
            warn!("Scale bar skipped: {} is {:.0} px, the frame has room for {:.0} px", bar.label(), length, room);
            return None;
        }
        let (left, top) = anchor(viewport, bar.corner, length, SCALE_BAR_HEIGHT);
        Some(ScaleBarLayout { left, baseline: top + SCALE_BAR_HEIGHT, length, label: bar.label() })
    }
}

/// Height of the scale bar block (bar plus tick room), in pixels
pub const SCALE_BAR_HEIGHT: f64 = 8.0;

/// Top-left pixel of a `width` x `height` box placed in a frame corner
fn anchor(viewport: &Viewport, corner: Corner, width: f64, height: f64) -> (f64, f64) {
    let (left, top, right, bottom) = viewport.frame_pixels();
    let x = match corner {
        Corner::TopLeft | Corner::BottomLeft => left + DECORATION_PADDING,
        Corner::TopRight | Corner::BottomRight => right - DECORATION_PADDING - width,
    };
    let y = match corner {
        Corner::TopLeft | Corner::TopRight => top + DECORATION_PADDING,
        Corner::BottomLeft | Corner::BottomRight => bottom - DECORATION_PADDING - height,
    };
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::layer::{AttributeRow, AttributeValue};
    use geo::{coord, Point};

    fn sites(crs: Option<CoordinateSystem>) -> PointLayer {
        let make = |name: &str, kind: &str, x: f64| {
            let mut attributes = AttributeRow::new();
            attributes.push("Site", AttributeValue::Text(name.to_string()));
            attributes.push("Type", AttributeValue::from_raw(kind));
            PointFeature { geometry: Point::new(x, 50.0), attributes, line: 2 }
        };
        PointLayer::new(
            crs,
            vec!["Site".to_string(), "Type".to_string()],
            vec![make("A", "kelp", 10.0), make("B", "eelgrass", 20.0), make("C", "", 30.0)],
        )
    }

    fn coastline() -> VectorLayer {
        VectorLayer::new(CoordinateSystem::BcAlbers, Vec::new(), Vec::new())
    }

    fn frame() -> Rect<f64> {
        Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10_000.0, y: 10_000.0 })
    }

    #[test]
    fn test_crs_mismatch_rejected() {
        let style = RenderStyle::default();
        let coast = coastline();
        let wrong = sites(Some(CoordinateSystem::Wgs84));
        assert!(matches!(MapScene::new(&coast, &wrong, frame(), &style), Err(MapError::TransformError(_))));

        let untagged = sites(None);
        assert!(MapScene::new(&coast, &untagged, frame(), &style).is_err());
    }

    #[test]
    fn test_category_colours_and_labels() {
        let style = RenderStyle::default();
        let coast = coastline();
        let points = sites(Some(CoordinateSystem::BcAlbers));
        let scene = MapScene::new(&coast, &points, frame(), &style).unwrap()
            .with_labels(Some("Site")).unwrap()
            .with_categories(Some("Type")).unwrap();

        let colors = style.colors().unwrap();
        let features = points.features();
        // Sorted categories: eelgrass, kelp
        assert_eq!(scene.marker_color(&features[0]), colors.palette[1]);
        assert_eq!(scene.marker_color(&features[1]), colors.palette[0]);
        assert_eq!(scene.marker_color(&features[2]), colors.marker);
        assert_eq!(scene.label(&features[0]).as_deref(), Some("A"));

        let legend: Vec<String> = scene.legend_entries().into_iter().map(|(c, _)| c).collect();
        assert_eq!(legend, vec!["eelgrass", "kelp"]);
    }

    #[test]
    fn test_unknown_label_column() {
        let style = RenderStyle::default();
        let coast = coastline();
        let points = sites(Some(CoordinateSystem::BcAlbers));
        let result = MapScene::new(&coast, &points, frame(), &style).unwrap().with_labels(Some("Name"));
        assert!(matches!(result, Err(MapError::LoadError(_))));
    }

    #[test]
    fn test_scale_bar_length_follows_viewport() {
        let style = RenderStyle::default();
        let coast = coastline();
        let points = sites(Some(CoordinateSystem::BcAlbers));
        let scene = MapScene::new(&coast, &points, frame(), &style).unwrap();
        let viewport = scene.viewport().unwrap();

        let bar = scene.scale_bar(&viewport).unwrap();
        // 2 km over a 10 km frame drawn 860 px high
        assert!((bar.length - 2000.0 * viewport.scale()).abs() < 1e-9);
        assert_eq!(bar.label, "2 km");
    }

    #[test]
    fn test_scale_bar_wider_than_frame_skipped() {
        let mut style = RenderStyle::default();
        style.scale_bar.distance = 1.0e9;
        let coast = coastline();
        let points = sites(Some(CoordinateSystem::BcAlbers));
        let scene = MapScene::new(&coast, &points, frame(), &style).unwrap();
        let viewport = scene.viewport().unwrap();
        assert!(scene.scale_bar(&viewport).is_none());
    }
}
