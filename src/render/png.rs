//! Raster output through the `image` crate
//!
//! PNG maps carry no text: polygons, outlines, markers, the north arrow
//! (with a stroked "N") and the scale bar are drawn, labels and the legend
//! are left to SVG output.

use std::path::Path;
use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, info};

use super::scene::{MapScene, NorthArrowLayout, ScaleBarLayout};
use super::style::{MarkerShape, RgbColor};
use super::MapRenderer;
use crate::errors::MapResult;

type PixelPoint = (f64, f64);

/// Draws scenes into RGBA images saved as PNG
pub struct PngRenderer;

impl PngRenderer {
    pub fn new() -> Self {
        PngRenderer
    }

    /// Draw a scene into an in-memory image
    pub fn draw(&self, scene: &MapScene) -> MapResult<RgbaImage> {
        let viewport = scene.viewport()?;
        let style = scene.style();
        let colors = scene.colors();
        let mut canvas = Canvas::new(viewport.width(), viewport.height(), RgbColor::WHITE);

        let (left, top, right, bottom) = viewport.frame_pixels();
        canvas.fill_rect(left, top, right, bottom, colors.water);

        let mut rings_drawn = 0usize;
        for feature in scene.coastline().features() {
            for polygon in &feature.geometry.0 {
                let rings: Vec<Vec<PixelPoint>> = std::iter::once(polygon.exterior())
                    .chain(polygon.interiors().iter())
                    .map(|ring| ring.coords().map(|c| viewport.to_pixel(*c)).collect())
                    .collect();
                canvas.fill_rings(&rings, colors.land);
                if style.outline_width > 0.0 {
                    for ring in &rings {
                        canvas.polyline(ring, style.outline_width, colors.outline);
                    }
                }
                rings_drawn += rings.len();
            }
        }
        debug!("Filled {} rings", rings_drawn);

        let frame = [(left, top), (right, top), (right, bottom), (left, bottom), (left, top)];
        canvas.polyline(&frame, 1.0, colors.outline);

        for site in scene.sites().features() {
            let (x, y) = viewport.to_pixel(site.geometry.0);
            canvas.marker(style.marker, x, y, style.marker_size, scene.marker_color(site), RgbColor::BLACK);
        }

        if let Some(arrow) = scene.north_arrow(&viewport) {
            canvas.north_arrow(&arrow, colors.outline);
        }
        if let Some(bar) = scene.scale_bar(&viewport) {
            canvas.scale_bar(&bar, colors.outline);
        }

        Ok(canvas.into_image())
    }
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRenderer for PngRenderer {
    fn name(&self) -> &'static str {
        "PNG"
    }

    fn render(&self, scene: &MapScene, path: &Path) -> MapResult<()> {
        let image = self.draw(scene)?;
        image.save_with_format(path, ImageFormat::Png)?;
        info!("Saved {}x{} PNG map to {}", image.width(), image.height(), path.display());
        Ok(())
    }
}

/// Pixel drawing primitives over an RGBA buffer
struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    fn new(width: u32, height: u32, background: RgbColor) -> Self {
        Canvas { image: RgbaImage::from_pixel(width, height, Rgba(background.to_rgba())) }
    }

    fn into_image(self) -> RgbaImage {
        self.image
    }

    fn put(&mut self, x: i64, y: i64, color: RgbColor) {
        if x >= 0 && y >= 0 && (x as u64) < self.image.width() as u64 && (y as u64) < self.image.height() as u64 {
            self.image.put_pixel(x as u32, y as u32, Rgba(color.to_rgba()));
        }
    }

    fn fill_rect(&mut self, left: f64, top: f64, right: f64, bottom: f64, color: RgbColor) {
        let ring = vec![(left, top), (right, top), (right, bottom), (left, bottom), (left, top)];
        self.fill_rings(&[ring], color);
    }

    /// Even-odd scanline fill; holes are simply further rings
    fn fill_rings(&mut self, rings: &[Vec<PixelPoint>], color: RgbColor) {
        let edges: Vec<(PixelPoint, PixelPoint)> = rings.iter()
            .flat_map(|ring| ring.windows(2).map(|w| (w[0], w[1])))
            .filter(|(a, b)| a.1 != b.1)
            .collect();
        if edges.is_empty() {
            return;
        }

        let min_y = edges.iter().map(|(a, b)| a.1.min(b.1)).fold(f64::INFINITY, f64::min);
        let max_y = edges.iter().map(|(a, b)| a.1.max(b.1)).fold(f64::NEG_INFINITY, f64::max);
        let first_row = (min_y.floor() as i64).max(0);
        let last_row = (max_y.ceil() as i64).min(self.image.height() as i64 - 1);

        let mut crossings = Vec::new();
        for row in first_row..=last_row {
            let yc = row as f64 + 0.5;
            crossings.clear();
            for &((x1, y1), (x2, y2)) in &edges {
                if (y1 <= yc) != (y2 <= yc) {
                    crossings.push(x1 + (yc - y1) * (x2 - x1) / (y2 - y1));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for pair in crossings.chunks_exact(2) {
                let start = (pair[0] - 0.5).ceil() as i64;
                let end = (pair[1] - 0.5).floor() as i64;
                for col in start.max(0)..=end.min(self.image.width() as i64 - 1) {
                    self.put(col, row, color);
                }
            }
        }
    }

    fn disc(&mut self, cx: f64, cy: f64, radius: f64, color: RgbColor) {
        let r2 = radius * radius;
        let (x0, x1) = ((cx - radius).floor() as i64, (cx + radius).ceil() as i64);
        let (y0, y1) = ((cy - radius).floor() as i64, (cy + radius).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn line(&mut self, a: PixelPoint, b: PixelPoint, width: f64, color: RgbColor) {
        let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = a.0 + (b.0 - a.0) * t;
            let y = a.1 + (b.1 - a.1) * t;
            if width <= 1.0 {
                self.put(x.floor() as i64, y.floor() as i64, color);
            } else {
                self.disc(x, y, width / 2.0, color);
            }
        }
    }

    fn polyline(&mut self, points: &[PixelPoint], width: f64, color: RgbColor) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], width, color);
        }
    }

    fn marker(&mut self, shape: MarkerShape, x: f64, y: f64, size: f64, fill: RgbColor, outline: RgbColor) {
        let half = size / 2.0;
        let ring = match shape {
            MarkerShape::Circle => {
                self.disc(x, y, half + 1.0, outline);
                self.disc(x, y, half, fill);
                return;
            },
            MarkerShape::Square => vec![
                (x - half, y - half), (x + half, y - half), (x + half, y + half), (x - half, y + half), (x - half, y - half),
            ],
            MarkerShape::Triangle => vec![
                (x, y - half), (x + half, y + half), (x - half, y + half), (x, y - half),
            ],
        };
        self.fill_rings(std::slice::from_ref(&ring), fill);
        self.polyline(&ring, 1.0, outline);
    }

    fn north_arrow(&mut self, arrow: &NorthArrowLayout, color: RgbColor) {
        let (cx, top, size) = (arrow.centre_x, arrow.top, arrow.size);
        let head = vec![
            (cx, top),
            (cx + size / 4.0, top + size * 0.6),
            (cx, top + size * 0.45),
            (cx - size / 4.0, top + size * 0.6),
            (cx, top),
        ];
        self.fill_rings(std::slice::from_ref(&head), color);

        // "N" under the head
        let w = size / 8.0;
        let (letter_top, letter_bottom) = (top + size * 0.7, top + size);
        let letter = [
            (cx - w, letter_bottom), (cx - w, letter_top), (cx + w, letter_bottom), (cx + w, letter_top),
        ];
        self.polyline(&letter, 2.0, color);
    }

    fn scale_bar(&mut self, bar: &ScaleBarLayout, color: RgbColor) {
        let height = 6.0;
        let top = bar.baseline - height;
        let middle = bar.left + bar.length / 2.0;
        let right = bar.left + bar.length;

        self.fill_rect(bar.left, top, middle, bar.baseline, color);
        self.fill_rect(middle, top, right, bar.baseline, RgbColor::WHITE);
        let outline = [(bar.left, top), (right, top), (right, bar.baseline), (bar.left, bar.baseline), (bar.left, top)];
        self.polyline(&outline, 1.0, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::layer::{AttributeRow, PointFeature, PointLayer, PolygonFeature, VectorLayer};
    use crate::render::RenderStyle;
    use geo::{coord, polygon, MultiPolygon, Point, Rect};

    fn scene_inputs() -> (VectorLayer, PointLayer, RenderStyle) {
        let island = polygon![
            (x: 0.0, y: 0.0), (x: 0.0, y: 500.0), (x: 500.0, y: 500.0), (x: 500.0, y: 0.0), (x: 0.0, y: 0.0),
        ];
        let coast = VectorLayer::new(
            CoordinateSystem::BcAlbers,
            Vec::new(),
            vec![PolygonFeature { geometry: MultiPolygon::new(vec![island]), attributes: AttributeRow::new() }],
        );
        let sites = PointLayer::new(
            Some(CoordinateSystem::BcAlbers),
            Vec::new(),
            vec![PointFeature { geometry: Point::new(750.0, 750.0), attributes: AttributeRow::new(), line: 2 }],
        );
        let style = RenderStyle { width: 120, height: 120, margin: 10, ..RenderStyle::default() };
        (coast, sites, style)
    }

    #[test]
    fn test_land_water_and_marker_pixels() {
        let (coast, sites, style) = scene_inputs();
        let frame = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1000.0, y: 1000.0 });
        let scene = MapScene::new(&coast, &sites, frame, &style).unwrap();
        let image = PngRenderer::new().draw(&scene).unwrap();
        let colors = style.colors().unwrap();

        assert_eq!(image.dimensions(), (120, 120));
        // Frame spans pixels 10..110; the island is the lower-left quarter
        assert_eq!(image.get_pixel(35, 85).0, colors.land.to_rgba());
        assert_eq!(image.get_pixel(85, 50).0, colors.water.to_rgba());
        assert_eq!(image.get_pixel(85, 35).0, colors.marker.to_rgba());
        assert_eq!(image.get_pixel(2, 2).0, RgbColor::WHITE.to_rgba());
    }

    #[test]
    fn test_render_writes_png() {
        let (coast, sites, style) = scene_inputs();
        let frame = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1000.0, y: 1000.0 });
        let scene = MapScene::new(&coast, &sites, frame, &style).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");

        PngRenderer::new().render(&scene, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
