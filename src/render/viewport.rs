use geo::{Coord, Rect};

use crate::errors::{MapError, MapResult};

/// Maps projected coordinates to image pixels
///
/// One uniform scale for both axes, north up, with the frame centred in the
/// space left inside the margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    frame: Rect<f64>,
    width: u32,
    height: u32,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    pub fn new(frame: Rect<f64>, width: u32, height: u32, margin: u32) -> MapResult<Self> {
        let usable_w = width as f64 - 2.0 * margin as f64;
        let usable_h = height as f64 - 2.0 * margin as f64;
        if usable_w <= 0.0 || usable_h <= 0.0 {
            return Err(MapError::RenderError(format!("No drawable area in a {}x{} image", width, height)));
        }
        if frame.width() <= 0.0 || frame.height() <= 0.0 {
            return Err(MapError::RenderError("Map frame has zero extent".to_string()));
        }

        let scale = (usable_w / frame.width()).min(usable_h / frame.height());
        let offset_x = margin as f64 + (usable_w - frame.width() * scale) / 2.0;
        let offset_y = margin as f64 + (usable_h - frame.height() * scale) / 2.0;

        Ok(Viewport { frame, width, height, scale, offset_x, offset_y })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per map unit
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn frame(&self) -> Rect<f64> {
        self.frame
    }

    /// Pixel position of a map coordinate
    pub fn to_pixel(&self, coord: Coord<f64>) -> (f64, f64) {
        let px = self.offset_x + (coord.x - self.frame.min().x) * self.scale;
        let py = self.offset_y + (self.frame.max().y - coord.y) * self.scale;
        (px, py)
    }

    /// Pixel rectangle `(left, top, right, bottom)` covered by the frame
    pub fn frame_pixels(&self) -> (f64, f64, f64, f64) {
        let (left, top) = self.to_pixel(Coord { x: self.frame.min().x, y: self.frame.max().y });
        let (right, bottom) = self.to_pixel(Coord { x: self.frame.max().x, y: self.frame.min().y });
        (left, top, right, bottom)
    }
}
