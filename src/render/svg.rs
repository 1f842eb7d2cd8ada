//! Vector output written with `quick-xml`

use std::fs;
use std::path::Path;
use log::info;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::scene::MapScene;
use super::style::{MarkerShape, RgbColor};
use super::viewport::Viewport;
use super::MapRenderer;
use crate::errors::{MapError, MapResult};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const FONT_FAMILY: &str = "sans-serif";

/// Draws scenes as SVG documents
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        SvgRenderer
    }

    /// Build the SVG document text for a scene
    pub fn to_svg_string(&self, scene: &MapScene) -> MapResult<String> {
        let viewport = scene.viewport()?;
        let style = scene.style();
        let colors = scene.colors();
        let mut doc = SvgDocument::new();

        doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        doc.start("svg", &[
            ("xmlns", SVG_NAMESPACE.to_string()),
            ("width", viewport.width().to_string()),
            ("height", viewport.height().to_string()),
            ("viewBox", format!("0 0 {} {}", viewport.width(), viewport.height())),
        ])?;
        doc.empty("rect", &[
            ("width", "100%".to_string()),
            ("height", "100%".to_string()),
            ("fill", RgbColor::WHITE.to_hex()),
        ])?;

        let (left, top, right, bottom) = viewport.frame_pixels();
        doc.empty("rect", &[
            ("x", fmt(left)), ("y", fmt(top)),
            ("width", fmt(right - left)), ("height", fmt(bottom - top)),
            ("fill", colors.water.to_hex()),
            ("stroke", colors.outline.to_hex()),
        ])?;

        doc.start("g", &[
            ("id", "coastline".to_string()),
            ("fill", colors.land.to_hex()),
            ("fill-rule", "evenodd".to_string()),
            ("stroke", colors.outline.to_hex()),
            ("stroke-width", fmt(style.outline_width)),
        ])?;
        for feature in scene.coastline().features() {
            let data = path_data(&feature.geometry, &viewport);
            if !data.is_empty() {
                doc.empty("path", &[("d", data)])?;
            }
        }
        doc.end("g")?;

        doc.start("g", &[("id", "sites".to_string()), ("stroke", RgbColor::BLACK.to_hex())])?;
        for site in scene.sites().features() {
            let (x, y) = viewport.to_pixel(site.geometry.0);
            let fill = scene.marker_color(site).to_hex();
            let half = style.marker_size / 2.0;
            match style.marker {
                MarkerShape::Circle => doc.empty("circle", &[
                    ("cx", fmt(x)), ("cy", fmt(y)), ("r", fmt(half)), ("fill", fill),
                ])?,
                MarkerShape::Square => doc.empty("rect", &[
                    ("x", fmt(x - half)), ("y", fmt(y - half)),
                    ("width", fmt(style.marker_size)), ("height", fmt(style.marker_size)),
                    ("fill", fill),
                ])?,
                MarkerShape::Triangle => doc.empty("polygon", &[
                    ("points", format!("{},{} {},{} {},{}",
                        fmt(x), fmt(y - half), fmt(x + half), fmt(y + half), fmt(x - half), fmt(y + half))),
                    ("fill", fill),
                ])?,
            }
        }
        doc.end("g")?;

        let labels: Vec<(f64, f64, String)> = scene.sites().features().iter()
            .filter_map(|site| scene.label(site).map(|text| {
                let (x, y) = viewport.to_pixel(site.geometry.0);
                (x + style.label_offset.0, y + style.label_offset.1, text)
            }))
            .collect();
        if !labels.is_empty() {
            doc.start("g", &[
                ("id", "labels".to_string()),
                ("font-family", FONT_FAMILY.to_string()),
                ("font-size", fmt(style.label_size)),
            ])?;
            for (x, y, text) in &labels {
                doc.text("text", &[("x", fmt(*x)), ("y", fmt(*y))], text)?;
            }
            doc.end("g")?;
        }

        self.write_legend(&mut doc, scene, right)?;
        self.write_decorations(&mut doc, scene, &viewport)?;

        if let Some(title) = &style.title {
            doc.text("text", &[
                ("x", fmt(viewport.width() as f64 / 2.0)),
                ("y", fmt(top - 4.0)),
                ("text-anchor", "middle".to_string()),
                ("font-family", FONT_FAMILY.to_string()),
                ("font-size", fmt(style.label_size * 1.5)),
            ], title)?;
        }

        doc.end("svg")?;
        doc.finish()
    }

    fn write_legend(&self, doc: &mut SvgDocument, scene: &MapScene, frame_right: f64) -> MapResult<()> {
        let entries = scene.legend_entries();
        if entries.is_empty() {
            return Ok(());
        }

        let style = scene.style();
        let row = style.label_size + 6.0;
        let swatch = style.label_size;
        let longest = entries.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0) as f64;
        let width = swatch + 12.0 + longest * style.label_size * 0.6;
        let x = frame_right - 12.0 - width;
        let y = scene.viewport()?.frame_pixels().1 + 12.0;

        doc.start("g", &[
            ("id", "legend".to_string()),
            ("font-family", FONT_FAMILY.to_string()),
            ("font-size", fmt(style.label_size)),
        ])?;
        doc.empty("rect", &[
            ("x", fmt(x - 6.0)), ("y", fmt(y - 6.0)),
            ("width", fmt(width + 12.0)), ("height", fmt(row * entries.len() as f64 + 6.0)),
            ("fill", RgbColor::WHITE.to_hex()), ("fill-opacity", "0.8".to_string()), ("stroke", RgbColor::BLACK.to_hex()),
        ])?;
        for (i, (name, color)) in entries.iter().enumerate() {
            let row_top = y + row * i as f64;
            doc.empty("rect", &[
                ("x", fmt(x)), ("y", fmt(row_top)),
                ("width", fmt(swatch)), ("height", fmt(swatch)),
                ("fill", color.to_hex()),
            ])?;
            doc.text("text", &[("x", fmt(x + swatch + 6.0)), ("y", fmt(row_top + swatch * 0.85))], name)?;
        }
        doc.end("g")
    }

    fn write_decorations(&self, doc: &mut SvgDocument, scene: &MapScene, viewport: &Viewport) -> MapResult<()> {
        let colors = scene.colors();
        let font_size = scene.style().label_size;

        if let Some(arrow) = scene.north_arrow(viewport) {
            let (cx, top, size) = (arrow.centre_x, arrow.top, arrow.size);
            doc.start("g", &[("id", "north-arrow".to_string()), ("fill", colors.outline.to_hex())])?;
            doc.empty("polygon", &[(
                "points",
                format!("{},{} {},{} {},{} {},{}",
                    fmt(cx), fmt(top),
                    fmt(cx + size / 4.0), fmt(top + size * 0.6),
                    fmt(cx), fmt(top + size * 0.45),
                    fmt(cx - size / 4.0), fmt(top + size * 0.6)),
            )])?;
            doc.text("text", &[
                ("x", fmt(cx)), ("y", fmt(top + size)),
                ("text-anchor", "middle".to_string()),
                ("font-family", FONT_FAMILY.to_string()),
                ("font-size", fmt(size * 0.35)),
                ("font-weight", "bold".to_string()),
            ], "N")?;
            doc.end("g")?;
        }

        if let Some(bar) = scene.scale_bar(viewport) {
            let height = 6.0;
            let half = bar.length / 2.0;
            let outline = colors.outline.to_hex();
            doc.start("g", &[("id", "scale-bar".to_string()), ("stroke", outline.clone())])?;
            doc.empty("rect", &[
                ("x", fmt(bar.left)), ("y", fmt(bar.baseline - height)),
                ("width", fmt(half)), ("height", fmt(height)), ("fill", outline.clone()),
            ])?;
            doc.empty("rect", &[
                ("x", fmt(bar.left + half)), ("y", fmt(bar.baseline - height)),
                ("width", fmt(half)), ("height", fmt(height)), ("fill", RgbColor::WHITE.to_hex()),
            ])?;
            doc.text("text", &[
                ("x", fmt(bar.left + bar.length)), ("y", fmt(bar.baseline - height - 3.0)),
                ("text-anchor", "end".to_string()),
                ("stroke", "none".to_string()),
                ("fill", outline),
                ("font-family", FONT_FAMILY.to_string()),
                ("font-size", fmt(font_size)),
            ], &bar.label)?;
            doc.end("g")?;
        }
        Ok(())
    }
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapRenderer for SvgRenderer {
    fn name(&self) -> &'static str {
        "SVG"
    }

    fn render(&self, scene: &MapScene, path: &Path) -> MapResult<()> {
        let svg = self.to_svg_string(scene)?;
        fs::write(path, &svg)?;
        info!("Saved SVG map ({} bytes) to {}", svg.len(), path.display());
        Ok(())
    }
}

/// Thin wrapper over the XML writer with render errors
struct SvgDocument {
    writer: Writer<Vec<u8>>,
}

impl SvgDocument {
    fn new() -> Self {
        SvgDocument { writer: Writer::new_with_indent(Vec::new(), b' ', 2) }
    }

    fn event(&mut self, event: Event) -> MapResult<()> {
        self.writer.write_event(event)
            .map_err(|e| MapError::RenderError(format!("SVG write failed: {}", e)))
    }

    fn element<'a>(name: &'a str, attributes: &'a [(&'a str, String)]) -> BytesStart<'a> {
        let mut element = BytesStart::new(name);
        for (key, value) in attributes {
            element.push_attribute((*key, value.as_str()));
        }
        element
    }

    fn start(&mut self, name: &str, attributes: &[(&str, String)]) -> MapResult<()> {
        self.event(Event::Start(Self::element(name, attributes)))
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, String)]) -> MapResult<()> {
        self.event(Event::Empty(Self::element(name, attributes)))
    }

    fn text(&mut self, name: &str, attributes: &[(&str, String)], text: &str) -> MapResult<()> {
        self.start(name, attributes)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn end(&mut self, name: &str) -> MapResult<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> MapResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| MapError::RenderError(format!("SVG output is not UTF-8: {}", e)))
    }
}

/// SVG path data for a multipolygon, one subpath per ring
fn path_data(geometry: &geo::MultiPolygon<f64>, viewport: &Viewport) -> String {
    let mut data = String::new();
    for polygon in &geometry.0 {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors().iter()) {
            let mut first = true;
            for coord in ring.coords() {
                let (x, y) = viewport.to_pixel(*coord);
                data.push_str(if first { "M" } else { "L" });
                data.push_str(&format!("{},{} ", fmt(x), fmt(y)));
                first = false;
            }
            if !first {
                data.push_str("Z ");
            }
        }
    }
    data.trim_end().to_string()
}

/// Two decimals, trailing zeros dropped
fn fmt(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}
