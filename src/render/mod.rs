//! Map rendering
//!
//! A `MapScene` gathers the layers and style; a `MapRenderer` chosen by
//! output extension turns it into a PNG or SVG file.

mod factory;
mod png;
mod renderer;
mod scene;
mod style;
mod svg;
mod viewport;

pub use factory::RendererFactory;
pub use png::PngRenderer;
pub use renderer::MapRenderer;
pub use scene::{MapScene, NorthArrowLayout, ScaleBarLayout};
pub use style::{Corner, DistanceUnit, MarkerShape, NorthArrowStyle, RenderStyle, RgbColor, ScaleBarStyle, StyleColors};
pub use svg::SvgRenderer;
pub use viewport::Viewport;
