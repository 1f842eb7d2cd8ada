//! Factory for creating map renderers

use std::path::Path;

use super::png::PngRenderer;
use super::renderer::MapRenderer;
use super::svg::SvgRenderer;
use crate::errors::{MapError, MapResult};

/// Factory for creating map renderers
pub struct RendererFactory;

impl RendererFactory {
    /// Create a renderer for the output file's extension
    pub fn for_path(path: &Path) -> MapResult<Box<dyn MapRenderer>> {
        let extension = path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self::get_renderer_by_name(&extension).map_err(|_| MapError::ConfigError(format!(
            "Unsupported map output '{}': use a .png or .svg file", path.display()
        )))
    }

    /// Get a renderer by format name
    pub fn get_renderer_by_name(name: &str) -> MapResult<Box<dyn MapRenderer>> {
        match name.to_lowercase().as_str() {
            "png" => Ok(Box::new(PngRenderer::new())),
            "svg" => Ok(Box::new(SvgRenderer::new())),
            _ => Err(MapError::ConfigError(format!("Unknown output format: {}", name)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_by_extension() {
        assert_eq!(RendererFactory::for_path(Path::new("out/map.png")).unwrap().name(), "PNG");
        assert_eq!(RendererFactory::for_path(Path::new("map.SVG")).unwrap().name(), "SVG");
        assert!(matches!(RendererFactory::for_path(Path::new("map.pdf")), Err(MapError::ConfigError(_))));
        assert!(RendererFactory::for_path(Path::new("map")).is_err());
    }
}
