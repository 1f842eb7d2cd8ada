//! Renderer trait definition

use std::path::Path;

use super::scene::MapScene;
use crate::errors::MapResult;

/// Strategy trait for the different output formats
pub trait MapRenderer: Send + Sync {
    /// Draw the scene and write it to `path`
    fn render(&self, scene: &MapScene, path: &Path) -> MapResult<()>;

    /// Get the name of this output format
    fn name(&self) -> &'static str;
}
