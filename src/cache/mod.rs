//! On-disk cache of cropped coastline layers
//!
//! Each entry is a shapefile bundle plus a TOML manifest holding the key
//! that produced it. An entry is only reused when its manifest matches the
//! requested key exactly and the whole bundle is present.

use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::coordinate::Extent;
use crate::errors::{MapError, MapResult};
use crate::io::{ShapefileReader, ShapefileWriter, REQUIRED_SIDECARS};
use crate::layer::VectorLayer;

/// Everything that determines a crop result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropCacheKey {
    /// Source shapefile path as configured
    pub source: String,
    pub geographic_crs: u32,
    pub projected_crs: u32,
    pub extent: Extent,
}

impl CropCacheKey {
    pub fn new<P: AsRef<Path>>(source: P, geographic_crs: u32, projected_crs: u32, extent: Extent) -> Self {
        CropCacheKey {
            source: source.as_ref().display().to_string(),
            geographic_crs,
            projected_crs,
            extent,
        }
    }

    fn to_manifest(&self) -> MapResult<String> {
        toml::to_string(self).map_err(|e| MapError::GenericError(format!("Cannot serialise cache key: {}", e)))
    }

    /// File stem for this key's entry, spelled out from the key fields
    ///
    /// Sources sharing a file name share a stem; the manifest check tells
    /// them apart.
    fn entry_stem(&self) -> String {
        let source_stem = Path::new(&self.source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "layer".to_string());

        format!("{}_{}_{}_n{}_s{}_e{}_w{}",
                source_stem, self.geographic_crs, self.projected_crs,
                bound_token(self.extent.north), bound_token(self.extent.south),
                bound_token(self.extent.east), bound_token(self.extent.west))
    }
}

/// Directory of cached crop results
pub struct CropCache {
    directory: PathBuf,
}

impl CropCache {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        CropCache { directory: directory.as_ref().to_path_buf() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn shapefile_path(&self, key: &CropCacheKey) -> PathBuf {
        self.directory.join(format!("{}.shp", key.entry_stem()))
    }

    fn manifest_path(&self, key: &CropCacheKey) -> PathBuf {
        self.directory.join(format!("{}.toml", key.entry_stem()))
    }

    /// Cached layer for `key`, or `None` on a miss
    pub fn load(&self, key: &CropCacheKey) -> MapResult<Option<VectorLayer>> {
        let manifest_path = self.manifest_path(key);
        let shapefile_path = self.shapefile_path(key);

        let manifest = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(_) => {
                debug!("Crop cache miss: no manifest at {}", manifest_path.display());
                return Ok(None);
            },
        };

        let stored: CropCacheKey = match toml::from_str(&manifest) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring unreadable cache manifest {}: {}", manifest_path.display(), e);
                return Ok(None);
            },
        };
        if &stored != key {
            debug!("Crop cache miss: manifest {} is for a different request", manifest_path.display());
            return Ok(None);
        }

        if REQUIRED_SIDECARS.iter().any(|ext| !shapefile_path.with_extension(ext).is_file()) {
            warn!("Crop cache entry {} is incomplete; recomputing", shapefile_path.display());
            return Ok(None);
        }

        let layer = ShapefileReader::new(&shapefile_path).read()?;
        if layer.crs().epsg_code() != key.projected_crs {
            warn!("Crop cache entry {} has CRS {}; recomputing", shapefile_path.display(), layer.crs());
            return Ok(None);
        }

        info!("Crop cache hit: {}", shapefile_path.display());
        Ok(Some(layer))
    }

    /// Write `layer` under `key`; the manifest is written last
    pub fn store(&self, key: &CropCacheKey, layer: &VectorLayer) -> MapResult<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let shapefile_path = self.shapefile_path(key);
        let manifest_path = self.manifest_path(key);

        // A stale manifest must never describe a half-written bundle
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }

        ShapefileWriter::new(&shapefile_path).write(layer)?;
        fs::write(&manifest_path, key.to_manifest()?)?;

        info!("Stored cropped layer in cache at {}", shapefile_path.display());
        Ok(shapefile_path)
    }
}

/// Extent bound as a file-name-safe token: `-125.26` becomes `m125p260000`
fn bound_token(value: f64) -> String {
    format!("{:.6}", value).replace('-', "m").replace('.', "p")
}
