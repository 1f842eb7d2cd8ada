//! Custom error types for the map pipeline
//!
//! Every error is fatal to the run. The variants follow the stage that
//! raised them so the CLI can report what went wrong and where.

use std::fmt;
use std::io;

/// Map pipeline error types
#[derive(Debug)]
pub enum MapError {
    /// I/O error
    IoError(io::Error),
    /// Invalid configuration (bad extent, unknown CRS code, bad style value)
    ConfigError(String),
    /// Missing or malformed input (shapefile parts, CSV, network source)
    LoadError(String),
    /// Reprojection or CRS mismatch problem
    TransformError(String),
    /// Invalid coordinate data in an input row
    DataQualityError {
        /// 1-based line number in the source file
        line: u64,
        /// What was wrong with the row
        reason: String,
    },
    /// Failure while drawing or saving the map
    RenderError(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::IoError(e) => write!(f, "I/O error: {}", e),
            MapError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            MapError::LoadError(msg) => write!(f, "Load error: {}", msg),
            MapError::TransformError(msg) => write!(f, "Transformation error: {}", msg),
            MapError::DataQualityError { line, reason } => {
                write!(f, "Data quality error on line {}: {}", line, reason)
            }
            MapError::RenderError(msg) => write!(f, "Render error: {}", msg),
            MapError::GenericError(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MapError {
    fn from(error: io::Error) -> Self {
        MapError::IoError(error)
    }
}

impl From<String> for MapError {
    fn from(msg: String) -> Self {
        MapError::GenericError(msg)
    }
}

impl From<csv::Error> for MapError {
    fn from(error: csv::Error) -> Self {
        MapError::LoadError(format!("CSV error: {}", error))
    }
}

impl From<shapefile::Error> for MapError {
    fn from(error: shapefile::Error) -> Self {
        MapError::LoadError(format!("Shapefile error: {}", error))
    }
}

impl From<toml::de::Error> for MapError {
    fn from(error: toml::de::Error) -> Self {
        MapError::ConfigError(format!("Invalid TOML: {}", error))
    }
}

impl From<image::ImageError> for MapError {
    fn from(error: image::ImageError) -> Self {
        MapError::RenderError(format!("Image error: {}", error))
    }
}

/// Result type for map operations
pub type MapResult<T> = Result<T, MapError>;
