pub mod errors;
pub mod coordinate;
pub mod layer;
pub mod io;
pub mod cache;
pub mod config;
pub mod render;
pub mod pipeline;
pub mod utils;
pub mod commands;
pub mod api;

pub use crate::api::MapKit;

pub use config::MapConfig;
pub use coordinate::{BoundingRegion, CoordinateSystem, CoordinateSystemFactory, CoordinateTransformer, Extent};
pub use errors::{MapError, MapResult};
pub use layer::{PointLayer, VectorLayer};
pub use pipeline::MapSummary;
