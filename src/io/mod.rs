//! Reading and writing map inputs
//!
//! Shapefile bundles (with their `.prj` projection files) and CSV site
//! tables, local or remote.

mod csv_source;
mod prj;
mod shapefile_reader;
mod shapefile_writer;

pub use self::csv_source::{parse_table, SiteSource};
pub use self::prj::PrjParser;
pub use self::shapefile_reader::{read_shapefile, ShapefileReader, REQUIRED_SIDECARS};
pub use self::shapefile_writer::{write_shapefile, ShapefileWriter};
