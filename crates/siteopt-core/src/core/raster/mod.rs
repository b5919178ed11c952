//! Provides read access to population-density rasters.
//!
//! The engine only needs a pixel-value read contract, captured by the
//! [`RasterSource`](traits::RasterSource) trait. Two backends are supplied: an
//! in-memory array and a GeoTIFF reader that decodes strips or tiles on demand.
//! [`RasterBackend`](backend::RasterBackend) picks one from configuration.

pub mod backend;
pub mod geotiff;
pub mod memory;
pub mod traits;

pub use backend::RasterBackend;
pub use geotiff::GeoTiffRaster;
pub use memory::ArrayRaster;
pub use traits::{RasterError, RasterSource};
