//! Data structures shared by every layer of the library.
//!
//! - [`point`] - `GeoPoint` and the `Crs` authority code
//! - [`grid`] - Dense 2-D grids, their geometry, and raster geotransforms
//! - [`region`] - Envelopes, polygons and the `PolygonTest` capability
//! - [`site`] - Facility sites and selection results

pub mod grid;
pub mod point;
pub mod region;
pub mod site;
