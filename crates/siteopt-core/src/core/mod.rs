//! # Core Module
//!
//! This module provides the fundamental building blocks of SITEOPT: the geographic data
//! model, text I/O for points and polygons, coordinate reprojection, and access to
//! population rasters.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Points, CRS codes, grids, regions and facility sites
//! - **Text I/O** ([`io`]) - Well-known text (WKT) readers and writers
//! - **Reprojection** ([`projection`]) - Conversion between geographic and projected CRS
//! - **Raster Access** ([`raster`]) - The `RasterSource` capability and its backends
//!
//! ## Coordinate Spaces
//!
//! Two coordinate systems coexist:
//!
//! - the **public** CRS (geographic degrees, EPSG:4326 by default) in which points enter and
//!   leave the system, and
//! - the **working** CRS (an equal-area projection in meters, ESRI:54009 World Mollweide by
//!   default) in which every grid, distance and clustering computation takes place.

pub mod io;
pub mod models;
pub mod projection;
pub mod raster;
