//! # SITEOPT Core Library
//!
//! A library for choosing where new point facilities (waste bins, parking spots, charging
//! points, ...) should go, given a population-density raster and the facilities that already
//! exist.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`GeoPoint`, `Grid`, `Region`,
//!   `FacilitySite`), WKT text I/O, coordinate reprojection (`SpatialProjector`) and the
//!   `RasterSource` capability together with its backends.
//!
//! - **[`engine`]: The Logic Core.** Raster sampling into a working grid, demand-map
//!   construction, and the two site-selection strategies (greedy peak suppression and
//!   weighted clustering with distance repair). All math in this layer happens in a
//!   projected, equal-area coordinate system so that Euclidean distances are meaningful.
//!
//! - **[`workflows`]: The Public API.** End-to-end pipelines that translate at the CRS
//!   boundary: site selection and candidate ranking.

pub mod core;
pub mod engine;
pub mod workflows;
