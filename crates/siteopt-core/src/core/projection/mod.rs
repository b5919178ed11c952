//! # Projection Module
//!
//! Conversion of points between the public geographic CRS and the projected working CRS.
//!
//! Degree-based coordinates distort ground distance non-uniformly with latitude, so every
//! grid, blur and distance computation of the engine happens in an equal-area projection
//! measured in meters. The [`SpatialProjector`] is an explicitly constructed value: there is
//! no process-wide backend registration.
//!
//! - [`registry`] - Supported CRS codes and their PROJ definitions
//! - [`mollweide`] - Closed-form spherical Mollweide used for the default working CRS
//! - [`projector`] - `SpatialProjector` and reusable `CoordTransformer`s

pub mod mollweide;
pub mod projector;
pub mod registry;

pub use projector::{CoordTransformer, ProjectionError, SpatialProjector};
