//! # Engine Module
//!
//! The computational layer of site selection. Everything here works on a regular grid in
//! the projected working CRS, where Euclidean distances approximate ground distances.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Selection and ranking parameters with builders
//! - **Grid planning** ([`grid_plan`]) - Sizes the working grid under a cell budget
//! - **Sampling** ([`sampler`]) - Pulls raster values onto the working grid
//! - **Demand** ([`demand`]) - Subtracts blurred facility influence from population
//! - **Selection** ([`selection`]) - Peak suppression, weighted clustering and ranking
//! - **State** ([`state`]) - Results and the non-fatal warnings collected on the way
//! - **Progress** ([`progress`]) and **deadlines** ([`deadline`]) - Run supervision
//! - **Errors** ([`error`]) - The single error type surfaced by workflows

pub mod config;
pub mod deadline;
pub mod demand;
pub mod error;
pub mod grid_plan;
pub mod progress;
pub mod sampler;
pub mod selection;
pub mod state;
pub(crate) mod utils;
