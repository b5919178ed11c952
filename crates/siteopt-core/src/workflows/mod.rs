//! # Workflows Module
//!
//! End-to-end pipelines and the only place where coordinates cross between the public
//! CRS callers speak and the working CRS the engine computes in.
//!
//! - **Site selection** ([`select`]) - Proposes new facility sites from a population
//!   raster, existing facilities and an optional region.
//! - **Candidate ranking** ([`rank`]) - Scores caller-supplied candidate sites by the
//!   population they reach and keeps the best separated subset.
//!
//! Both return a [`SelectionResult`](crate::engine::state::SelectionResult) whose sites
//! are expressed in the public CRS and ordered best first.

mod boundary;
pub mod rank;
pub mod select;
