//! Layered configuration for the CLI.
//!
//! Precedence, highest first: explicit command-line flags, `-S key=value`
//! assignments, the TOML file given with `--config`, and [`defaults`].

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::{build_rank_config, build_select_config};
