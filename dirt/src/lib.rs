//! Dirt: per-pixel fragment lists ("A-buffer") with sorting, layer
//! resolving and screen-space ray marching.
//!
//! This crate drives the per-pixel code of [`dirt_gpu`] over a whole screen:
//! it owns the fragment buffers, runs passes on scoped worker threads and
//! turns the results into images.

mod buffers;
mod config;
mod error;
mod pipeline;
mod sorted_layers;
mod utils;

pub use dirt_gpu as gpu;

pub use self::buffers::*;
pub use self::config::*;
pub use self::error::*;
pub use self::pipeline::*;
pub use self::sorted_layers::*;
pub use self::utils::*;
