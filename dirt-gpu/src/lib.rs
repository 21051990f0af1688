//! Per-pixel structs and algorithms used by Dirt's passes: fragment stores,
//! sorters, the layer resolver and the screen-space ray marcher.
//!
//! Everything in here is written the way it'd run inside a single shader
//! invocation - there's no allocation, stores are fixed-size arrays living on
//! the stack and all failure modes are expressed as sentinel values.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]

mod camera;
mod depth;
mod fragment;
mod noise;
mod normal;
mod params;
mod resolve;
mod sort;
mod store;
mod trace;
mod trace_test;
mod utils;
mod viewport;

pub use self::camera::*;
pub use self::depth::*;
pub use self::fragment::*;
pub use self::noise::*;
pub use self::normal::*;
pub use self::params::*;
pub use self::resolve::*;
pub use self::sort::*;
pub use self::store::*;
pub use self::trace::*;
pub use self::trace_test::*;
pub use self::utils::*;
pub use self::viewport::*;

pub mod prelude {
    pub use glam::*;

    pub use crate::*;
}

/// Upper bound on the number of fragments a single pixel can hold; stores and
/// sort scratch-buffers are sized after this.
pub const MAX_LAYERS: usize = 64;

/// Tolerance used when clipping rays and comparing depths.
pub const DIRT_EPSILON: f32 = 0.0000001;
