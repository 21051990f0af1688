mod array_buffer;
mod linked_buffer;

use glam::UVec2;

pub use self::array_buffer::*;
pub use self::linked_buffer::*;
use crate::gpu::{Fragment, FragmentStore, MAX_LAYERS};
use crate::{Config, StorageKind};

/// Per-pixel store big enough for any configured capacity.
pub type PixelStore = FragmentStore<Fragment, MAX_LAYERS>;

/// Screen-sized collection of fragment lists, filled concurrently by the
/// geometry pass.
///
/// Appends go through `&self` and are safe to call from many threads at
/// once; reading the lists back (through [`Self::gather()`]) is meant to
/// happen after all appends of the frame are done.
pub trait FragmentBuffer: Send + Sync {
    fn size(&self) -> UVec2;

    /// Records a fragment at given pixel; returns whether it got stored.
    ///
    /// Fragments outside the screen and fragments with NaN depth are
    /// rejected.
    fn append(&self, pixel: UVec2, depth: f32, payload: u32) -> bool;

    /// Copies fragments of given pixel into `store`, in no particular order.
    fn gather(&self, pixel: UVec2, store: &mut PixelStore);

    /// Forgets all fragments, readying the buffer for the next frame.
    fn begin_frame(&mut self);

    /// Number of fragments stored at the moment.
    fn len(&self) -> usize;

    /// Number of fragments rejected or evicted since the last
    /// [`Self::begin_frame()`].
    fn dropped(&self) -> u32;
}

/// Creates a buffer matching given configuration.
pub fn create_buffer(config: &Config) -> Box<dyn FragmentBuffer> {
    match config.storage {
        StorageKind::Array => Box::new(ArrayBuffer::new(config)),
        StorageKind::Linked => Box::new(LinkedBuffer::new(config)),
    }
}

fn pixel_idx(size: UVec2, pixel: UVec2) -> Option<usize> {
    if pixel.x < size.x && pixel.y < size.y {
        Some((pixel.y as usize) * (size.x as usize) + (pixel.x as usize))
    } else {
        None
    }
}
