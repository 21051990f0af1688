use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use glam::UVec2;
use log::debug;

use super::{pixel_idx, FragmentBuffer, PixelStore};
use crate::gpu::{DepthConvention, Fragment, LinkedFragment, OverflowPolicy};
use crate::Config;

/// Fragment buffer keeping a linked list per pixel, with all nodes allocated
/// out of a single, screen-wide pool.
///
/// Compared to [`crate::ArrayBuffer`], memory is shared between pixels: a
/// pixel can record more fragments than the per-pixel capacity (the capacity
/// is enforced later, when the list gets gathered) and the only hard limit is
/// the size of the pool.
///
/// Fragments past a pixel's capacity are reported by [`Self::dropped()`] as
/// soon as they get appended, since gathering is going to discard them (or
/// something farther, under [`OverflowPolicy::ReplaceMax`]) anyway.
#[derive(Debug)]
pub struct LinkedBuffer {
    size: UVec2,
    capacity: usize,
    overflow: OverflowPolicy,
    convention: DepthConvention,

    /// Index of the most recently appended node of each pixel.
    heads: Vec<AtomicU32>,

    /// Length of each pixel's list.
    lengths: Vec<AtomicU32>,

    nodes: Vec<Node>,

    /// Number of nodes handed out so far; can grow past `nodes.len()` when
    /// the pool runs out.
    allocated: AtomicU32,

    dropped: AtomicU32,
}

#[derive(Debug)]
struct Node {
    fragment: AtomicU64,
    next: AtomicU32,
}

impl LinkedBuffer {
    pub fn new(config: &Config) -> Self {
        let pixels = config.pixels();
        let pool_size = config.pool_size().min(u32::MAX as usize);

        debug!(
            "Allocating linked buffer; size={}, capacity={}, pool-size={}",
            config.size, config.capacity, pool_size
        );

        Self {
            size: config.size,
            capacity: config.capacity,
            overflow: config.overflow,
            convention: config.convention,
            heads: (0..pixels)
                .map(|_| AtomicU32::new(LinkedFragment::END))
                .collect(),
            lengths: (0..pixels).map(|_| AtomicU32::new(0)).collect(),
            nodes: (0..pool_size)
                .map(|_| Node {
                    fragment: AtomicU64::new(0),
                    next: AtomicU32::new(LinkedFragment::END),
                })
                .collect(),
            allocated: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pool_size(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, ptr: u32) -> Option<LinkedFragment> {
        let node = self.nodes.get(ptr as usize)?;

        Some(LinkedFragment::new(
            Fragment::unpack(node.fragment.load(Ordering::Acquire)),
            node.next.load(Ordering::Acquire),
        ))
    }
}

impl FragmentBuffer for LinkedBuffer {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn append(&self, pixel: UVec2, depth: f32, payload: u32) -> bool {
        let Some(idx) = pixel_idx(self.size, pixel) else {
            return false;
        };

        if depth.is_nan() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let ptr = self.allocated.fetch_add(1, Ordering::Relaxed);

        let Some(node) = self.nodes.get(ptr as usize) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        node.fragment
            .store(Fragment::new(depth, payload).pack(), Ordering::Release);

        let next = self.heads[idx].swap(ptr, Ordering::AcqRel);

        node.next.store(next, Ordering::Release);

        let length = self.lengths[idx].fetch_add(1, Ordering::Relaxed);

        if length as usize >= self.capacity {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        true
    }

    fn gather(&self, pixel: UVec2, store: &mut PixelStore) {
        store.clear();

        let Some(idx) = pixel_idx(self.size, pixel) else {
            return;
        };

        let mut ptr = self.heads[idx].load(Ordering::Acquire);

        // A list can't be longer than the pool; the bound protects us from
        // looping forever over a list that's being modified while we read it
        for _ in 0..self.nodes.len() {
            let Some(node) = self.node(ptr) else {
                break;
            };

            store.push(node.fragment, self.overflow, self.convention);

            if node.is_last() {
                break;
            }

            ptr = node.next;
        }
    }

    fn begin_frame(&mut self) {
        for head in &mut self.heads {
            *head.get_mut() = LinkedFragment::END;
        }

        for length in &mut self.lengths {
            *length.get_mut() = 0;
        }

        *self.allocated.get_mut() = 0;
        *self.dropped.get_mut() = 0;
    }

    fn len(&self) -> usize {
        (self.allocated.load(Ordering::Relaxed) as usize).min(self.nodes.len())
    }

    fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
