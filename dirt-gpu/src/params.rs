use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};

use crate::{
    DepthConvention, OverflowPolicy, SortAlgorithm, Sorter, Viewport,
};

/// Configuration shared by all per-pixel passes, laid out so that it can be
/// uploaded as-is.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BufferParams {
    pub capacity: u32,
    pub convention: u32,
    pub overflow: u32,
    pub algorithm: u32,
    pub threshold: u32,
    pub max_steps: u32,
    pub screen_size: UVec2,
    pub thickness: f32,
    pub scene_length: f32,
    pub near_far: Vec2,
}

impl BufferParams {
    pub fn convention(&self) -> DepthConvention {
        DepthConvention::decode(self.convention)
    }

    pub fn overflow(&self) -> OverflowPolicy {
        OverflowPolicy::decode(self.overflow)
    }

    pub fn algorithm(&self) -> SortAlgorithm {
        SortAlgorithm::decode(self.algorithm)
    }

    pub fn sorter(&self) -> Sorter {
        Sorter::new(
            self.algorithm(),
            self.threshold as usize,
            self.convention(),
        )
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_size(self.screen_size)
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }
}
