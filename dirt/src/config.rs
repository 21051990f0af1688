use std::thread;

use glam::UVec2;

use crate::gpu::{
    self, DepthConvention, OverflowPolicy, SortAlgorithm, Sorter, MAX_LAYERS,
};
use crate::{ConfigError, Result};

/// How fragments are laid out in memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Fixed number of slots per pixel; see [`crate::ArrayBuffer`].
    #[default]
    Array,

    /// Per-pixel lists allocated out of one shared pool; see
    /// [`crate::LinkedBuffer`].
    Linked,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub size: UVec2,

    /// Maximum number of fragments kept per pixel.
    pub capacity: usize,

    pub convention: DepthConvention,
    pub overflow: OverflowPolicy,
    pub algorithm: SortAlgorithm,

    /// Lists up to this long get insertion-sorted by the hybrid sorter.
    pub threshold: usize,

    /// Step budget of the ray marcher; `None` derives it from the screen
    /// size, see [`Self::max_steps()`].
    pub max_steps: Option<u32>,

    /// How far behind a fragment (in view-space units) a ray still counts as
    /// hitting it.
    pub thickness: f32,

    /// Length of rays that don't cross the near or far plane.
    pub scene_length: f32,

    /// Whether the sort pass drops fragments sharing the same depth.
    pub dedup: bool,

    pub storage: StorageKind,

    /// Number of nodes in the shared pool of [`StorageKind::Linked`];
    /// `None` sizes the pool to `size * capacity`.
    pub pool_size: Option<usize>,

    pub threads: usize,
}

impl Config {
    pub fn new(size: UVec2) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: UVec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_convention(mut self, convention: DepthConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SortAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_scene_length(mut self, scene_length: f32) -> Self {
        self.scene_length = scene_length;
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn pixels(&self) -> usize {
        (self.size.x as usize) * (self.size.y as usize)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size.unwrap_or(self.pixels() * self.capacity)
    }

    /// Returns the ray marcher's step budget.
    ///
    /// A ray clipped to the screen never walks more than
    /// `size.max_element()` pixels, so the derived budget can't cut a ray
    /// short.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
            .unwrap_or_else(|| self.size.max_element().saturating_mul(2))
    }

    pub fn sorter(&self) -> Sorter {
        Sorter::new(self.algorithm, self.threshold, self.convention)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size.x == 0 || self.size.y == 0 {
            return Err(ConfigError::EmptyScreen { size: self.size });
        }

        if self.capacity == 0 || self.capacity > MAX_LAYERS {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            });
        }

        if let StorageKind::Linked = self.storage {
            if self.pool_size() < self.pixels() {
                return Err(ConfigError::PoolTooSmall {
                    pool_size: self.pool_size(),
                    pixels: self.pixels(),
                });
            }
        }

        if self.max_steps() < self.size.max_element() {
            return Err(ConfigError::TooFewSteps {
                max_steps: self.max_steps(),
                required: self.size.max_element(),
            });
        }

        if self.thickness.is_nan() || self.thickness < 0.0 {
            return Err(ConfigError::InvalidThickness {
                thickness: self.thickness,
            });
        }

        if self.scene_length.is_nan() || self.scene_length <= 0.0 {
            return Err(ConfigError::InvalidSceneLength {
                scene_length: self.scene_length,
            });
        }

        if self.threads == 0 {
            return Err(ConfigError::NoThreads);
        }

        Ok(())
    }

    /// Returns parameters for the per-pixel passes.
    pub fn params(&self, camera: &gpu::Camera) -> gpu::BufferParams {
        gpu::BufferParams {
            capacity: self.capacity as u32,
            convention: self.convention.encode(),
            overflow: self.overflow.encode(),
            algorithm: self.algorithm.encode(),
            threshold: self.threshold as u32,
            max_steps: self.max_steps(),
            screen_size: self.size,
            thickness: self.thickness,
            scene_length: self.scene_length,
            near_far: glam::vec2(camera.near(), camera.far()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: UVec2::new(512, 512),
            capacity: 16,
            convention: Default::default(),
            overflow: Default::default(),
            algorithm: Default::default(),
            threshold: Sorter::DEFAULT_THRESHOLD,
            max_steps: None,
            thickness: 0.1,
            scene_length: 100.0,
            dedup: false,
            storage: Default::default(),
            pool_size: None,
            threads: thread::available_parallelism()
                .map_or(1, |threads| threads.get()),
        }
    }
}
