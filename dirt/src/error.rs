use glam::UVec2;

use crate::gpu::MAX_LAYERS;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Screen size must be non-zero, got {size}")]
    EmptyScreen { size: UVec2 },

    #[error(
        "Camera was created for screen {camera}, but the pipeline expects \
         {config}"
    )]
    CameraMismatch { config: UVec2, camera: UVec2 },

    #[error("Capacity must be within 1..={}, got {capacity}", MAX_LAYERS)]
    InvalidCapacity { capacity: usize },

    #[error(
        "Pool of {pool_size} fragments cannot hold even one fragment per \
         pixel ({pixels} pixels)"
    )]
    PoolTooSmall { pool_size: usize, pixels: usize },

    #[error(
        "Ray marcher needs at least {required} steps to cross the screen, \
         got {max_steps}"
    )]
    TooFewSteps { max_steps: u32, required: u32 },

    #[error("Thickness must be a non-negative number, got {thickness}")]
    InvalidThickness { thickness: f32 },

    #[error("Scene length must be a positive number, got {scene_length}")]
    InvalidSceneLength { scene_length: f32 },

    #[error("At least one worker thread is required")]
    NoThreads,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "Pass `{pass}` reads sorted layers, but the sort pass hasn't run yet"
    )]
    NotSorted { pass: &'static str },

    #[error("Couldn't create a {size} image out of {len} bytes")]
    ImageSize { size: UVec2, len: usize },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
