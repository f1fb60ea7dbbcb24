//! Errors that abort a frame.

use sanct_core::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("scene is dirty, call build() before rendering")]
    DirtyScene,

    #[error("pixel ({x}, {y}) is outside the active render area")]
    PixelOutOfRange { x: usize, y: usize },

    #[error("pixel ({x}, {y}) received no samples")]
    NoSamples { x: usize, y: usize },

    #[error("material {0} has no shading (void material)")]
    UnhandledMaterial(usize),

    #[error("hit references missing material {0}")]
    MissingMaterial(usize),

    #[error("visible triangles requested but hits were not recorded")]
    HitsNotRecorded,

    #[error("visible triangle id {id} out of range (max {max})")]
    TriangleIdOutOfRange { id: usize, max: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("render worker panicked")]
    WorkerPanic,

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),
}

pub type RenderResult<T> = Result<T, RenderError>;
