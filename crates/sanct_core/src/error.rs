//! Error type shared by scene construction and scene queries.

use thiserror::Error;

/// Errors that can occur while building or querying a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("scene is dirty, call build() before rendering")]
    Dirty,

    #[error("material {index} weights sum to {sum}, expected 1")]
    UnbalancedMaterial { index: usize, sum: f32 },

    #[error("material {material} references missing texture {texture}")]
    MissingTexture { material: usize, texture: usize },

    #[error("triangle {triangle} references missing vertex {vertex}")]
    MissingVertex { triangle: usize, vertex: usize },

    #[error("triangle {triangle} references missing material {material}")]
    MissingMaterial { triangle: usize, material: usize },

    #[error("mesh has {uvs} uvs for {vertices} vertices")]
    UvCountMismatch { vertices: usize, uvs: usize },

    #[error("triangle id {0} out of range")]
    TriangleOutOfRange(usize),

    #[error("image index ({x}, {y}) out of range for {width}x{height}")]
    ImageIndex {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("settings parse error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type SceneResult<T> = Result<T, SceneError>;
