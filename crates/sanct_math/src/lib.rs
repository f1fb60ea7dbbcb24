//! Sanct math - vector types, rays and bounding boxes shared by the
//! scene and the renderer.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{refract, reflect, Ray};

/// Tolerance used for ray/plane projections and weight cut-offs.
pub const EPSILON: f32 = 1e-6;
