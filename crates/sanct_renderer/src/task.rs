//! Units of ray work.

use sanct_math::Ray;

/// One in-flight ray evaluation targeting a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceTask {
    pub ray: Ray,
    pub x: usize,
    pub y: usize,
    /// Bounces since the primary ray
    pub depth: usize,
    /// Share of the pixel color carried by this ray, in [0, 1]
    pub weight: f32,
    /// Refractive index of the medium the ray travels through
    pub ior: f32,
}

impl TraceTask {
    /// Camera ray for pixel (x, y), starting in vacuum with full weight.
    pub fn primary(ray: Ray, x: usize, y: usize) -> Self {
        Self {
            ray,
            x,
            y,
            depth: 0,
            weight: 1.0,
            ior: 1.0,
        }
    }

    /// Bounce spawned from this task: one level deeper, weight scaled by `factor`.
    pub fn child(&self, ray: Ray, factor: f32) -> Self {
        Self {
            ray,
            depth: self.depth + 1,
            weight: self.weight * factor,
            ..*self
        }
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }
}
