//! Albedo sources for materials.
//!
//! A texture maps a hit (its UVs or barycentrics) to a surface color.
//! Bitmaps are decoded through the `image` crate into an [`Image`].

use std::path::Path;

use sanct_math::Vec3;

use crate::bitmap::Image;
use crate::error::SceneResult;
use crate::hit::TraceHit;

/// How a texture computes its color.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureKind {
    /// A single color.
    Solid(Vec3),
    /// `edge` within `width` (in barycentric units) of any triangle edge, `inner` elsewhere.
    Edges { edge: Vec3, inner: Vec3, width: f32 },
    /// UV checkerboard with squares of side `size`.
    Checker { a: Vec3, b: Vec3, size: f32 },
    /// Nearest lookup into an image, v pointing up.
    Bitmap(Image),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub kind: TextureKind,
}

impl Texture {
    pub fn new(name: impl Into<String>, kind: TextureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn solid(name: impl Into<String>, color: Vec3) -> Self {
        Self::new(name, TextureKind::Solid(color))
    }

    /// Load a bitmap texture from disk.
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> SceneResult<Self> {
        Ok(Self::new(name, TextureKind::Bitmap(Image::from_file(path)?)))
    }

    /// Surface color for a hit on a triangle using this texture.
    pub fn albedo(&self, hit: &TraceHit) -> Vec3 {
        match &self.kind {
            TextureKind::Solid(color) => *color,
            TextureKind::Edges { edge, inner, width } => {
                let (u, v) = (hit.bary_u, hit.bary_v);
                if u < *width || v < *width || 1.0 - u - v < *width {
                    *edge
                } else {
                    *inner
                }
            }
            TextureKind::Checker { a, b, size } => {
                let scale = 0.5 / size;
                let u = (hit.u * scale).rem_euclid(1.0);
                let v = (hit.v * scale).rem_euclid(1.0);
                if (u <= 0.5) == (v <= 0.5) {
                    *a
                } else {
                    *b
                }
            }
            TextureKind::Bitmap(image) => {
                if image.is_empty() {
                    return Vec3::ZERO;
                }
                let (w, h) = (image.width(), image.height());
                let x = ((hit.u.clamp(0.0, 1.0) * (w - 1) as f32) as usize).min(w - 1);
                let y = ((hit.v.clamp(0.0, 1.0) * (h - 1) as f32) as usize).min(h - 1);
                // v grows upwards, image rows grow downwards
                image
                    .get(x, h - 1 - y)
                    .map(|c| c.to_unit())
                    .unwrap_or(Vec3::ZERO)
            }
        }
    }
}
