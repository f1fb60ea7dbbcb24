//! 8-bit RGB images: render results, bitmap textures and skybox faces.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use sanct_math::Vec3;

use crate::error::{SceneError, SceneResult};

/// An 8-bit RGB pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Color8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color8 {
    pub const BLACK: Color8 = Color8 { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Quantize a linear color in [0, 1] (values outside are clamped).
    pub fn from_unit(color: Vec3) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(color.x), q(color.y), q(color.z))
    }

    /// Back to a [0, 1] color.
    pub fn to_unit(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }
}

/// A row-major RGB image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<Color8>,
}

impl Image {
    /// Create a black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color8::BLACK; width * height],
        }
    }

    /// Decode an image file (PNG, BMP, ...) into RGB.
    pub fn from_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let decoded = ::image::open(path.as_ref())?.to_rgb8();
        let (width, height) = decoded.dimensions();
        let pixels = decoded
            .pixels()
            .map(|p| Color8::new(p[0], p[1], p[2]))
            .collect();

        log::debug!(
            "Loaded bitmap: {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn index(&self, x: usize, y: usize) -> SceneResult<usize> {
        if x >= self.width || y >= self.height {
            return Err(SceneError::ImageIndex {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y * self.width + x)
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: usize, y: usize) -> SceneResult<Color8> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: usize, y: usize, color: Color8) -> SceneResult<()> {
        let i = self.index(x, y)?;
        self.pixels[i] = color;
        Ok(())
    }

    /// Nearest-texel lookup for in-range UVs, with (0, 0) at the top-left.
    pub(crate) fn texel(&self, u: f32, v: f32) -> Vec3 {
        if self.pixels.is_empty() {
            return Vec3::ZERO;
        }
        let x = (u.clamp(0.0, 1.0) * (self.width - 1) as f32) as usize;
        let y = (v.clamp(0.0, 1.0) * (self.height - 1) as f32) as usize;
        self.pixels[y * self.width + x].to_unit()
    }

    /// Average color over every pixel.
    pub fn mean_color(&self) -> Vec3 {
        if self.pixels.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self.pixels.iter().map(|p| p.to_unit()).sum();
        sum / self.pixels.len() as f32
    }

    pub fn pixels(&self) -> &[Color8] {
        &self.pixels
    }

    /// Raw RGB bytes, row-major (e.g. for PPM/PNG encoders).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}
