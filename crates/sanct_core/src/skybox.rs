//! Six-face cube map environment.

use std::path::Path;

use sanct_math::Vec3;

use crate::bitmap::Image;
use crate::error::SceneResult;

/// Face order: +X, -X, +Y, -Y, +Z, -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Skybox {
    faces: [Image; 6],
}

impl Skybox {
    pub fn new(faces: [Image; 6]) -> Self {
        Self { faces }
    }

    /// Load `0001.png` .. `0006.png` from a directory.
    pub fn load(dir: impl AsRef<Path>) -> SceneResult<Self> {
        let dir = dir.as_ref();
        let load = |i: usize| Image::from_file(dir.join(format!("{:04}.png", i + 1)));
        Ok(Self::new([
            load(0)?,
            load(1)?,
            load(2)?,
            load(3)?,
            load(4)?,
            load(5)?,
        ]))
    }

    /// Color seen along `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let (face, sc, tc, major) = face_coords(direction);
        if major <= 0.0 {
            return Vec3::ZERO;
        }
        let s = 0.5 * (sc / major + 1.0);
        let t = 0.5 * (tc / major + 1.0);
        self.faces[face].texel(s, t)
    }

    /// Mean of every face, used as the ambient term.
    pub fn ambient_color(&self) -> Vec3 {
        let sum: Vec3 = self.faces.iter().map(Image::mean_color).sum();
        sum / self.faces.len() as f32
    }
}

/// Cube map face selection by the dominant axis (OpenGL layout).
fn face_coords(d: Vec3) -> (usize, f32, f32, f32) {
    let a = d.abs();
    if a.x >= a.y && a.x >= a.z {
        if d.x > 0.0 {
            (0, -d.z, -d.y, a.x)
        } else {
            (1, d.z, -d.y, a.x)
        }
    } else if a.y >= a.z {
        if d.y > 0.0 {
            (2, d.x, d.z, a.y)
        } else {
            (3, d.x, -d.z, a.y)
        }
    } else if d.z > 0.0 {
        (4, d.x, -d.y, a.z)
    } else {
        (5, -d.x, -d.y, a.z)
    }
}
