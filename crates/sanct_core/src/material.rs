//! Surface materials.
//!
//! A material is a closed set of shading behaviours ([`MaterialKind`]) plus
//! the shared surface inputs: albedo, optional texture, normal smoothing and
//! whether the surface casts shadows.

use sanct_math::Vec3;

use crate::error::{SceneError, SceneResult};
use crate::hit::TraceHit;
use crate::texture::Texture;

/// Tolerance for the weight split check.
const WEIGHT_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MaterialKind {
    /// Placeholder; rendering it is an error.
    #[default]
    Void,
    /// Lambertian surface lit by the scene lights.
    Diffuse,
    /// Unlit albedo.
    Constant,
    /// Mirror mixed with a diffuse base.
    Reflective { reflectivity: f32, diffuseness: f32 },
    /// Fresnel-weighted reflection and transmission.
    Refractive {
        ior: f32,
        transparency: f32,
        reflectivity: f32,
    },
    /// Colors hits by KD-tree leaf depth and continues through the surface.
    DebugAccel,
    DebugNormal,
    DebugUv,
    DebugBary,
}

impl MaterialKind {
    pub const fn reflective() -> Self {
        Self::Reflective {
            reflectivity: 0.8,
            diffuseness: 0.2,
        }
    }

    pub const fn refractive(ior: f32) -> Self {
        Self::Refractive {
            ior,
            transparency: 0.9,
            reflectivity: 0.1,
        }
    }

    /// `(diffuseness, reflectivity, transparency)` for kinds that split their weight.
    pub fn weights(&self) -> Option<(f32, f32, f32)> {
        match *self {
            Self::Reflective {
                reflectivity,
                diffuseness,
            } => Some((diffuseness, reflectivity, 0.0)),
            Self::Refractive {
                transparency,
                reflectivity,
                ..
            } => Some((0.0, reflectivity, transparency)),
            _ => None,
        }
    }

    pub fn is_refractive(&self) -> bool {
        matches!(self, Self::Refractive { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vec3,
    /// Index into the scene's textures; overrides `albedo` when set.
    pub texture: Option<usize>,
    pub smooth_shading: bool,
    /// Whether the surface blocks shadow rays.
    pub occludes: bool,
    pub kind: MaterialKind,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec3::splat(0.5),
            texture: None,
            smooth_shading: false,
            occludes: true,
            kind: MaterialKind::Diffuse,
        }
    }
}

impl Material {
    pub fn new(kind: MaterialKind, albedo: Vec3) -> Self {
        Self {
            albedo,
            kind,
            // transmissive surfaces let light through
            occludes: !kind.is_refractive(),
            ..Default::default()
        }
    }

    pub fn diffuse(albedo: Vec3) -> Self {
        Self::new(MaterialKind::Diffuse, albedo)
    }

    pub fn constant(albedo: Vec3) -> Self {
        Self::new(MaterialKind::Constant, albedo)
    }

    pub fn reflective(albedo: Vec3) -> Self {
        Self::new(MaterialKind::reflective(), albedo)
    }

    pub fn refractive(ior: f32) -> Self {
        Self::new(MaterialKind::refractive(ior), Vec3::ONE)
    }

    pub fn with_texture(mut self, texture: usize) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_smooth_shading(mut self, smooth: bool) -> Self {
        self.smooth_shading = smooth;
        self
    }

    pub fn with_occludes(mut self, occludes: bool) -> Self {
        self.occludes = occludes;
        self
    }

    /// Surface color at a hit.
    pub fn albedo(&self, textures: &[Texture], hit: &TraceHit) -> Vec3 {
        match self.texture.and_then(|i| textures.get(i)) {
            Some(texture) => texture.albedo(hit),
            None => self.albedo,
        }
    }

    /// Check the weight split and texture reference.
    ///
    /// `index` is only used for error reporting.
    pub fn validate(&self, index: usize, texture_count: usize) -> SceneResult<()> {
        if let Some((d, r, t)) = self.kind.weights() {
            let sum = d + r + t;
            let in_range = [d, r, t].iter().all(|w| (0.0..=1.0).contains(w));
            if !in_range || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(SceneError::UnbalancedMaterial { index, sum });
            }
        }
        if let Some(texture) = self.texture {
            if texture >= texture_count {
                return Err(SceneError::MissingTexture {
                    material: index,
                    texture,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureKind;

    #[test]
    fn test_default_splits_are_balanced() {
        assert!(Material::reflective(Vec3::ONE).validate(0, 0).is_ok());
        assert!(Material::refractive(1.5).validate(0, 0).is_ok());
        assert_eq!(
            MaterialKind::reflective().weights(),
            Some((0.2, 0.8, 0.0))
        );
        assert_eq!(
            MaterialKind::refractive(1.5).weights(),
            Some((0.0, 0.1, 0.9))
        );
    }

    #[test]
    fn test_unbalanced_split_rejected() {
        let material = Material::new(
            MaterialKind::Reflective {
                reflectivity: 0.9,
                diffuseness: 0.2,
            },
            Vec3::ONE,
        );
        assert!(matches!(
            material.validate(3, 0),
            Err(SceneError::UnbalancedMaterial { index: 3, .. })
        ));
    }

    #[test]
    fn test_missing_texture_rejected() {
        let material = Material::diffuse(Vec3::ONE).with_texture(2);
        assert!(matches!(
            material.validate(0, 2),
            Err(SceneError::MissingTexture { texture: 2, .. })
        ));
        assert!(material.validate(0, 3).is_ok());
    }

    #[test]
    fn test_refractive_does_not_occlude() {
        assert!(!Material::refractive(1.5).occludes);
        assert!(Material::diffuse(Vec3::ONE).occludes);
    }

    #[test]
    fn test_texture_overrides_albedo() {
        let textures = vec![Texture::new("blue", TextureKind::Solid(Vec3::Z))];
        let hit = TraceHit::default();
        let plain = Material::diffuse(Vec3::X);
        assert_eq!(plain.albedo(&textures, &hit), Vec3::X);
        assert_eq!(plain.with_texture(0).albedo(&textures, &hit), Vec3::Z);
    }
}
