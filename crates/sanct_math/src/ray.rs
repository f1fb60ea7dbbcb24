use crate::Vec3;

/// A ray in 3D space with an origin and a unit-length direction.
///
/// Every consumer (triangle tests, shading, Fresnel) assumes the direction
/// is normalized, so the constructor normalizes it once.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a new ray. `direction` is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray from `from` pointing at `to`.
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self::new(from, to - from)
    }

    /// Get the unit direction of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Mirror this ray about `normal`, restarting at `origin`.
    pub fn reflected(&self, origin: Vec3, normal: Vec3) -> Ray {
        Ray::new(origin, reflect(self.direction, normal))
    }

    /// Bend this ray through a boundary from a medium of index `etai` into
    /// one of index `etat`, restarting at `origin`.
    ///
    /// `normal` must face against the ray. Returns `None` on total internal
    /// reflection.
    pub fn refracted(&self, origin: Vec3, normal: Vec3, etai: f32, etat: f32) -> Option<Ray> {
        refract(self.direction, normal, etai / etat).map(|dir| Ray::new(origin, dir))
    }
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract the unit vector `i` through a surface with normal `n` (facing
/// against `i`), using the ratio of refractive indices `eta = etai / etat`.
pub fn refract(i: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-i.dot(n)).min(1.0);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some(eta * i + (eta * cos_i - k.sqrt()) * n)
}
