//! Result of one ray/scene query.

use sanct_math::Vec3;

/// Classification of a ray/triangle (or ray/scene) query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitKind {
    /// The ray hit the front face inside the triangle.
    Success,
    /// The ray missed: outside the triangle, the node or the whole scene.
    #[default]
    OutOfBounds,
    /// The triangle plane lies behind the ray origin.
    BehindOrigin,
    /// The ray hit the back of a non-refractive surface.
    Backface,
    /// The ray is parallel to the surface.
    Parallel,
    /// The ray is leaving a refractive medium through its back face.
    InsideRefractive,
}

/// One ray/scene query result. References its triangle by index only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    /// Distance along the ray
    pub t: f32,
    /// Hit point
    pub p: Vec3,
    /// Shading normal at the hit point
    pub n: Vec3,
    /// Interpolated texture coordinates
    pub u: f32,
    pub v: f32,
    /// Barycentric weights of the second and third vertex
    pub bary_u: f32,
    pub bary_v: f32,
    pub material: usize,
    pub triangle: Option<usize>,
    /// Depth of the KD-tree leaf that produced the hit
    pub tree_depth: usize,
    pub kind: HitKind,
}

impl Default for TraceHit {
    fn default() -> Self {
        Self {
            t: f32::MAX,
            p: Vec3::ZERO,
            n: Vec3::ZERO,
            u: 0.0,
            v: 0.0,
            bary_u: 0.0,
            bary_v: 0.0,
            material: 0,
            triangle: None,
            tree_depth: 0,
            kind: HitKind::OutOfBounds,
        }
    }
}

impl TraceHit {
    /// A miss of the given kind.
    pub fn miss(kind: HitKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// True for hits that should be shaded.
    pub fn successful(&self) -> bool {
        matches!(self.kind, HitKind::Success | HitKind::InsideRefractive)
    }

    /// The hit point moved `bias` along the normal.
    pub fn bias_point(&self, bias: f32) -> Vec3 {
        self.p + self.n * bias
    }
}
