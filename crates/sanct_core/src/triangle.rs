//! Indexed triangle primitive.
//!
//! Triangles reference scene vertices by index and cache a unit face normal.
//! The counter-clockwise winding defines the front face.

use sanct_math::{Aabb, Interval, Ray, Vec2, Vec3, EPSILON};

use crate::hit::{HitKind, TraceHit};
use crate::material::Material;

/// Padding applied to cached triangle bounding boxes so flat triangles keep volume.
pub const AABB_PADDING: f32 = 1e-4;

/// Borrowed view of the per-scene arrays a triangle test reads.
#[derive(Debug, Clone, Copy)]
pub struct Surface<'a> {
    pub vertices: &'a [Vec3],
    pub uvs: &'a [Vec2],
    pub vertex_normals: &'a [Vec3],
    pub triangle_aabbs: &'a [Aabb],
    pub materials: &'a [Material],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [usize; 3],
    pub material: usize,
    normal: Vec3,
}

impl Triangle {
    pub fn new(vertices: [usize; 3], material: usize) -> Self {
        Self {
            vertices,
            material,
            normal: Vec3::ZERO,
        }
    }

    /// Cached face normal; valid after [`Triangle::build_normal`].
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn build_normal(&mut self, vertices: &[Vec3]) {
        let [v0, v1, v2] = self.positions(vertices);
        self.normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
    }

    pub fn positions(&self, vertices: &[Vec3]) -> [Vec3; 3] {
        self.vertices.map(|i| vertices[i])
    }

    pub fn area(&self, vertices: &[Vec3]) -> f32 {
        let [v0, v1, v2] = self.positions(vertices);
        (v1 - v0).cross(v2 - v0).length() * 0.5
    }

    /// Padded bounding box.
    pub fn aabb(&self, vertices: &[Vec3]) -> Aabb {
        let [v0, v1, v2] = self.positions(vertices);
        Aabb::from_triangle(v0, v1, v2).padded(AABB_PADDING)
    }

    /// Intersect a ray with triangle `index` of `surface`.
    ///
    /// Back faces of refractive materials are hit from inside: the result is
    /// `InsideRefractive` with the normal pointing along the ray.
    pub fn intersect(&self, surface: &Surface, ray: &Ray, index: usize) -> TraceHit {
        if !surface.triangle_aabbs[index].hit(ray, Interval::forward()) {
            return TraceHit::miss(HitKind::OutOfBounds);
        }

        let proj = ray.direction().dot(self.normal);
        if proj < -EPSILON {
            self.compute_hit(surface, ray, index, self.vertices, self.normal, proj, 1.0)
        } else if proj > EPSILON {
            let refractive = surface
                .materials
                .get(self.material)
                .is_some_and(|m| m.kind.is_refractive());
            if !refractive {
                return TraceHit {
                    triangle: Some(index),
                    ..TraceHit::miss(HitKind::Backface)
                };
            }

            let [a, b, c] = self.vertices;
            let mut hit = self.compute_hit(surface, ray, index, [a, c, b], -self.normal, -proj, -1.0);
            if hit.kind == HitKind::Success {
                hit.kind = HitKind::InsideRefractive;
                hit.n = -hit.n;
                // report weights in this triangle's own vertex order
                std::mem::swap(&mut hit.bary_u, &mut hit.bary_v);
            }
            hit
        } else {
            TraceHit {
                triangle: Some(index),
                ..TraceHit::miss(HitKind::Parallel)
            }
        }
    }

    /// Plane hit, inside test and attribute interpolation for a front-facing ray.
    ///
    /// `orientation` is -1 for the face-swapped triangle, so interpolated vertex
    /// normals face the same way as `normal`.
    #[allow(clippy::too_many_arguments)]
    fn compute_hit(
        &self,
        surface: &Surface,
        ray: &Ray,
        index: usize,
        [i0, i1, i2]: [usize; 3],
        normal: Vec3,
        proj: f32,
        orientation: f32,
    ) -> TraceHit {
        let (v0, v1, v2) = (
            surface.vertices[i0],
            surface.vertices[i1],
            surface.vertices[i2],
        );
        let e0 = v1 - v0;
        let e1 = v2 - v0;

        let t = normal.dot(v0 - ray.origin) / proj;
        if t < 0.0 {
            return TraceHit {
                triangle: Some(index),
                ..TraceHit::miss(HitKind::BehindOrigin)
            };
        }
        let p = ray.at(t);

        let v0p = p - v0;
        let c0 = e0.cross(v0p);
        let c1 = v0p.cross(e1);
        let c2 = (v2 - v1).cross(p - v1);
        let inside =
            normal.dot(c0) > -EPSILON && normal.dot(c1) > -EPSILON && normal.dot(c2) > -EPSILON;
        if !inside {
            return TraceHit::miss(HitKind::OutOfBounds);
        }

        let area_inv = 1.0 / e0.cross(e1).length();
        let bary_u = c1.length() * area_inv;
        let bary_v = c0.length() * area_inv;
        let bary_w = 1.0 - bary_u - bary_v;

        let uv = |i: usize| surface.uvs.get(i).copied().unwrap_or(Vec2::ZERO);
        let uv = uv(i0) * bary_w + uv(i1) * bary_u + uv(i2) * bary_v;

        let smooth = surface
            .materials
            .get(self.material)
            .is_some_and(|m| m.smooth_shading);
        let (n, kind) = if smooth {
            let vn = |i: usize| surface.vertex_normals.get(i).copied().unwrap_or(normal);
            let n = ((vn(i0) * bary_w + vn(i1) * bary_u + vn(i2) * bary_v) * orientation)
                .normalize_or_zero();
            (n, classify(n, ray.direction()))
        } else {
            (normal, HitKind::Success)
        };

        TraceHit {
            t,
            p,
            n,
            u: uv.x,
            v: uv.y,
            bary_u,
            bary_v,
            material: self.material,
            triangle: Some(index),
            tree_depth: 0,
            kind,
        }
    }

    /// Segment test used for shadow rays.
    ///
    /// True if the segment `start..end` crosses the triangle, by comparing
    /// signs of tetrahedron volumes.
    pub fn fast_intersect(&self, vertices: &[Vec3], start: Vec3, end: Vec3) -> bool {
        let [v0, v1, v2] = self.positions(vertices);
        if positive_volume(start, v0, v1, v2) == positive_volume(end, v0, v1, v2) {
            return false;
        }
        let side = positive_volume(start, end, v0, v1);
        side == positive_volume(start, end, v1, v2) && side == positive_volume(start, end, v2, v0)
    }
}

fn classify(n: Vec3, direction: Vec3) -> HitKind {
    let proj = direction.dot(n);
    if proj < -EPSILON {
        HitKind::Success
    } else if proj > EPSILON {
        HitKind::Backface
    } else {
        HitKind::Parallel
    }
}

fn positive_volume(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> bool {
    (b - a).cross(c - a).dot(d - a) > 0.0
}
