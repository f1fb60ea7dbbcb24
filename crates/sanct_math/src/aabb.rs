use crate::{Interval, Ray, Vec3};

/// Axis-aligned bounding box stored as its min/max corners.
///
/// Used both for cached per-triangle bounds and for the extent of every
/// spatial index node. A valid box has `min <= max` componentwise;
/// [`Aabb::EMPTY`] is the identity for [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Tight box around three triangle vertices.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Smallest box containing every box in `boxes`.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Self {
        boxes
            .into_iter()
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow every side by `delta`.
    pub fn padded(&self, delta: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(delta),
            max: self.max + Vec3::splat(delta),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        Interval::new(self.min[n], self.max[n])
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// True if `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// True if the two closed boxes share at least one point.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| self.axis_interval(axis).overlaps(&other.axis_interval(axis)))
    }

    /// Cut the box in two at `value` along `axis`.
    ///
    /// Returns `(lower, upper)`; both halves share the splitting plane.
    pub fn split(&self, axis: usize, value: f32) -> (Aabb, Aabb) {
        let mut lower = *self;
        let mut upper = *self;
        lower.max[axis] = value;
        upper.min[axis] = value;
        (lower, upper)
    }

    /// Parameter at which the ray enters the box, clipped to `ray_t`.
    ///
    /// Uses the slab method. A ray starting inside the box enters at
    /// `ray_t.min`. Returns `None` if the ray misses.
    pub fn entry(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        let origin = ray.origin;
        let dir = ray.direction();
        let mut range = ray_t;

        for axis in 0..3 {
            let adinv = 1.0 / dir[axis];
            let mut t0 = (self.min[axis] - origin[axis]) * adinv;
            let mut t1 = (self.max[axis] - origin[axis]) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN (ray inside a slab plane) leaves the range untouched.
            range.min = t0.max(range.min);
            range.max = t1.min(range.max);
            if range.max < range.min {
                return None;
            }
        }

        Some(range.min)
    }

    /// Test if a ray intersects this AABB within the given interval.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.entry(ray, ray_t).is_some()
    }

    /// Box that contains nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_aabb_from_triangle() {
        let aabb = Aabb::from_triangle(
            Vec3::new(-1.0, -1.0, -3.0),
            Vec3::new(1.0, -1.0, -3.0),
            Vec3::new(0.0, 1.0, -3.0),
        );
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, -3.0));
    }

    #[test]
    fn test_aabb_enclosing() {
        let boxes = [
            Aabb::from_points(Vec3::ZERO, Vec3::splat(5.0)),
            Aabb::from_points(Vec3::splat(3.0), Vec3::splat(10.0)),
        ];
        let all = Aabb::enclosing(&boxes);
        assert_eq!(all.min, Vec3::ZERO);
        assert_eq!(all.max, Vec3::splat(10.0));
        assert_eq!(Aabb::enclosing(&[] as &[Aabb]), Aabb::EMPTY);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = unit_box();

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.hit(&ray, Interval::forward()));
        assert!((aabb.entry(&ray, Interval::forward()).unwrap() - 4.0).abs() < 1e-6);

        // Pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(!aabb.hit(&ray, Interval::forward()));

        // Passing beside
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(!aabb.hit(&ray, Interval::forward()));
    }

    #[test]
    fn test_aabb_entry_from_inside() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(unit_box().entry(&ray, Interval::forward()), Some(0.0));
    }

    #[test]
    fn test_aabb_hit_flat_box_in_plane() {
        // Zero-thickness box, ray travelling inside its plane.
        let flat = Aabb::from_points(Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, 1.0, -3.0));
        let ray = Ray::new(Vec3::new(-5.0, 0.0, -3.0), Vec3::X);
        assert!(flat.hit(&ray, Interval::forward()));
    }

    #[test]
    fn test_aabb_overlaps_and_contains() {
        let a = unit_box();
        let b = Aabb::from_points(Vec3::splat(1.0), Vec3::splat(2.0));
        let c = Aabb::from_points(Vec3::splat(1.5), Vec3::splat(2.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains(Vec3::splat(1.0)));
        assert!(!a.contains(Vec3::new(0.0, 0.0, 1.01)));
    }

    #[test]
    fn test_aabb_split() {
        let (lower, upper) = unit_box().split(1, 0.25);
        assert_eq!(lower.max.y, 0.25);
        assert_eq!(upper.min.y, 0.25);
        assert_eq!(lower.min, unit_box().min);
        assert_eq!(upper.max, unit_box().max);
    }

    #[test]
    fn test_aabb_longest_axis() {
        let aabb_x = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.longest_axis(), 0);

        let aabb_y = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.longest_axis(), 1);

        let aabb_z = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.longest_axis(), 2);
    }

    #[test]
    fn test_aabb_padded() {
        let padded = unit_box().padded(0.5);
        assert_eq!(padded.min, Vec3::splat(-1.5));
        assert_eq!(padded.centroid(), Vec3::ZERO);
    }
}
