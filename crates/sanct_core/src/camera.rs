//! Pinhole camera for primary ray generation.

use sanct_math::{Ray, Vec3};

/// A pinhole camera described by its position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_vfov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Precompute the image plane for a resolution.
    pub fn frame(&self, width: usize, height: usize) -> CameraFrame {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;

        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width / height);

        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        let pixel_delta_u = viewport_u / width;
        let pixel_delta_v = viewport_v / height;

        let upper_left = self.look_from - w - viewport_u / 2.0 - viewport_v / 2.0;

        CameraFrame {
            center: self.look_from,
            pixel00: upper_left + 0.5 * (pixel_delta_u + pixel_delta_v),
            pixel_delta_u,
            pixel_delta_v,
        }
    }
}

/// A camera bound to an image resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    center: Vec3,
    pixel00: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl CameraFrame {
    /// Ray through the centre of pixel (x, y), (0, 0) being the top-left pixel.
    pub fn ray(&self, x: usize, y: usize) -> Ray {
        let target = self.pixel00 + x as f32 * self.pixel_delta_u + y as f32 * self.pixel_delta_v;
        Ray::between(self.center, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_looks_forward() {
        let frame = Camera::new().frame(101, 101);
        let ray = frame.ray(50, 50);
        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_corner_rays() {
        // 90 degree fov, square image: the top-left pixel centre is just inside (-1, 1, -1)
        let frame = Camera::new().frame(2, 2);
        let d = frame.ray(0, 0).direction();
        assert!(d.x < 0.0 && d.y > 0.0 && d.z < 0.0);
        let expected = Vec3::new(-0.5, 0.5, -1.0).normalize();
        assert!((d - expected).length() < 1e-5);

        let d = frame.ray(1, 1).direction();
        assert!(d.x > 0.0 && d.y < 0.0);
    }

    #[test]
    fn test_with_position() {
        let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let ray = camera.frame(1, 1).ray(0, 0);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction() - Vec3::NEG_Z).length() < 1e-5);
    }
}
