//! Scene lights.

use std::f32::consts::PI;

use sanct_math::Vec3;

/// Point contributions dimmer than this (max channel) are skipped before the shadow test.
const MIN_POINT_CONTRIBUTION: f32 = 0.01;

/// How far back along its direction a sun is placed for the shadow test.
const SUN_DISTANCE: f32 = 1e3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Omnidirectional light at a position, falling off with the square of the distance.
    Point { position: Vec3 },
    /// Directional light; `direction` points from the sun towards the scene.
    Sun { direction: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Point { position },
        }
    }

    pub fn sun(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Sun {
                direction: direction.normalize_or_zero(),
            },
        }
    }

    /// Light arriving at `point` with surface normal `normal`.
    ///
    /// `occluded(from, to)` answers the shadow query. The cosine term uses the
    /// absolute value so both sides of transmissive surfaces receive light.
    pub fn contribution<F>(&self, point: Vec3, normal: Vec3, occluded: F) -> Vec3
    where
        F: Fn(Vec3, Vec3) -> bool,
    {
        match self.kind {
            LightKind::Point { position } => {
                let to_light = position - point;
                let radius_sq = to_light.length_squared();
                if radius_sq <= 0.0 {
                    return Vec3::ZERO;
                }
                let cos_law = normal.dot(to_light / radius_sq.sqrt()).abs();
                let sphere_area = 4.0 * PI * radius_sq;
                let contrib = self.color * self.intensity * cos_law / sphere_area;
                if contrib.max_element() < MIN_POINT_CONTRIBUTION {
                    return Vec3::ZERO;
                }
                if occluded(point, position) {
                    return Vec3::ZERO;
                }
                contrib
            }
            LightKind::Sun { direction } => {
                let sun_position = point - direction * SUN_DISTANCE;
                if occluded(point, sun_position) {
                    return Vec3::ZERO;
                }
                self.color * self.intensity * normal.dot(direction).abs()
            }
        }
    }
}
