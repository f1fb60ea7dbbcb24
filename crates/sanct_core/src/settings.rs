//! Render settings, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::kdtree::KdTreeParams;

/// Read-only render configuration.
///
/// Keys are camelCase; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Maximum ray tree depth
    pub max_depth: usize,
    /// Offset along the normal for secondary ray origins
    pub bias: f32,
    /// Pixels per scheduling bucket
    pub bucket_size: usize,
    pub max_triangles_per_leaf: usize,
    pub accel_tree_max_depth: usize,
    pub force_single_threaded: bool,
    /// Intersect by scanning every triangle instead of walking the KD-tree
    pub force_no_accel_structure: bool,
    /// Render only (debug_pixel_x, debug_pixel_y)
    pub debug_pixel: bool,
    pub debug_pixel_x: usize,
    pub debug_pixel_y: usize,
    /// Record hits so visible triangles can be queried after the frame
    pub prune_invisible: bool,
    pub resolution_x: usize,
    pub resolution_y: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: 16,
            bias: 0.001,
            bucket_size: 20,
            max_triangles_per_leaf: 4,
            accel_tree_max_depth: 12345,
            force_single_threaded: false,
            force_no_accel_structure: false,
            debug_pixel: false,
            debug_pixel_x: 0,
            debug_pixel_y: 0,
            prune_invisible: false,
            resolution_x: 300,
            resolution_y: 200,
        }
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }

    /// Pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| (x, y)))
    }
}

impl Settings {
    /// Parse and check a JSON document.
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.check()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let settings = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json_string(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn check(&self) -> SceneResult<()> {
        let invalid = |msg: String| Err(SceneError::InvalidSettings(msg));
        if self.resolution_x == 0 || self.resolution_y == 0 {
            return invalid(format!(
                "resolution {}x{} is empty",
                self.resolution_x, self.resolution_y
            ));
        }
        if self.bucket_size == 0 {
            return invalid("bucketSize must be positive".into());
        }
        if self.max_triangles_per_leaf == 0 {
            return invalid("maxTrianglesPerLeaf must be positive".into());
        }
        if !self.bias.is_finite() || self.bias < 0.0 {
            return invalid(format!("bias {} must be finite and non-negative", self.bias));
        }
        if self.debug_pixel
            && (self.debug_pixel_x >= self.resolution_x || self.debug_pixel_y >= self.resolution_y)
        {
            return invalid(format!(
                "debug pixel ({}, {}) outside {}x{}",
                self.debug_pixel_x, self.debug_pixel_y, self.resolution_x, self.resolution_y
            ));
        }
        Ok(())
    }

    /// Pixels rendered this frame: the whole image, or just the debug pixel.
    pub fn active_rect(&self) -> Rect {
        if self.debug_pixel {
            Rect {
                x0: self.debug_pixel_x,
                y0: self.debug_pixel_y,
                x1: self.debug_pixel_x + 1,
                y1: self.debug_pixel_y + 1,
            }
        } else {
            Rect {
                x0: 0,
                y0: 0,
                x1: self.resolution_x,
                y1: self.resolution_y,
            }
        }
    }

    /// Bucket size after single-thread and debug overrides.
    pub fn effective_bucket_size(&self) -> usize {
        if self.force_single_threaded || self.debug_pixel {
            usize::MAX
        } else {
            self.bucket_size
        }
    }

    pub fn kd_tree_params(&self) -> KdTreeParams {
        KdTreeParams {
            max_triangles_per_leaf: self.max_triangles_per_leaf,
            max_depth: self.accel_tree_max_depth,
        }
    }
}
