//! Per-pixel sample accumulation and flattening.
//!
//! Each pixel keeps the ordered list of [`Shade`]s its ray tree produced.
//! Workers append to a [`BucketOutput`] they own exclusively; the renderer
//! merges those into the frame's [`RendererOutput`] after the pool joins.

use sanct_core::{Color8, Image, Rect, Settings, TraceHit};
use sanct_math::Vec3;

use crate::error::{RenderError, RenderResult};
use crate::task::TraceTask;

/// How a sample combines with the color accumulated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendKind {
    /// Interpolate towards the sample color by its weight.
    #[default]
    Normal,
    /// Add the sample color, clamped to [0, 1].
    Additive,
}

/// One weighted color contribution to a pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shade {
    pub color: Vec3,
    pub weight: f32,
    pub blend: BlendKind,
}

impl Shade {
    pub fn new(color: Vec3, weight: f32, blend: BlendKind) -> Self {
        Self {
            color,
            weight,
            blend,
        }
    }

    pub fn normal(color: Vec3, weight: f32) -> Self {
        Self::new(color, weight, BlendKind::Normal)
    }

    pub fn additive(color: Vec3, weight: f32) -> Self {
        Self::new(color, weight, BlendKind::Additive)
    }
}

/// A sample tagged with its pixel, as produced while draining one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSample {
    pub x: usize,
    pub y: usize,
    pub shade: Shade,
    pub hit: Option<TraceHit>,
}

/// Samples produced by one bucket, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct BucketOutput {
    samples: Vec<PixelSample>,
    record_hits: bool,
}

impl BucketOutput {
    pub fn new(record_hits: bool) -> Self {
        Self {
            samples: Vec::new(),
            record_hits,
        }
    }

    pub fn add_sample(&mut self, task: &TraceTask, shade: Shade, hit: &TraceHit) {
        self.samples.push(PixelSample {
            x: task.x,
            y: task.y,
            shade,
            hit: self.record_hits.then_some(*hit),
        });
    }

    pub fn samples(&self) -> &[PixelSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Frame-sized sample store over the active rectangle.
#[derive(Debug, Clone)]
pub struct RendererOutput {
    width: usize,
    height: usize,
    rect: Rect,
    record_hits: bool,
    shades: Vec<Vec<Shade>>,
    hits: Vec<Vec<TraceHit>>,
}

impl RendererOutput {
    pub fn new(settings: &Settings) -> Self {
        let rect = settings.active_rect();
        let record_hits = settings.prune_invisible;
        Self {
            width: settings.resolution_x,
            height: settings.resolution_y,
            rect,
            record_hits,
            shades: vec![Vec::new(); rect.area()],
            hits: if record_hits {
                vec![Vec::new(); rect.area()]
            } else {
                Vec::new()
            },
        }
    }

    /// Drop every sample and resize for `settings`.
    pub fn reset(&mut self, settings: &Settings) {
        *self = Self::new(settings);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn active_rect(&self) -> Rect {
        self.rect
    }

    pub fn records_hits(&self) -> bool {
        self.record_hits
    }

    fn index(&self, x: usize, y: usize) -> RenderResult<usize> {
        if !self.rect.contains(x, y) {
            return Err(RenderError::PixelOutOfRange { x, y });
        }
        Ok((y - self.rect.y0) * self.rect.width() + (x - self.rect.x0))
    }

    /// Append a sample to the task's pixel.
    pub fn add_sample(&mut self, task: &TraceTask, shade: Shade, hit: &TraceHit) -> RenderResult<()> {
        self.push(task.x, task.y, shade, Some(hit))
    }

    fn push(&mut self, x: usize, y: usize, shade: Shade, hit: Option<&TraceHit>) -> RenderResult<()> {
        let i = self.index(x, y)?;
        self.shades[i].push(shade);
        if self.record_hits {
            if let Some(hit) = hit {
                self.hits[i].push(*hit);
            }
        }
        Ok(())
    }

    /// Append a bucket's samples in their evaluation order.
    pub fn merge(&mut self, bucket: BucketOutput) -> RenderResult<()> {
        for sample in bucket.samples {
            self.push(sample.x, sample.y, sample.shade, sample.hit.as_ref())?;
        }
        Ok(())
    }

    pub fn samples(&self, x: usize, y: usize) -> RenderResult<&[Shade]> {
        let i = self.index(x, y)?;
        Ok(&self.shades[i])
    }

    /// Fold a pixel's samples into its final color.
    pub fn flatten_pixel(&self, x: usize, y: usize) -> RenderResult<Vec3> {
        let (first, rest) = self
            .samples(x, y)?
            .split_first()
            .ok_or(RenderError::NoSamples { x, y })?;

        Ok(rest.iter().fold(first.color, |color, shade| match shade.blend {
            BlendKind::Normal => color.lerp(shade.color, shade.weight),
            BlendKind::Additive => (color + shade.color).clamp(Vec3::ZERO, Vec3::ONE),
        }))
    }

    /// Full-resolution image; pixels outside the active rectangle stay black.
    pub fn get_flat_image(&self) -> RenderResult<Image> {
        let mut image = Image::new(self.width, self.height);
        for (x, y) in self.rect.pixels() {
            let color = self.flatten_pixel(x, y)?;
            image.set(x, y, Color8::from_unit(color))?;
        }
        Ok(image)
    }

    /// One image per sample index: image `k` shows every pixel's `k`-th sample.
    pub fn get_depth_images(&self) -> RenderResult<Vec<Image>> {
        let levels = self.shades.iter().map(Vec::len).max().unwrap_or(0);
        let mut images = vec![Image::new(self.width, self.height); levels];
        for (x, y) in self.rect.pixels() {
            for (level, shade) in self.samples(x, y)?.iter().enumerate() {
                images[level].set(x, y, Color8::from_unit(shade.color))?;
            }
        }
        Ok(images)
    }

    /// Distinct triangles hit anywhere in the frame, in first-seen order.
    pub fn get_visible_triangle_ids(&self, max_triangles: usize) -> RenderResult<Vec<usize>> {
        if !self.record_hits {
            return Err(RenderError::HitsNotRecorded);
        }

        let mut seen = vec![false; max_triangles];
        let mut ids = Vec::new();
        for id in self.hits.iter().flatten().filter_map(|hit| hit.triangle) {
            let slot = seen.get_mut(id).ok_or(RenderError::TriangleIdOutOfRange {
                id,
                max: max_triangles,
            })?;
            if !*slot {
                *slot = true;
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanct_core::HitKind;
    use sanct_math::Ray;

    fn settings(w: usize, h: usize) -> Settings {
        Settings {
            resolution_x: w,
            resolution_y: h,
            ..Default::default()
        }
    }

    fn task(x: usize, y: usize) -> TraceTask {
        TraceTask::primary(Ray::new(Vec3::ZERO, Vec3::NEG_Z), x, y)
    }

    fn hit_on(triangle: usize) -> TraceHit {
        TraceHit {
            triangle: Some(triangle),
            kind: HitKind::Success,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_normal_sample_flattens_to_itself() {
        let mut out = RendererOutput::new(&settings(2, 2));
        let color = Vec3::new(0.25, 0.5, 0.75);
        out.add_sample(&task(1, 0), Shade::normal(color, 0.3), &TraceHit::default())
            .unwrap();
        assert_eq!(out.flatten_pixel(1, 0).unwrap(), color);
    }

    #[test]
    fn test_additive_samples_clamp() {
        let mut out = RendererOutput::new(&settings(1, 1));
        let grey = Vec3::splat(0.6);
        let t = task(0, 0);
        out.add_sample(&t, Shade::additive(grey, 1.0), &TraceHit::default()).unwrap();
        out.add_sample(&t, Shade::additive(grey, 1.0), &TraceHit::default()).unwrap();
        assert_eq!(out.flatten_pixel(0, 0).unwrap(), Vec3::ONE);
    }

    #[test]
    fn test_normal_blend_lerps_by_weight() {
        let mut out = RendererOutput::new(&settings(1, 1));
        let t = task(0, 0);
        out.add_sample(&t, Shade::normal(Vec3::ZERO, 0.2), &TraceHit::default()).unwrap();
        out.add_sample(&t, Shade::normal(Vec3::ONE, 0.8), &TraceHit::default()).unwrap();
        assert!((out.flatten_pixel(0, 0).unwrap() - Vec3::splat(0.8)).length() < 1e-6);
    }

    #[test]
    fn test_empty_pixel_is_an_error() {
        let out = RendererOutput::new(&settings(2, 2));
        assert!(matches!(
            out.flatten_pixel(1, 1),
            Err(RenderError::NoSamples { x: 1, y: 1 })
        ));
        assert!(out.get_flat_image().is_err());
    }

    #[test]
    fn test_debug_pixel_rect() {
        let debug = Settings {
            debug_pixel: true,
            debug_pixel_x: 3,
            debug_pixel_y: 1,
            ..settings(4, 2)
        };
        let mut out = RendererOutput::new(&debug);
        assert!(matches!(
            out.add_sample(&task(0, 0), Shade::normal(Vec3::ONE, 1.0), &TraceHit::default()),
            Err(RenderError::PixelOutOfRange { x: 0, y: 0 })
        ));
        out.add_sample(&task(3, 1), Shade::normal(Vec3::ONE, 1.0), &TraceHit::default())
            .unwrap();

        let image = out.get_flat_image().unwrap();
        assert_eq!((image.width(), image.height()), (4, 2));
        assert_eq!(image.get(3, 1).unwrap(), Color8::new(255, 255, 255));
        assert_eq!(image.get(0, 0).unwrap(), Color8::BLACK);
    }

    #[test]
    fn test_depth_images() {
        let mut out = RendererOutput::new(&settings(2, 1));
        out.add_sample(&task(0, 0), Shade::normal(Vec3::X, 1.0), &TraceHit::default()).unwrap();
        out.add_sample(&task(0, 0), Shade::normal(Vec3::Y, 0.5), &TraceHit::default()).unwrap();
        out.add_sample(&task(1, 0), Shade::normal(Vec3::Z, 1.0), &TraceHit::default()).unwrap();

        let images = out.get_depth_images().unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].get(0, 0).unwrap(), Color8::new(255, 0, 0));
        assert_eq!(images[0].get(1, 0).unwrap(), Color8::new(0, 0, 255));
        assert_eq!(images[1].get(0, 0).unwrap(), Color8::new(0, 255, 0));
        assert_eq!(images[1].get(1, 0).unwrap(), Color8::BLACK);
    }

    #[test]
    fn test_visible_triangles_requires_recording() {
        let out = RendererOutput::new(&settings(1, 1));
        assert!(matches!(
            out.get_visible_triangle_ids(10),
            Err(RenderError::HitsNotRecorded)
        ));
    }

    #[test]
    fn test_visible_triangles_dedup_in_order() {
        let recording = Settings {
            prune_invisible: true,
            ..settings(2, 1)
        };
        let mut out = RendererOutput::new(&recording);
        let shade = Shade::normal(Vec3::ONE, 1.0);
        out.add_sample(&task(0, 0), shade, &hit_on(5)).unwrap();
        out.add_sample(&task(0, 0), shade, &hit_on(2)).unwrap();
        out.add_sample(&task(1, 0), shade, &TraceHit::default()).unwrap();
        out.add_sample(&task(1, 0), shade, &hit_on(5)).unwrap();
        out.add_sample(&task(1, 0), shade, &hit_on(7)).unwrap();

        assert_eq!(out.get_visible_triangle_ids(8).unwrap(), vec![5, 2, 7]);
        assert!(matches!(
            out.get_visible_triangle_ids(6),
            Err(RenderError::TriangleIdOutOfRange { id: 7, max: 6 })
        ));
    }

    #[test]
    fn test_merge_keeps_bucket_order() {
        let mut out = RendererOutput::new(&settings(2, 1));
        let mut bucket = BucketOutput::new(false);
        bucket.add_sample(&task(1, 0), Shade::normal(Vec3::X, 1.0), &TraceHit::default());
        bucket.add_sample(&task(0, 0), Shade::normal(Vec3::Z, 1.0), &TraceHit::default());
        bucket.add_sample(&task(1, 0), Shade::normal(Vec3::Y, 0.5), &TraceHit::default());
        assert_eq!(bucket.len(), 3);
        out.merge(bucket).unwrap();

        let samples = out.samples(1, 0).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].color, Vec3::X);
        assert_eq!(samples[1].color, Vec3::Y);
    }
}
