//! Sanct renderer: bucketed Whitted-style ray tracing on the CPU.
//!
//! Primary rays are dealt into buckets, each bucket is drained by one
//! worker of a rayon pool, and every traced ray appends its weighted
//! shade to the pixel it belongs to. Flattening a pixel folds those shades
//! into the final color.
//!
//! ```ignore
//! let settings = Settings::default();
//! let mut scene = Scene::new("demo", &settings);
//! // ... add materials, objects and lights ...
//! scene.build()?;
//!
//! let mut renderer = Renderer::new(settings)?;
//! renderer.render(&scene, &RenderSession::new())?;
//! let image = renderer.output().get_flat_image()?;
//! ```

mod bucket;
mod error;
mod metrics;
mod output;
mod renderer;
mod shading;
mod task;

pub use bucket::{bucket_count, bucket_of, generate_buckets, Bucket, TraceQueue};
pub use error::{RenderError, RenderResult};
pub use metrics::{counters, timers, CounterSet, Metrics};
pub use output::{BlendKind, BucketOutput, PixelSample, RendererOutput, Shade};
pub use renderer::{RenderSession, Renderer};
pub use shading::{clamp_overexposure, schlick, shade, ShadeContext, ShadeOutcome, WEIGHT_EPSILON};
pub use task::TraceTask;

pub use sanct_core::{Image, Scene, Settings};
pub use sanct_math::Vec3;
