//! Bucketed frame rendering on a rayon worker pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use sanct_core::{Scene, Settings, TraceHit};
use sanct_math::Ray;

use crate::bucket::{generate_buckets, Bucket};
use crate::error::{RenderError, RenderResult};
use crate::metrics::{counters, lock, timers, CounterSet, Metrics};
use crate::output::{BucketOutput, RendererOutput};
use crate::shading::{self, ShadeContext};

/// Per-frame context owned by the caller.
#[derive(Debug, Default)]
pub struct RenderSession {
    pub frame: u64,
    pub metrics: Metrics,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next frame with fresh metrics.
    pub fn next_frame(&mut self) {
        self.frame += 1;
        self.metrics.reset();
    }
}

/// Renders scenes into a [`RendererOutput`] that is reset every frame.
#[derive(Debug, Clone)]
pub struct Renderer {
    settings: Settings,
    output: RendererOutput,
}

impl Renderer {
    pub fn new(settings: Settings) -> RenderResult<Self> {
        settings.check()?;
        let output = RendererOutput::new(&settings);
        Ok(Self { settings, output })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output(&self) -> &RendererOutput {
        &self.output
    }

    /// Render one frame of `scene`.
    ///
    /// The scene must be built. Any shading failure aborts the frame and is
    /// returned; samples from the aborted frame are discarded.
    pub fn render(&mut self, scene: &Scene, session: &RenderSession) -> RenderResult<()> {
        if scene.is_dirty() {
            return Err(RenderError::DirtyScene);
        }

        let metrics = &session.metrics;
        metrics.start_timer(timers::ALL);
        let result = self.render_frame(scene, metrics);
        metrics.stop_timer(timers::ALL);

        match &result {
            Ok(()) => log::info!(
                "Frame {} of '{}' rendered in {:.2?}",
                session.frame,
                scene.name(),
                metrics.timer(timers::ALL)
            ),
            Err(err) => log::error!("Frame {} aborted: {}", session.frame, err),
        }
        metrics.log_summary();
        result
    }

    fn render_frame(&mut self, scene: &Scene, metrics: &Metrics) -> RenderResult<()> {
        self.output.reset(&self.settings);
        let rect = self.output.active_rect();

        let frame = scene
            .camera()
            .frame(self.settings.resolution_x, self.settings.resolution_y);
        let buckets = metrics.time(timers::GENERATE_QUEUE, || {
            generate_buckets(&self.settings, rect, &frame)
        });
        metrics.record_n(counters::PRIMARY_RAYS, rect.area() as u64);
        metrics.record_n(counters::BUCKETS, buckets.len() as u64);

        let outputs = metrics.time(timers::PROCESS_QUEUE, || {
            self.process_buckets(scene, buckets, metrics)
        })?;

        metrics.time(timers::MERGE, || {
            outputs
                .into_iter()
                .try_for_each(|output| self.output.merge(output))
        })
    }

    fn worker_count(&self, buckets: usize) -> usize {
        if self.settings.force_single_threaded {
            1
        } else {
            rayon::current_num_threads().min(buckets).max(1)
        }
    }

    /// Drain every bucket on the pool, returning their outputs in bucket order.
    fn process_buckets(
        &self,
        scene: &Scene,
        buckets: Vec<Bucket>,
        metrics: &Metrics,
    ) -> RenderResult<Vec<BucketOutput>> {
        let count = buckets.len();
        let workers = self.worker_count(count);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sanct-worker-{i}"))
            .build()?;
        log::info!("Rendering {} buckets on {} workers", count, workers);

        let pending: Vec<Mutex<Option<Bucket>>> =
            buckets.into_iter().map(|b| Mutex::new(Some(b))).collect();
        let finished: Vec<Mutex<Option<BucketOutput>>> =
            (0..count).map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let first_error: Mutex<Option<RenderError>> = Mutex::new(None);

        let ctx = ShadeContext {
            scene,
            settings: &self.settings,
        };

        pool.scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| {
                    while !abort.load(Ordering::Acquire) {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(slot) = pending.get(index) else {
                            break;
                        };
                        let Some(bucket) = lock(slot).take() else {
                            continue;
                        };

                        let drained =
                            panic::catch_unwind(AssertUnwindSafe(|| {
                                self.drain_bucket(&ctx, bucket, metrics)
                            }))
                            .unwrap_or(Err(RenderError::WorkerPanic));

                        match drained {
                            Ok(output) => *lock(&finished[index]) = Some(output),
                            Err(err) => {
                                abort.store(true, Ordering::Release);
                                lock(&first_error).get_or_insert(err);
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            return Err(err);
        }

        Ok(finished
            .into_iter()
            .filter_map(|slot| slot.into_inner().unwrap_or_else(PoisonError::into_inner))
            .collect())
    }

    /// Evaluate a bucket's queue FIFO until empty, bounces included.
    fn drain_bucket(
        &self,
        ctx: &ShadeContext,
        mut bucket: Bucket,
        metrics: &Metrics,
    ) -> RenderResult<BucketOutput> {
        let mut output = BucketOutput::new(self.output.records_hits());
        let mut local = CounterSet::new();

        while let Some(task) = bucket.queue.pop_front() {
            local.record(counters::TRACE_TASKS);
            let hit = self.trace(ctx.scene, &task.ray);
            let outcome = shading::shade(ctx, &task, &hit)?;

            if let Some(shade) = outcome.sample {
                output.add_sample(&task, shade, &hit);
                local.record(counters::SAMPLES);
            }
            if outcome.sky {
                local.record(counters::SKY_SAMPLES);
            }
            local.record_n(counters::CHILD_TASKS, outcome.children.len() as u64);
            bucket.queue.extend(outcome.children);
        }

        metrics.merge(&local);
        log::debug!(
            "Bucket {} finished with {} samples",
            bucket.index,
            output.len()
        );
        Ok(output)
    }

    fn trace(&self, scene: &Scene, ray: &Ray) -> TraceHit {
        if self.settings.force_no_accel_structure {
            scene.intersect_linear(ray)
        } else {
            scene.intersect(ray)
        }
    }

    /// Copy of `scene` reduced to the triangles hit in the last frame.
    ///
    /// Needs `prune_invisible` so hits were recorded.
    pub fn prune_invisible(&self, scene: &Scene) -> RenderResult<Scene> {
        let visible = self
            .output
            .get_visible_triangle_ids(scene.triangle_count())?;
        log::info!(
            "Keeping {} of {} triangles",
            visible.len(),
            scene.triangle_count()
        );
        Ok(scene.cut(&visible)?)
    }
}
