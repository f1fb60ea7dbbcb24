//! Bucket partitioning of the active pixel rectangle.
//!
//! Pixels are dealt to buckets by their linear index modulo the bucket
//! count, so neighbouring pixels land in different buckets and the work of
//! expensive image regions spreads across workers.

use std::collections::VecDeque;

use sanct_core::{CameraFrame, Rect, Settings};

use crate::task::TraceTask;

/// FIFO of pending tasks owned by one bucket.
pub type TraceQueue = VecDeque<TraceTask>;

/// Work queue for one bucket.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Index of this bucket in claim order
    pub index: usize,
    pub queue: TraceQueue,
}

impl Bucket {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            queue: TraceQueue::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Number of buckets needed for `pixels` pixels at `bucket_size` pixels each.
///
/// Always at least one.
pub fn bucket_count(pixels: usize, bucket_size: usize) -> usize {
    pixels.div_ceil(bucket_size.max(1)).max(1)
}

/// Bucket owning pixel (x, y) in an image `width` pixels wide.
pub fn bucket_of(x: usize, y: usize, width: usize, buckets: usize) -> usize {
    (y * width + x) % buckets.max(1)
}

/// Fill one bucket per group with the primary tasks of `rect`.
///
/// Tasks within a bucket follow the row-major pixel order.
pub fn generate_buckets(settings: &Settings, rect: Rect, frame: &CameraFrame) -> Vec<Bucket> {
    let count = bucket_count(rect.area(), settings.effective_bucket_size());
    let mut buckets: Vec<Bucket> = (0..count).map(Bucket::new).collect();

    for (x, y) in rect.pixels() {
        let index = bucket_of(x, y, settings.resolution_x, count);
        buckets[index]
            .queue
            .push_back(TraceTask::primary(frame.ray(x, y), x, y));
    }

    log::debug!(
        "Generated {} buckets for {} pixels",
        buckets.len(),
        rect.area()
    );
    buckets
}
